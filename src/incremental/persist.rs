//! Conversion of a mutable index into an immutable columnar segment

use super::row::Row;
use crate::bitmap::RoaringBitmapFactory;
use crate::coercion::{ZERO_DOUBLE, ZERO_FLOAT, ZERO_LONG};
use crate::dimension::{DimensionDesc, SortedDimensionDictionary};
use crate::schema::{ValueType, COUNT_FIELD, TIME_FIELD};
use crate::value::{EncodedKey, RawValue};
use crate::{Error, Result};

use arrow_array::builder::{ListBuilder, StringBuilder};
use arrow_array::types::UInt32Type;
use arrow_array::{
    ArrayRef, DictionaryArray, Float32Array, Float64Array, Int64Array, RecordBatch, StringArray,
    TimestampMillisecondArray, UInt32Array, UInt64Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable columnar snapshot of a mutable index
#[derive(Debug, Clone)]
pub struct Segment {
    batch: RecordBatch,
    /// Per string dimension, one bitmap per sorted dictionary id
    bitmaps: HashMap<String, Vec<RoaringBitmap>>,
    /// Per string dimension, sorted dictionary values
    dictionaries: HashMap<String, Vec<Option<String>>>,
}

impl Segment {
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Sorted dictionary of a string dimension
    pub fn dictionary(&self, dimension: &str) -> Option<&[Option<String>]> {
        self.dictionaries.get(dimension).map(Vec::as_slice)
    }

    /// Rows of a string dimension holding `value`
    pub fn bitmap(&self, dimension: &str, value: Option<&str>) -> Option<&RoaringBitmap> {
        let dictionary = self.dictionaries.get(dimension)?;
        let sorted_id = dictionary
            .binary_search_by(|entry| entry.as_deref().cmp(&value))
            .ok()?;
        self.bitmaps.get(dimension)?.get(sorted_id)
    }

    /// Dimensions that carry bitmap indexes
    pub fn indexed_dimensions(&self) -> impl Iterator<Item = &str> {
        self.bitmaps.keys().map(String::as_str)
    }
}

/// Builds segments from sorted index rows
#[derive(Debug, Default)]
pub struct SegmentWriter {
    include_count: bool,
    bitmap_factory: RoaringBitmapFactory,
}

impl SegmentWriter {
    pub fn new(include_count: bool) -> Self {
        Self {
            include_count,
            bitmap_factory: RoaringBitmapFactory,
        }
    }

    /// Write rows, already in segment order, into a segment
    pub fn write(&self, rows: &[Arc<Row>], dims: &[DimensionDesc]) -> Result<Segment> {
        let mut fields = vec![Field::new(
            TIME_FIELD,
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        )];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(
            TimestampMillisecondArray::from_iter_values(rows.iter().map(|r| r.timestamp()))
                .with_timezone("UTC"),
        )];

        let mut bitmaps = HashMap::new();
        let mut dictionaries = HashMap::new();

        for desc in dims {
            let caps = desc.capabilities();
            let keys = self.unsorted_keys(rows, desc)?;

            let column: ArrayRef = match caps.value_type {
                ValueType::Float => Arc::new(Float32Array::from_iter_values(
                    keys.iter().map(|k| k.as_float().unwrap_or(ZERO_FLOAT)),
                )),
                ValueType::Double => Arc::new(Float64Array::from_iter_values(
                    keys.iter().map(|k| k.as_double().unwrap_or(ZERO_DOUBLE)),
                )),
                ValueType::Long => Arc::new(Int64Array::from_iter_values(
                    keys.iter().map(|k| k.as_long().unwrap_or(ZERO_LONG)),
                )),
                ValueType::String => {
                    let strings = desc.indexer.as_string().ok_or_else(|| {
                        Error::Internal(format!("dimension '{}' is not dictionary encoded", desc.name))
                    })?;
                    // Every id in `keys` was issued before this snapshot was taken.
                    let lookup = strings.sorted_lookup();
                    let ranks = keys
                        .iter()
                        .map(|k| lookup.sorted_ids(ids_of(desc, k)?))
                        .collect::<Result<Vec<_>>>()?;

                    if caps.has_bitmap_indexes {
                        bitmaps.insert(desc.name.clone(), self.bitmap_index(desc, &keys, &lookup)?);
                    }
                    dictionaries.insert(desc.name.clone(), lookup.values().to_vec());
                    string_column(&ranks, lookup.values(), caps.has_multiple_values)?
                }
            };

            fields.push(Field::new(
                &desc.name,
                caps.value_type.arrow_type(caps.has_multiple_values),
                !caps.value_type.is_numeric(),
            ));
            columns.push(column);
        }

        if self.include_count {
            fields.push(Field::new(COUNT_FIELD, DataType::UInt64, false));
            columns.push(Arc::new(UInt64Array::from_iter_values(
                rows.iter().map(|r| r.count()),
            )));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Segment {
            batch,
            bitmaps,
            dictionaries,
        })
    }

    /// Keys of one dimension, with rows that predate it encoded as null
    fn unsorted_keys(&self, rows: &[Arc<Row>], desc: &DimensionDesc) -> Result<Vec<EncodedKey>> {
        let default = if rows.iter().any(|r| r.dim(desc.index).is_none()) {
            Some(desc.indexer.process_row_vals(&RawValue::Null, false)?)
        } else {
            None
        };

        Ok(rows
            .iter()
            .filter_map(|r| r.dim(desc.index).or(default.as_ref()).cloned())
            .collect())
    }

    /// Bitmaps re-keyed from unsorted ids to ranks in `lookup`
    fn bitmap_index(
        &self,
        desc: &DimensionDesc,
        keys: &[EncodedKey],
        lookup: &SortedDimensionDictionary,
    ) -> Result<Vec<RoaringBitmap>> {
        let mut unsorted: Vec<Option<RoaringBitmap>> = Vec::new();
        for (row_num, key) in keys.iter().enumerate() {
            desc.indexer
                .fill_bitmaps(key, row_num as u32, &mut unsorted, &self.bitmap_factory)?;
        }

        let mut sorted = vec![RoaringBitmap::new(); lookup.size()];
        for (id, bitmap) in unsorted.into_iter().enumerate() {
            let Some(bitmap) = bitmap else { continue };
            let rank = lookup.sorted_ids(&[id as u32])?;
            sorted[rank[0] as usize] = bitmap;
        }
        Ok(sorted)
    }
}

fn ids_of<'k>(desc: &DimensionDesc, key: &'k EncodedKey) -> Result<&'k [u32]> {
    key.as_ids().ok_or_else(|| {
        Error::Internal(format!(
            "key {:?} of dimension '{}' is not a dictionary key",
            key, desc.name
        ))
    })
}

fn string_column(
    ranks: &[Vec<u32>],
    values: &[Option<String>],
    multi_value: bool,
) -> Result<ArrayRef> {
    if multi_value {
        let mut builder = ListBuilder::new(StringBuilder::new());
        for row in ranks {
            for rank in row {
                builder
                    .values()
                    .append_option(values.get(*rank as usize).cloned().flatten());
            }
            builder.append(true);
        }
        return Ok(Arc::new(builder.finish()));
    }

    let ranks = UInt32Array::from_iter_values(
        ranks
            .iter()
            .map(|row| row.first().copied().unwrap_or_default()),
    );
    let dictionary = DictionaryArray::<UInt32Type>::try_new(
        ranks,
        Arc::new(StringArray::from(values.to_vec())),
    )?;
    Ok(Arc::new(dictionary))
}
