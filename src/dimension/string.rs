//! Dictionary-encoded string dimension indexer

use super::dictionary::{DimensionDictionary, SortedDimensionDictionary};
use super::{Cardinality, DimensionDesc, DimensionIndexer};
use crate::bitmap::{BitmapFactory, MutableBitmap};
use crate::coercion;
use crate::incremental::RowCursor;
use crate::schema::{ColumnCapabilities, ValueType};
use crate::selector::{
    ColumnValueSelector, DimensionSelector, DimensionSpec, IndexerStringSelector,
};
use crate::value::{ActualValue, RawValue};
use crate::{Error, Result};

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::debug;

/// Indexer for string dimensions.
///
/// Rows store dictionary ids in insertion order. The dictionary is shared
/// with selectors, and concurrent encodes are serialized on its lock.
#[derive(Debug, Default)]
pub struct StringDimensionIndexer {
    dictionary: Arc<RwLock<DimensionDictionary>>,
    sorted: RwLock<Option<Arc<SortedDimensionDictionary>>>,
    has_multiple_values: AtomicBool,
}

impl StringDimensionIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the value dictionary
    pub fn dictionary(&self) -> Arc<RwLock<DimensionDictionary>> {
        Arc::clone(&self.dictionary)
    }

    pub fn has_multiple_values(&self) -> bool {
        self.has_multiple_values.load(AtomicOrdering::Acquire)
    }

    fn id_for(&self, value: Option<&str>) -> u32 {
        if let Some(id) = self.dictionary.read().get_id(value) {
            return id;
        }
        self.dictionary.write().add(value)
    }

    /// Sorted snapshot of the dictionary, rebuilt when new values arrived
    pub fn sorted_lookup(&self) -> Arc<SortedDimensionDictionary> {
        let size = self.dictionary.read().size();
        if let Some(sorted) = self.sorted.read().as_ref() {
            if sorted.size() == size {
                return Arc::clone(sorted);
            }
        }

        let sorted = Arc::new(self.dictionary.read().sort());
        debug!(values = sorted.size(), "Sorted string dimension dictionary");
        *self.sorted.write() = Some(Arc::clone(&sorted));
        sorted
    }

    /// Values of a key, with an uncovered dimension reading as a single null
    fn values_of(&self, key: Option<&Vec<u32>>) -> Vec<Option<String>> {
        match key {
            Some(ids) => self.resolve(ids),
            None => vec![None],
        }
    }

    fn resolve(&self, ids: &[u32]) -> Vec<Option<String>> {
        let dictionary = self.dictionary.read();
        ids.iter()
            .map(|id| dictionary.value(*id).cloned().flatten())
            .collect()
    }
}

impl DimensionIndexer for StringDimensionIndexer {
    type Unsorted = Vec<u32>;
    type Sorted = Vec<u32>;
    type Actual = Option<String>;

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn capabilities(&self) -> ColumnCapabilities {
        ColumnCapabilities {
            has_multiple_values: self.has_multiple_values(),
            ..ColumnCapabilities::for_type(ValueType::String)
        }
    }

    fn process_row_vals(&self, raw: &RawValue, _report_parse_failures: bool) -> Result<Vec<u32>> {
        match raw {
            RawValue::List(items) if items.is_empty() => Ok(vec![self.id_for(None)]),
            RawValue::List(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_sequence() {
                        return Err(Error::InvalidShape(format!(
                            "string columns do not support nested lists: [{}]",
                            raw
                        )));
                    }
                    ids.push(self.id_for(coercion::convert_to_string(item).as_deref()));
                }
                if ids.len() > 1 {
                    self.has_multiple_values.store(true, AtomicOrdering::Release);
                }
                Ok(ids)
            }
            scalar => Ok(vec![self.id_for(coercion::convert_to_string(scalar).as_deref())]),
        }
    }

    fn unsorted_from_sorted(&self, sorted: &Vec<u32>) -> Result<Vec<u32>> {
        self.sorted_lookup().unsorted_ids(sorted)
    }

    fn sorted_values(&self) -> Result<Vec<Option<String>>> {
        Ok(self.sorted_lookup().values().to_vec())
    }

    fn min_value(&self) -> Option<String> {
        self.dictionary.read().min_value().map(str::to_string)
    }

    fn max_value(&self) -> Option<String> {
        self.dictionary.read().max_value().map(str::to_string)
    }

    fn cardinality(&self) -> Cardinality {
        Cardinality::Known(self.dictionary.read().size())
    }

    fn compare(&self, lhs: Option<&Vec<u32>>, rhs: Option<&Vec<u32>>) -> Ordering {
        self.values_of(lhs).cmp(&self.values_of(rhs))
    }

    fn equal(&self, lhs: Option<&Vec<u32>>, rhs: Option<&Vec<u32>>) -> bool {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) if lhs == rhs => true,
            _ => self.values_of(lhs) == self.values_of(rhs),
        }
    }

    fn hash_key(&self, key: Option<&Vec<u32>>) -> u64 {
        super::hash_of(&self.values_of(key))
    }

    fn to_actual_array_or_list(&self, key: &Vec<u32>, as_list: bool) -> ActualValue {
        let mut values = self.resolve(key);
        if values.len() == 1 && !as_list {
            return values.remove(0).into();
        }
        ActualValue::List(values.into_iter().map(Into::into).collect())
    }

    fn to_sorted(&self, key: &Vec<u32>) -> Result<Vec<u32>> {
        self.sorted_lookup().sorted_ids(key)
    }

    fn fill_bitmaps<F: BitmapFactory>(
        &self,
        key: &Vec<u32>,
        row_num: u32,
        bitmaps: &mut Vec<Option<F::Bitmap>>,
        factory: &F,
    ) -> Result<()> {
        for id in key {
            let slot = *id as usize;
            if bitmaps.len() <= slot {
                bitmaps.resize_with(slot + 1, || None);
            }
            bitmaps[slot]
                .get_or_insert_with(|| factory.make_empty_mutable_bitmap())
                .add(row_num);
        }
        Ok(())
    }

    fn make_dimension_selector<'a>(
        &self,
        spec: &DimensionSpec,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn DimensionSelector + 'a> {
        Box::new(IndexerStringSelector::new(
            cursor,
            desc.index,
            self.dictionary(),
            spec.extraction_fn.clone(),
        ))
    }

    fn make_column_value_selector<'a>(
        &self,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn ColumnValueSelector + 'a> {
        Box::new(IndexerStringSelector::new(cursor, desc.index, self.dictionary(), None))
    }
}
