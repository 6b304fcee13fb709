//! Dimension indexers
//!
//! One indexer exists per dimension of a mutable index. It owns the encoding
//! policy for its value type and gives the ingest and read paths a uniform
//! way to encode, order, hash, and read back values:
//!
//! - `process_row_vals` turns a raw event value into the unsorted encoded
//!   component stored in the row
//! - `compare` / `equal` / `hash_key` order and key rows
//! - `make_column_value_selector` / `make_dimension_selector` build
//!   cursor-bound read views
//! - `sorted_values` / `fill_bitmaps` only exist for dictionary kinds and
//!   fail with `Error::UnsupportedCapability` otherwise
//!
//! [`AnyDimensionIndexer`] closes the set of kinds so a row of mixed
//! dimensions can be handled through a single type.

mod dictionary;
mod numeric;
mod string;

pub use dictionary::{DimensionDictionary, SortedDimensionDictionary};
pub use numeric::{
    DoubleDimensionIndexer, FloatDimensionIndexer, LongDimensionIndexer, NumericDimensionIndexer,
    NumericPrimitive,
};
pub use string::StringDimensionIndexer;

use crate::bitmap::BitmapFactory;
use crate::incremental::RowCursor;
use crate::schema::{ColumnCapabilities, ValueType};
use crate::selector::{ColumnValueSelector, DimensionSelector, DimensionSpec};
use crate::value::{ActualValue, EncodedKey, RawValue};
use crate::{Error, Result};

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Number of distinct values a dimension holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Known(usize),
    /// The dimension never materializes a dictionary
    Unknown,
}

impl Cardinality {
    pub fn known(&self) -> Option<usize> {
        match self {
            Cardinality::Known(n) => Some(*n),
            Cardinality::Unknown => None,
        }
    }
}

/// Conversion between a typed encoded component and a row slot
pub trait EncodedComponent: Clone + Send + Sync + fmt::Debug + Sized {
    fn from_key(key: &EncodedKey) -> Option<Self>;
    fn into_key(self) -> EncodedKey;
}

impl EncodedComponent for Vec<u32> {
    fn from_key(key: &EncodedKey) -> Option<Self> {
        key.as_ids().map(<[u32]>::to_vec)
    }

    fn into_key(self) -> EncodedKey {
        EncodedKey::Ids(self)
    }
}

/// Position and indexer of a dimension inside a mutable index
#[derive(Debug, Clone)]
pub struct DimensionDesc {
    /// Ordinal of the dimension in every row's dimension array
    pub index: usize,
    pub name: String,
    pub indexer: Arc<AnyDimensionIndexer>,
}

impl DimensionDesc {
    pub fn new(index: usize, name: impl Into<String>, indexer: AnyDimensionIndexer) -> Self {
        Self {
            index,
            name: name.into(),
            indexer: Arc::new(indexer),
        }
    }

    pub fn capabilities(&self) -> ColumnCapabilities {
        self.indexer.capabilities()
    }
}

/// Encoding policy of a single dimension kind
pub trait DimensionIndexer: Send + Sync {
    /// Component stored in a row at ingest time
    type Unsorted: EncodedComponent;
    /// Component after the column is finalized
    type Sorted: EncodedComponent + PartialEq;
    /// Decoded value type
    type Actual: Into<ActualValue>;

    fn value_type(&self) -> ValueType;

    fn capabilities(&self) -> ColumnCapabilities {
        ColumnCapabilities::for_type(self.value_type())
    }

    /// Encode a raw event value.
    ///
    /// With `report_parse_failures` unset, unparseable input is encoded as the
    /// kind's default instead of failing.
    fn process_row_vals(
        &self,
        raw: &RawValue,
        report_parse_failures: bool,
    ) -> Result<Self::Unsorted>;

    fn unsorted_from_sorted(&self, sorted: &Self::Sorted) -> Result<Self::Unsorted>;

    /// Distinct values in sorted order
    fn sorted_values(&self) -> Result<Vec<Self::Actual>>;

    fn min_value(&self) -> Self::Actual;

    fn max_value(&self) -> Self::Actual;

    fn cardinality(&self) -> Cardinality;

    fn compare(&self, lhs: Option<&Self::Unsorted>, rhs: Option<&Self::Unsorted>) -> Ordering;

    fn equal(&self, lhs: Option<&Self::Unsorted>, rhs: Option<&Self::Unsorted>) -> bool;

    fn hash_key(&self, key: Option<&Self::Unsorted>) -> u64;

    fn to_actual_array_or_list(&self, key: &Self::Unsorted, as_list: bool) -> ActualValue;

    /// Fails with `Internal` when the key holds ids this indexer never issued
    fn to_sorted(&self, key: &Self::Unsorted) -> Result<Self::Sorted>;

    /// Mark `row_num` in the bitmap of every dictionary id in `key`.
    /// `bitmaps` is indexed by unsorted id and grown on demand.
    fn fill_bitmaps<F: BitmapFactory>(
        &self,
        key: &Self::Unsorted,
        row_num: u32,
        bitmaps: &mut Vec<Option<F::Bitmap>>,
        factory: &F,
    ) -> Result<()>;

    fn make_dimension_selector<'a>(
        &self,
        spec: &DimensionSpec,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn DimensionSelector + 'a>;

    fn make_column_value_selector<'a>(
        &self,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn ColumnValueSelector + 'a>;
}

pub(crate) fn hash_of<H: Hash + ?Sized>(value: &H) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Closed set of dimension kinds
#[derive(Debug)]
pub enum AnyDimensionIndexer {
    Float(FloatDimensionIndexer),
    Double(DoubleDimensionIndexer),
    Long(LongDimensionIndexer),
    String(StringDimensionIndexer),
}

macro_rules! dispatch {
    ($self:expr, $ix:ident => $body:expr) => {
        match $self {
            AnyDimensionIndexer::Float($ix) => $body,
            AnyDimensionIndexer::Double($ix) => $body,
            AnyDimensionIndexer::Long($ix) => $body,
            AnyDimensionIndexer::String($ix) => $body,
        }
    };
}

fn decode<I: DimensionIndexer>(indexer: &I, key: &EncodedKey) -> Result<I::Unsorted> {
    I::Unsorted::from_key(key).ok_or_else(|| {
        Error::Internal(format!(
            "encoded key {:?} does not belong to a {} dimension",
            key,
            indexer.value_type()
        ))
    })
}

fn decode_opt<I: DimensionIndexer>(key: Option<&EncodedKey>) -> Option<I::Unsorted> {
    key.and_then(I::Unsorted::from_key)
}

fn encode<I: DimensionIndexer>(
    indexer: &I,
    raw: &RawValue,
    report_parse_failures: bool,
) -> Result<EncodedKey> {
    Ok(indexer.process_row_vals(raw, report_parse_failures)?.into_key())
}

fn compare_keys<I: DimensionIndexer>(
    indexer: &I,
    lhs: Option<&EncodedKey>,
    rhs: Option<&EncodedKey>,
) -> Ordering {
    let lhs = decode_opt::<I>(lhs);
    let rhs = decode_opt::<I>(rhs);
    indexer.compare(lhs.as_ref(), rhs.as_ref())
}

fn equal_keys<I: DimensionIndexer>(
    indexer: &I,
    lhs: Option<&EncodedKey>,
    rhs: Option<&EncodedKey>,
) -> bool {
    let lhs = decode_opt::<I>(lhs);
    let rhs = decode_opt::<I>(rhs);
    indexer.equal(lhs.as_ref(), rhs.as_ref())
}

fn hash_encoded<I: DimensionIndexer>(indexer: &I, key: Option<&EncodedKey>) -> u64 {
    indexer.hash_key(decode_opt::<I>(key).as_ref())
}

fn sorted_key<I: DimensionIndexer>(indexer: &I, key: &EncodedKey) -> Result<EncodedKey> {
    Ok(indexer.to_sorted(&decode(indexer, key)?)?.into_key())
}

fn unsorted_key<I: DimensionIndexer>(indexer: &I, sorted: &EncodedKey) -> Result<EncodedKey> {
    let sorted = I::Sorted::from_key(sorted).ok_or_else(|| {
        Error::Internal(format!("sorted key {:?} does not match dimension type", sorted))
    })?;
    Ok(indexer.unsorted_from_sorted(&sorted)?.into_key())
}

fn actual_values<I: DimensionIndexer>(indexer: &I) -> Result<Vec<ActualValue>> {
    Ok(indexer
        .sorted_values()?
        .into_iter()
        .map(Into::into)
        .collect())
}

fn fill<I: DimensionIndexer, F: BitmapFactory>(
    indexer: &I,
    key: &EncodedKey,
    row_num: u32,
    bitmaps: &mut Vec<Option<F::Bitmap>>,
    factory: &F,
) -> Result<()> {
    let key = decode(indexer, key)?;
    indexer.fill_bitmaps(&key, row_num, bitmaps, factory)
}

impl AnyDimensionIndexer {
    /// Create the indexer for a declared value type
    pub fn for_type(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Float => AnyDimensionIndexer::Float(FloatDimensionIndexer::new()),
            ValueType::Double => AnyDimensionIndexer::Double(DoubleDimensionIndexer::new()),
            ValueType::Long => AnyDimensionIndexer::Long(LongDimensionIndexer::new()),
            ValueType::String => AnyDimensionIndexer::String(StringDimensionIndexer::new()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        dispatch!(self, ix => ix.value_type())
    }

    pub fn capabilities(&self) -> ColumnCapabilities {
        dispatch!(self, ix => ix.capabilities())
    }

    pub fn process_row_vals(
        &self,
        raw: &RawValue,
        report_parse_failures: bool,
    ) -> Result<EncodedKey> {
        dispatch!(self, ix => encode(ix, raw, report_parse_failures))
    }

    pub fn to_sorted(&self, key: &EncodedKey) -> Result<EncodedKey> {
        dispatch!(self, ix => sorted_key(ix, key))
    }

    pub fn unsorted_from_sorted(&self, sorted: &EncodedKey) -> Result<EncodedKey> {
        dispatch!(self, ix => unsorted_key(ix, sorted))
    }

    pub fn sorted_values(&self) -> Result<Vec<ActualValue>> {
        dispatch!(self, ix => actual_values(ix))
    }

    pub fn min_value(&self) -> ActualValue {
        dispatch!(self, ix => ix.min_value().into())
    }

    pub fn max_value(&self) -> ActualValue {
        dispatch!(self, ix => ix.max_value().into())
    }

    pub fn cardinality(&self) -> Cardinality {
        dispatch!(self, ix => ix.cardinality())
    }

    pub fn compare(&self, lhs: Option<&EncodedKey>, rhs: Option<&EncodedKey>) -> Ordering {
        dispatch!(self, ix => compare_keys(ix, lhs, rhs))
    }

    pub fn equal(&self, lhs: Option<&EncodedKey>, rhs: Option<&EncodedKey>) -> bool {
        dispatch!(self, ix => equal_keys(ix, lhs, rhs))
    }

    pub fn hash_key(&self, key: Option<&EncodedKey>) -> u64 {
        dispatch!(self, ix => hash_encoded(ix, key))
    }

    pub fn to_actual_array_or_list(&self, key: &EncodedKey, as_list: bool) -> Result<ActualValue> {
        dispatch!(self, ix => Ok(ix.to_actual_array_or_list(&decode(ix, key)?, as_list)))
    }

    pub fn fill_bitmaps<F: BitmapFactory>(
        &self,
        key: &EncodedKey,
        row_num: u32,
        bitmaps: &mut Vec<Option<F::Bitmap>>,
        factory: &F,
    ) -> Result<()> {
        dispatch!(self, ix => fill(ix, key, row_num, bitmaps, factory))
    }

    pub fn make_dimension_selector<'a>(
        &self,
        spec: &DimensionSpec,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn DimensionSelector + 'a> {
        dispatch!(self, ix => ix.make_dimension_selector(spec, cursor, desc))
    }

    pub fn make_column_value_selector<'a>(
        &self,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn ColumnValueSelector + 'a> {
        dispatch!(self, ix => ix.make_column_value_selector(cursor, desc))
    }

    /// Dictionary-backed indexer, if this is one
    pub fn as_string(&self) -> Option<&StringDimensionIndexer> {
        match self {
            AnyDimensionIndexer::String(ix) => Some(ix),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::RoaringBitmapFactory;

    #[test]
    fn test_for_type_picks_kind() {
        for value_type in [ValueType::Float, ValueType::Double, ValueType::Long, ValueType::String] {
            assert_eq!(AnyDimensionIndexer::for_type(value_type).value_type(), value_type);
        }
    }

    #[test]
    fn test_capability_probes_match_capabilities() {
        let factory = RoaringBitmapFactory;
        for value_type in [ValueType::Float, ValueType::Double, ValueType::Long, ValueType::String] {
            let indexer = AnyDimensionIndexer::for_type(value_type);
            let caps = indexer.capabilities();
            let key = indexer.process_row_vals(&RawValue::from("1"), false).unwrap();
            let mut bitmaps = Vec::new();

            let fill = indexer.fill_bitmaps(&key, 0, &mut bitmaps, &factory);
            assert_eq!(fill.is_ok(), caps.has_bitmap_indexes, "{value_type}");
            assert_eq!(indexer.sorted_values().is_ok(), caps.dictionary_encoded, "{value_type}");
            assert_eq!(
                indexer.cardinality() == Cardinality::Unknown,
                !caps.dictionary_encoded,
                "{value_type}"
            );
        }
    }

    #[test]
    fn test_mismatched_key_is_internal_error() {
        let indexer = AnyDimensionIndexer::for_type(ValueType::Float);
        let err = indexer.to_sorted(&EncodedKey::Long(3)).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_untyped_compare_normalizes_null() {
        let indexer = AnyDimensionIndexer::for_type(ValueType::Double);
        assert_eq!(indexer.compare(None, Some(&EncodedKey::Double(0.0))), Ordering::Equal);
        assert_eq!(indexer.compare(None, Some(&EncodedKey::Double(1.0))), Ordering::Less);
        assert_eq!(indexer.hash_key(None), indexer.hash_key(Some(&EncodedKey::Double(0.0))));
        assert!(indexer.equal(None, Some(&EncodedKey::Double(0.0))));
    }

    #[test]
    fn test_sorted_round_trip_through_facade() {
        let indexer = AnyDimensionIndexer::for_type(ValueType::String);
        let b = indexer.process_row_vals(&RawValue::from("b"), false).unwrap();
        let a = indexer.process_row_vals(&RawValue::from("a"), false).unwrap();

        let sorted_a = indexer.to_sorted(&a).unwrap();
        assert_eq!(sorted_a, EncodedKey::Ids(vec![0]));
        assert_eq!(indexer.unsorted_from_sorted(&sorted_a).unwrap(), a);
        assert_eq!(indexer.to_sorted(&b).unwrap(), EncodedKey::Ids(vec![1]));
    }
}
