//! Numeric dimension indexers
//!
//! Numeric dimensions store the parsed primitive directly, with no dictionary
//! in between. Null or unparseable input becomes the zero sentinel, and the
//! sorted and unsorted encodings are the same value since numeric order
//! already is value order.
//!
//! `FloatDimensionIndexer` is the reference kind. Double and long differ only
//! in the primitive type, the zero sentinel, and the bounds.

use super::{Cardinality, DimensionDesc, DimensionIndexer, EncodedComponent};
use crate::bitmap::BitmapFactory;
use crate::coercion::{self, null_to_zero};
use crate::incremental::RowCursor;
use crate::schema::ValueType;
use crate::selector::{
    ColumnValueSelector, DimensionSelector, DimensionSpec, IndexerNumericColumnSelector,
    NumericWrappingDimensionSelector,
};
use crate::value::{ActualValue, EncodedKey, RawValue};
use crate::{Error, Result};

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Primitive backing a numeric dimension
pub trait NumericPrimitive:
    EncodedComponent + Copy + Default + PartialEq + Into<ActualValue> + fmt::Debug + 'static
{
    const VALUE_TYPE: ValueType;
    /// Sentinel stored for null or unparseable input
    const ZERO: Self;
    const MIN: Self;
    const MAX: Self;

    fn coerce(raw: &RawValue, report_parse_failures: bool) -> Result<Option<Self>>;

    /// Total order used for comparison. Must agree with `hash_bits`.
    fn total_cmp(&self, other: &Self) -> Ordering;

    fn hash_bits(&self) -> u64;

    fn to_f32(self) -> f32;
    fn to_f64(self) -> f64;
    fn to_i64(self) -> i64;
}

impl EncodedComponent for f32 {
    fn from_key(key: &EncodedKey) -> Option<Self> {
        key.as_float()
    }

    fn into_key(self) -> EncodedKey {
        EncodedKey::Float(self)
    }
}

impl EncodedComponent for f64 {
    fn from_key(key: &EncodedKey) -> Option<Self> {
        key.as_double()
    }

    fn into_key(self) -> EncodedKey {
        EncodedKey::Double(self)
    }
}

impl EncodedComponent for i64 {
    fn from_key(key: &EncodedKey) -> Option<Self> {
        key.as_long()
    }

    fn into_key(self) -> EncodedKey {
        EncodedKey::Long(self)
    }
}

// All NaN payloads compare and hash as one value.
fn canonical_f32(v: f32) -> f32 {
    if v.is_nan() {
        f32::NAN
    } else {
        v
    }
}

fn canonical_f64(v: f64) -> f64 {
    if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

impl NumericPrimitive for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;
    const ZERO: Self = coercion::ZERO_FLOAT;
    const MIN: Self = f32::NEG_INFINITY;
    const MAX: Self = f32::INFINITY;

    fn coerce(raw: &RawValue, report_parse_failures: bool) -> Result<Option<Self>> {
        coercion::convert_to_float(raw, report_parse_failures)
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        canonical_f32(*self).total_cmp(&canonical_f32(*other))
    }

    fn hash_bits(&self) -> u64 {
        canonical_f32(*self).to_bits() as u64
    }

    fn to_f32(self) -> f32 {
        self
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn to_i64(self) -> i64 {
        self as i64
    }
}

impl NumericPrimitive for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;
    const ZERO: Self = coercion::ZERO_DOUBLE;
    const MIN: Self = f64::NEG_INFINITY;
    const MAX: Self = f64::INFINITY;

    fn coerce(raw: &RawValue, report_parse_failures: bool) -> Result<Option<Self>> {
        coercion::convert_to_double(raw, report_parse_failures)
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        canonical_f64(*self).total_cmp(&canonical_f64(*other))
    }

    fn hash_bits(&self) -> u64 {
        canonical_f64(*self).to_bits()
    }

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn to_i64(self) -> i64 {
        self as i64
    }
}

impl NumericPrimitive for i64 {
    const VALUE_TYPE: ValueType = ValueType::Long;
    const ZERO: Self = coercion::ZERO_LONG;
    const MIN: Self = i64::MIN;
    const MAX: Self = i64::MAX;

    fn coerce(raw: &RawValue, report_parse_failures: bool) -> Result<Option<Self>> {
        coercion::convert_to_long(raw, report_parse_failures)
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn hash_bits(&self) -> u64 {
        *self as u64
    }

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn to_i64(self) -> i64 {
        self
    }
}

/// Indexer for a dimension stored as a raw numeric primitive
pub struct NumericDimensionIndexer<T> {
    _marker: PhantomData<fn() -> T>,
}

pub type FloatDimensionIndexer = NumericDimensionIndexer<f32>;
pub type DoubleDimensionIndexer = NumericDimensionIndexer<f64>;
pub type LongDimensionIndexer = NumericDimensionIndexer<i64>;

impl<T: NumericPrimitive> NumericDimensionIndexer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn unsupported(&self, capability: &str) -> Error {
        Error::UnsupportedCapability(format!(
            "numeric {} columns do not support {}",
            T::VALUE_TYPE,
            capability
        ))
    }
}

impl<T: NumericPrimitive> Default for NumericDimensionIndexer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NumericPrimitive> fmt::Debug for NumericDimensionIndexer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericDimensionIndexer")
            .field("value_type", &T::VALUE_TYPE)
            .finish()
    }
}

impl<T: NumericPrimitive> DimensionIndexer for NumericDimensionIndexer<T> {
    type Unsorted = T;
    type Sorted = T;
    type Actual = T;

    fn value_type(&self) -> ValueType {
        T::VALUE_TYPE
    }

    fn process_row_vals(&self, raw: &RawValue, report_parse_failures: bool) -> Result<T> {
        if raw.is_sequence() {
            return Err(Error::InvalidShape(format!(
                "numeric {} columns do not support multi-value rows: [{}]",
                T::VALUE_TYPE,
                raw
            )));
        }
        // Null keeps legacy zero semantics until numeric nulls are supported.
        Ok(null_to_zero(T::coerce(raw, report_parse_failures)?))
    }

    fn unsorted_from_sorted(&self, sorted: &T) -> Result<T> {
        Ok(*sorted)
    }

    fn sorted_values(&self) -> Result<Vec<T>> {
        Err(self.unsupported("value dictionaries"))
    }

    fn min_value(&self) -> T {
        T::MIN
    }

    fn max_value(&self) -> T {
        T::MAX
    }

    fn cardinality(&self) -> Cardinality {
        Cardinality::Unknown
    }

    fn compare(&self, lhs: Option<&T>, rhs: Option<&T>) -> Ordering {
        null_to_zero(lhs.copied()).total_cmp(&null_to_zero(rhs.copied()))
    }

    fn equal(&self, lhs: Option<&T>, rhs: Option<&T>) -> bool {
        self.compare(lhs, rhs) == Ordering::Equal
    }

    fn hash_key(&self, key: Option<&T>) -> u64 {
        super::hash_of(&null_to_zero(key.copied()).hash_bits())
    }

    fn to_actual_array_or_list(&self, key: &T, as_list: bool) -> ActualValue {
        if as_list {
            ActualValue::List(vec![(*key).into()])
        } else {
            (*key).into()
        }
    }

    fn to_sorted(&self, key: &T) -> Result<T> {
        Ok(*key)
    }

    fn fill_bitmaps<F: BitmapFactory>(
        &self,
        _key: &T,
        _row_num: u32,
        _bitmaps: &mut Vec<Option<F::Bitmap>>,
        _factory: &F,
    ) -> Result<()> {
        Err(self.unsupported("bitmaps"))
    }

    fn make_dimension_selector<'a>(
        &self,
        spec: &DimensionSpec,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn DimensionSelector + 'a> {
        Box::new(NumericWrappingDimensionSelector::new(
            IndexerNumericColumnSelector::<T>::new(cursor, desc.index),
            spec.extraction_fn.clone(),
        ))
    }

    fn make_column_value_selector<'a>(
        &self,
        cursor: &'a RowCursor,
        desc: &DimensionDesc,
    ) -> Box<dyn ColumnValueSelector + 'a> {
        Box::new(IndexerNumericColumnSelector::<T>::new(cursor, desc.index))
    }
}
