//! Selectors over numeric dimensions

use super::{ColumnValueSelector, DimensionSelector, ExtractionFn};
use crate::dimension::{Cardinality, NumericPrimitive};
use crate::incremental::RowCursor;
use crate::value::ActualValue;
use crate::{Error, Result};

use std::marker::PhantomData;

/// Reads one numeric dimension of the cursor's current row
pub struct IndexerNumericColumnSelector<'a, T> {
    cursor: &'a RowCursor,
    dim_index: usize,
    _marker: PhantomData<fn() -> T>,
}

pub type IndexerFloatColumnSelector<'a> = IndexerNumericColumnSelector<'a, f32>;
pub type IndexerDoubleColumnSelector<'a> = IndexerNumericColumnSelector<'a, f64>;
pub type IndexerLongColumnSelector<'a> = IndexerNumericColumnSelector<'a, i64>;

impl<'a, T: NumericPrimitive> IndexerNumericColumnSelector<'a, T> {
    pub fn new(cursor: &'a RowCursor, dim_index: usize) -> Self {
        Self {
            cursor,
            dim_index,
            _marker: PhantomData,
        }
    }

    /// `None` when the row predates this dimension
    pub fn value(&self) -> Option<T> {
        self.cursor
            .current_dims()
            .get(self.dim_index)
            .and_then(T::from_key)
    }

    fn primitive(&self) -> T {
        self.value().unwrap_or(T::ZERO)
    }
}

impl<'a, T: NumericPrimitive> ColumnValueSelector for IndexerNumericColumnSelector<'a, T> {
    fn get_float(&self) -> f32 {
        self.primitive().to_f32()
    }

    fn get_double(&self) -> f64 {
        self.primitive().to_f64()
    }

    fn get_long(&self) -> i64 {
        self.primitive().to_i64()
    }

    fn get_object(&self) -> Option<ActualValue> {
        self.value().map(Into::into)
    }

    fn is_null(&self) -> bool {
        self.value().is_none()
    }
}

/// Single-valued string view over a numeric column selector
pub struct NumericWrappingDimensionSelector<'a, T> {
    selector: IndexerNumericColumnSelector<'a, T>,
    extraction_fn: Option<ExtractionFn>,
}

impl<'a, T: NumericPrimitive> NumericWrappingDimensionSelector<'a, T> {
    pub fn new(
        selector: IndexerNumericColumnSelector<'a, T>,
        extraction_fn: Option<ExtractionFn>,
    ) -> Self {
        Self {
            selector,
            extraction_fn,
        }
    }

    /// Current value rendered as a string. Uncovered rows read as zero.
    pub fn value(&self) -> Option<String> {
        let value: ActualValue = self.selector.primitive().into();
        let rendered = value.to_dimension_string();
        match &self.extraction_fn {
            None => rendered,
            Some(f) => f.apply(rendered.as_deref()),
        }
    }
}

impl<'a, T: NumericPrimitive> DimensionSelector for NumericWrappingDimensionSelector<'a, T> {
    fn row_values(&self) -> Vec<Option<String>> {
        vec![self.value()]
    }

    fn value_cardinality(&self) -> Cardinality {
        Cardinality::Unknown
    }

    fn name_lookup_possible_in_advance(&self) -> bool {
        false
    }

    fn lookup_name(&self, _id: u32) -> Result<Option<String>> {
        Err(Error::UnsupportedCapability(
            "numeric columns have no value ids to look up".to_string(),
        ))
    }

    fn matches(&self, value: Option<&str>) -> bool {
        self.value().as_deref() == value
    }
}
