//! Selector over dictionary-encoded string dimensions

use super::{ColumnValueSelector, DimensionSelector, ExtractionFn};
use crate::coercion::{self, null_to_zero};
use crate::dimension::{Cardinality, DimensionDictionary};
use crate::incremental::RowCursor;
use crate::value::{ActualValue, RawValue};
use crate::{Error, Result};

use parking_lot::RwLock;
use std::sync::Arc;

/// Reads one string dimension of the cursor's current row.
///
/// Serves both as a dimension selector and, without an extraction function,
/// as a column value selector whose numeric accessors parse the value.
pub struct IndexerStringSelector<'a> {
    cursor: &'a RowCursor,
    dim_index: usize,
    dictionary: Arc<RwLock<DimensionDictionary>>,
    extraction_fn: Option<ExtractionFn>,
}

impl<'a> IndexerStringSelector<'a> {
    pub fn new(
        cursor: &'a RowCursor,
        dim_index: usize,
        dictionary: Arc<RwLock<DimensionDictionary>>,
        extraction_fn: Option<ExtractionFn>,
    ) -> Self {
        Self {
            cursor,
            dim_index,
            dictionary,
            extraction_fn,
        }
    }

    /// Dictionary values of the current row, before extraction.
    /// `None` when the row predates this dimension.
    fn raw_values(&self) -> Option<Vec<Option<String>>> {
        let ids = self.cursor.current_dims().get(self.dim_index)?.as_ids()?;
        let dictionary = self.dictionary.read();
        Some(
            ids.iter()
                .map(|id| dictionary.value(*id).cloned().flatten())
                .collect(),
        )
    }

    fn extract(&self, value: Option<String>) -> Option<String> {
        match &self.extraction_fn {
            None => value,
            Some(f) => f.apply(value.as_deref()),
        }
    }

    /// The current value as a raw scalar; multi-value rows read as null
    fn single_value(&self) -> RawValue {
        let value = match self.raw_values() {
            Some(values) if values.len() == 1 => values.into_iter().next().flatten(),
            _ => None,
        };
        RawValue::from(value)
    }
}

impl<'a> DimensionSelector for IndexerStringSelector<'a> {
    fn row_values(&self) -> Vec<Option<String>> {
        match self.raw_values() {
            Some(values) => values.into_iter().map(|v| self.extract(v)).collect(),
            None => vec![self.extract(None)],
        }
    }

    fn value_cardinality(&self) -> Cardinality {
        if self.extraction_fn.is_some() {
            return Cardinality::Unknown;
        }
        Cardinality::Known(self.dictionary.read().size())
    }

    fn name_lookup_possible_in_advance(&self) -> bool {
        self.extraction_fn.is_none()
    }

    fn lookup_name(&self, id: u32) -> Result<Option<String>> {
        let value = self
            .dictionary
            .read()
            .value(id)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("dictionary id {} out of range", id)))?;
        Ok(self.extract(value))
    }
}

impl<'a> ColumnValueSelector for IndexerStringSelector<'a> {
    fn get_float(&self) -> f32 {
        null_to_zero(coercion::convert_to_float(&self.single_value(), false).ok().flatten())
    }

    fn get_double(&self) -> f64 {
        null_to_zero(coercion::convert_to_double(&self.single_value(), false).ok().flatten())
    }

    fn get_long(&self) -> i64 {
        null_to_zero(coercion::convert_to_long(&self.single_value(), false).ok().flatten())
    }

    fn get_object(&self) -> Option<ActualValue> {
        let mut values = self.raw_values()?;
        match values.len() {
            1 => values.remove(0).map(ActualValue::String),
            _ => Some(ActualValue::List(
                values.into_iter().map(ActualValue::from).collect(),
            )),
        }
    }
}
