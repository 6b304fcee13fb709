//! Cursor-bound read views over a mutable index
//!
//! Selectors borrow a [`RowCursor`](crate::incremental::RowCursor) and decode
//! the cursor's current row on every call. They keep no state between rows.
//! When a row was ingested before a dimension existed, its dimension array
//! does not cover that dimension and selectors report the type default.

mod extraction;
mod numeric;
mod string;

pub use extraction::ExtractionFn;
pub use numeric::{
    IndexerDoubleColumnSelector, IndexerFloatColumnSelector, IndexerLongColumnSelector,
    IndexerNumericColumnSelector, NumericWrappingDimensionSelector,
};
pub use string::IndexerStringSelector;

use crate::dimension::Cardinality;
use crate::value::ActualValue;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Unboxed access to the current row's value, for aggregation hot paths
pub trait ColumnValueSelector {
    fn get_float(&self) -> f32;
    fn get_double(&self) -> f64;
    fn get_long(&self) -> i64;

    /// Boxed value, `None` when the row holds no value for the column
    fn get_object(&self) -> Option<ActualValue>;

    fn is_null(&self) -> bool {
        self.get_object().map_or(true, |v| v.is_null())
    }
}

/// String view of the current row's value, used for grouping and filtering
pub trait DimensionSelector {
    /// Values of the current row, after any extraction function
    fn row_values(&self) -> Vec<Option<String>>;

    fn value_cardinality(&self) -> Cardinality;

    /// Whether `lookup_name` can resolve ids without reading rows
    fn name_lookup_possible_in_advance(&self) -> bool;

    fn lookup_name(&self, id: u32) -> Result<Option<String>>;

    fn matches(&self, value: Option<&str>) -> bool {
        self.row_values().iter().any(|v| v.as_deref() == value)
    }
}

/// Which dimension to read and how to present it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSpec {
    pub dimension: String,
    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default)]
    pub extraction_fn: Option<ExtractionFn>,
}

impl DimensionSpec {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            output_name: None,
            extraction_fn: None,
        }
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_extraction_fn(mut self, extraction_fn: ExtractionFn) -> Self {
        self.extraction_fn = Some(extraction_fn);
        self
    }

    pub fn output_name(&self) -> &str {
        self.output_name.as_deref().unwrap_or(&self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_spec_json() {
        let spec: DimensionSpec = serde_json::from_str(
            r#"{"dimension":"price","outputName":"bucketed","extractionFn":{"type":"bucket","size":5}}"#,
        )
        .unwrap();

        assert_eq!(spec.dimension, "price");
        assert_eq!(spec.output_name(), "bucketed");
        assert_eq!(
            spec.extraction_fn,
            Some(ExtractionFn::Bucket {
                size: 5.0,
                offset: 0.0
            })
        );
    }

    #[test]
    fn test_output_name_defaults_to_dimension() {
        assert_eq!(DimensionSpec::new("host").output_name(), "host");
    }
}
