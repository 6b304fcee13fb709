//! Dimension schema definitions
//!
//! A `DimensionsSpec` names the dimensions an index expects up front, along
//! with their value types. Dimensions that are not declared can still be
//! discovered at ingest time, in which case they are indexed as strings.

use crate::{Error, Result};
use arrow_schema::{DataType, Field};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Standard field names in persisted segments
pub const TIME_FIELD: &str = "__time";
pub const COUNT_FIELD: &str = "count";

/// Value types a dimension can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// 32-bit floating point, stored as a raw primitive
    Float,
    /// 64-bit floating point, stored as a raw primitive
    Double,
    /// 64-bit signed integer, stored as a raw primitive
    Long,
    /// Dictionary-encoded string, optionally multi-valued
    String,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Long => "long",
            ValueType::String => "string",
        }
    }

    /// Whether values of this type are stored as primitives
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueType::String)
    }

    /// Arrow data type for a persisted column of this type
    pub fn arrow_type(&self, multi_value: bool) -> DataType {
        match self {
            ValueType::Float => DataType::Float32,
            ValueType::Double => DataType::Float64,
            ValueType::Long => DataType::Int64,
            ValueType::String if multi_value => {
                DataType::List(std::sync::Arc::new(Field::new("item", DataType::Utf8, true)))
            }
            ValueType::String => {
                DataType::Dictionary(Box::new(DataType::UInt32), Box::new(DataType::Utf8))
            }
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValueType {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "long" => Ok(Self::Long),
            "string" => Ok(Self::String),
            other => Err(format!(
                "unknown value type '{}'; expected one of float, double, long, string",
                other
            )),
        }
    }
}

/// Capabilities a column exposes to readers.
///
/// Capability-probe operations on an indexer (sorted values, bitmap fill)
/// fail with `Error::UnsupportedCapability` when the matching flag is false,
/// so callers are expected to consult this first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCapabilities {
    pub value_type: ValueType,
    pub dictionary_encoded: bool,
    pub has_bitmap_indexes: bool,
    pub has_multiple_values: bool,
}

impl ColumnCapabilities {
    pub fn for_type(value_type: ValueType) -> Self {
        let dictionary = !value_type.is_numeric();
        Self {
            value_type,
            dictionary_encoded: dictionary,
            has_bitmap_indexes: dictionary,
            has_multiple_values: false,
        }
    }
}

/// Declared dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSchema {
    /// Dimension name (event key)
    pub name: String,
    /// Declared value type
    #[serde(rename = "type", default = "default_value_type")]
    pub value_type: ValueType,
}

fn default_value_type() -> ValueType {
    ValueType::String
}

impl DimensionSchema {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Float)
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Double)
    }

    pub fn long(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Long)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }
}

/// Set of declared dimensions, in ordinal order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionsSpec {
    #[serde(default)]
    pub dimensions: Vec<DimensionSchema>,
    /// Event keys that must never become dimensions
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl DimensionsSpec {
    /// Create a new spec builder
    pub fn builder() -> DimensionsSpecBuilder {
        DimensionsSpecBuilder::new()
    }

    /// Parse a spec from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let spec: DimensionsSpec = serde_json::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load a spec from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn get(&self, name: &str) -> Option<&DimensionSchema> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusions.iter().any(|e| e == name)
    }

    /// Reject empty or duplicate names, and declared names that are also excluded
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for dim in &self.dimensions {
            if dim.name.trim().is_empty() {
                return Err(Error::InvalidSchema("dimension name cannot be empty".to_string()));
            }
            if !seen.insert(dim.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate dimension '{}'",
                    dim.name
                )));
            }
            if self.is_excluded(&dim.name) {
                return Err(Error::InvalidSchema(format!(
                    "dimension '{}' is both declared and excluded",
                    dim.name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for DimensionsSpec
#[derive(Debug, Default)]
pub struct DimensionsSpecBuilder {
    dimensions: Vec<DimensionSchema>,
    exclusions: Vec<String>,
}

impl DimensionsSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declared dimension
    pub fn with_dimension(mut self, dimension: DimensionSchema) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Exclude an event key from discovery
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclusions.push(name.into());
        self
    }

    pub fn build(self) -> Result<DimensionsSpec> {
        let spec = DimensionsSpec {
            dimensions: self.dimensions,
            exclusions: self.exclusions,
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_parsing() {
        assert_eq!("FLOAT".parse::<ValueType>().unwrap(), ValueType::Float);
        assert_eq!(" long ".parse::<ValueType>().unwrap(), ValueType::Long);
        assert!("complex".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_capabilities_by_type() {
        let float = ColumnCapabilities::for_type(ValueType::Float);
        assert!(!float.dictionary_encoded);
        assert!(!float.has_bitmap_indexes);

        let string = ColumnCapabilities::for_type(ValueType::String);
        assert!(string.dictionary_encoded);
        assert!(string.has_bitmap_indexes);
    }

    #[test]
    fn test_spec_from_json_defaults_to_string() {
        let spec = DimensionsSpec::from_json(
            r#"{"dimensions":[{"name":"price","type":"float"},{"name":"host"}],"exclusions":["ignored"]}"#,
        )
        .unwrap();

        assert_eq!(spec.get("price").unwrap().value_type, ValueType::Float);
        assert_eq!(spec.get("host").unwrap().value_type, ValueType::String);
        assert!(spec.is_excluded("ignored"));
    }

    #[test]
    fn test_spec_rejects_duplicates() {
        let result = DimensionsSpec::builder()
            .with_dimension(DimensionSchema::float("a"))
            .with_dimension(DimensionSchema::long("a"))
            .build();
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_spec_rejects_declared_exclusion() {
        let result = DimensionsSpec::builder()
            .with_dimension(DimensionSchema::string("host"))
            .exclude("host")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_arrow_types() {
        assert_eq!(ValueType::Float.arrow_type(false), DataType::Float32);
        assert_eq!(ValueType::Long.arrow_type(false), DataType::Int64);
        assert!(matches!(ValueType::String.arrow_type(false), DataType::Dictionary(_, _)));
        assert!(matches!(ValueType::String.arrow_type(true), DataType::List(_)));
    }
}
