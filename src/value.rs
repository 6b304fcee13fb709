//! Value representations flowing through the ingest and read paths
//!
//! - `RawValue`: whatever arrived in the event, before coercion
//! - `EncodedKey`: what a row stores in its dimension slot
//! - `ActualValue`: a decoded value handed back to readers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ingest-time input for a single dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    List(Vec<RawValue>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Sequence-shaped values are rejected by scalar dimensions
    pub fn is_sequence(&self) -> bool {
        matches!(self, RawValue::List(_))
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "bool",
            RawValue::Long(_) => "long",
            RawValue::Double(_) => "double",
            RawValue::String(_) => "string",
            RawValue::List(_) => "list",
        }
    }

    /// Convert from a JSON value. Objects are not valid dimension values.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(_) => None,
            other => serde_json::from_value(other).ok(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => f.write_str("null"),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Long(v) => write!(f, "{}", v),
            RawValue::Double(v) => write!(f, "{:?}", v),
            RawValue::String(s) => f.write_str(s),
            RawValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<f32> for RawValue {
    fn from(v: f32) -> Self {
        RawValue::Double(v as f64)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Double(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Long(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Long(v as i64)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::String(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::String(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawValue::Null)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(v: Vec<T>) -> Self {
        RawValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// Unsorted encoded component as stored in a row's dimension array
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedKey {
    Float(f32),
    Double(f64),
    Long(i64),
    /// Dictionary ids, one per value of a (possibly multi-valued) string row
    Ids(Vec<u32>),
}

impl EncodedKey {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            EncodedKey::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            EncodedKey::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            EncodedKey::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ids(&self) -> Option<&[u32]> {
        match self {
            EncodedKey::Ids(ids) => Some(ids),
            _ => None,
        }
    }
}

/// Decoded value exposed to readers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActualValue {
    Null,
    Float(f32),
    Double(f64),
    Long(i64),
    String(String),
    List(Vec<ActualValue>),
}

impl ActualValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ActualValue::Null)
    }

    /// String rendering used by dimension selectors. Null stays null.
    pub fn to_dimension_string(&self) -> Option<String> {
        match self {
            ActualValue::Null => None,
            ActualValue::Float(v) => Some(format!("{:?}", v)),
            ActualValue::Double(v) => Some(format!("{:?}", v)),
            ActualValue::Long(v) => Some(v.to_string()),
            ActualValue::String(s) => Some(s.clone()),
            ActualValue::List(items) => Some(
                items
                    .iter()
                    .map(|v| v.to_dimension_string().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

impl From<f32> for ActualValue {
    fn from(v: f32) -> Self {
        ActualValue::Float(v)
    }
}

impl From<f64> for ActualValue {
    fn from(v: f64) -> Self {
        ActualValue::Double(v)
    }
}

impl From<i64> for ActualValue {
    fn from(v: i64) -> Self {
        ActualValue::Long(v)
    }
}

impl From<Option<String>> for ActualValue {
    fn from(v: Option<String>) -> Self {
        v.map(ActualValue::String).unwrap_or(ActualValue::Null)
    }
}
