//! Input rows as handed to the mutable index

use crate::value::RawValue;
use crate::{Error, Result};

use chrono::DateTime;
use serde_json::Value;
use std::collections::BTreeMap;

/// A single event: a timestamp plus raw values keyed by dimension name
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    timestamp: i64,
    event: BTreeMap<String, RawValue>,
}

impl InputRow {
    /// Create an empty event at `timestamp` (epoch milliseconds)
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            event: BTreeMap::new(),
        }
    }

    /// Set a dimension value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.event.insert(name.into(), value.into());
        self
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.event.get(name)
    }

    /// Event keys in sorted order
    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.event.keys().map(String::as_str)
    }

    /// Build a row from a JSON object.
    ///
    /// The timestamp column may hold epoch milliseconds or an RFC 3339 string.
    /// It is not kept as a dimension.
    pub fn from_json(value: Value, timestamp_column: &str) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::InvalidShape("event must be a JSON object".to_string()));
        };

        let raw_timestamp = fields.remove(timestamp_column).ok_or_else(|| {
            Error::ParseFailure(format!("event is missing timestamp column '{}'", timestamp_column))
        })?;
        let timestamp = parse_timestamp(&raw_timestamp)?;

        let mut event = BTreeMap::new();
        for (name, value) in fields {
            let raw = RawValue::from_json(value).ok_or_else(|| {
                Error::InvalidShape(format!("field '{}' is a nested object", name))
            })?;
            event.insert(name, raw);
        }

        Ok(Self { timestamp, event })
    }
}

fn parse_timestamp(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| Error::ParseFailure(format!("invalid timestamp {}", n))),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(millis) = s.parse::<i64>() {
                return Ok(millis);
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_millis())
                .map_err(|e| Error::ParseFailure(format!("invalid timestamp '{}': {}", s, e)))
        }
        other => Err(Error::ParseFailure(format!("invalid timestamp {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_millis() {
        let row = InputRow::from_json(
            json!({"ts": 1700000000000i64, "host": "a", "price": 2.5, "tags": ["x", "y"]}),
            "ts",
        )
        .unwrap();

        assert_eq!(row.timestamp(), 1_700_000_000_000);
        assert_eq!(row.get("host"), Some(&RawValue::from("a")));
        assert_eq!(row.get("price"), Some(&RawValue::Double(2.5)));
        assert!(row.get("tags").unwrap().is_sequence());
        assert!(row.get("ts").is_none());
        assert_eq!(row.dimension_names().collect::<Vec<_>>(), vec!["host", "price", "tags"]);
    }

    #[test]
    fn test_from_json_rfc3339() {
        let row = InputRow::from_json(json!({"timestamp": "2024-01-01T00:00:01Z"}), "timestamp")
            .unwrap();
        assert_eq!(row.timestamp(), 1_704_067_201_000);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            InputRow::from_json(json!([1, 2]), "ts"),
            Err(Error::InvalidShape(_))
        ));
        assert!(matches!(
            InputRow::from_json(json!({"a": 1}), "ts"),
            Err(Error::ParseFailure(_))
        ));
        assert!(matches!(
            InputRow::from_json(json!({"ts": "yesterday"}), "ts"),
            Err(Error::ParseFailure(_))
        ));
        assert!(matches!(
            InputRow::from_json(json!({"ts": 1, "nested": {"a": 1}}), "ts"),
            Err(Error::InvalidShape(_))
        ));
    }
}
