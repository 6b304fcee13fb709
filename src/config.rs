//! Index configuration
//!
//! Settings are read from environment variables so the same binary can be
//! pointed at different dimension layouts without recompiling:
//!
//! - DIMINDEX_DIMENSIONS_SPEC: path to a JSON dimensions spec (optional)
//! - DIMINDEX_REPORT_PARSE_FAILURES: reject unparseable values instead of
//!   defaulting them (default: false)
//! - DIMINDEX_MAX_ROWS: row limit of the mutable index (default: 1000000)
//! - DIMINDEX_ROLLUP: collapse rows with equal timestamp and dimensions
//!   (default: false)
//! - DIMINDEX_DISCOVER_DIMENSIONS: add undeclared event keys as string
//!   dimensions (default: true)
//! - DIMINDEX_TIMESTAMP_COLUMN: event key holding the row time
//!   (default: timestamp)

use crate::schema::DimensionsSpec;
use crate::{Error, Result};
use tracing::info;

pub const DEFAULT_MAX_ROWS: usize = 1_000_000;
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";

/// Configuration of a mutable index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    /// Declared dimensions and exclusions
    pub dimensions: DimensionsSpec,
    /// Fail rows with unparseable values instead of encoding the default
    pub report_parse_failures: bool,
    /// Maximum number of rows before ingest is rejected
    pub max_rows: usize,
    /// Collapse rows with equal timestamp and dimension values
    pub rollup: bool,
    /// Add undeclared event keys as string dimensions
    pub discover_dimensions: bool,
    /// Event key holding the row timestamp
    pub timestamp_column: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimensions: DimensionsSpec::default(),
            report_parse_failures: false,
            max_rows: DEFAULT_MAX_ROWS,
            rollup: false,
            discover_dimensions: true,
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
        }
    }
}

impl IndexConfig {
    pub fn with_dimensions(mut self, dimensions: DimensionsSpec) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_report_parse_failures(mut self, report: bool) -> Self {
        self.report_parse_failures = report;
        self
    }

    pub fn with_rollup(mut self, rollup: bool) -> Self {
        self.rollup = rollup;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_discovery(mut self, discover: bool) -> Self {
        self.discover_dimensions = discover;
        self
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup("DIMINDEX_DIMENSIONS_SPEC")) {
            info!(path = %path, "Loading dimensions spec");
            config.dimensions = DimensionsSpec::from_file(&path)?;
        }
        if let Some(report) = parse_optional_bool(&lookup, "DIMINDEX_REPORT_PARSE_FAILURES")? {
            config.report_parse_failures = report;
        }
        if let Some(max_rows) = parse_optional_usize(&lookup, "DIMINDEX_MAX_ROWS")? {
            config.max_rows = max_rows;
        }
        if let Some(rollup) = parse_optional_bool(&lookup, "DIMINDEX_ROLLUP")? {
            config.rollup = rollup;
        }
        if let Some(discover) = parse_optional_bool(&lookup, "DIMINDEX_DISCOVER_DIMENSIONS")? {
            config.discover_dimensions = discover;
        }
        if let Some(column) = non_empty(lookup("DIMINDEX_TIMESTAMP_COLUMN")) {
            config.timestamp_column = column;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.dimensions.validate()?;
        if self.max_rows == 0 {
            return Err(Error::Config("max_rows must be positive".to_string()));
        }
        if self.dimensions.get(&self.timestamp_column).is_some() {
            return Err(Error::Config(format!(
                "timestamp column '{}' cannot be declared as a dimension",
                self.timestamp_column
            )));
        }
        Ok(())
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_optional_bool<F>(lookup: &F, name: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value = raw.trim().to_ascii_lowercase();
    match value.as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(Error::Config(format!(
            "{name} must be a boolean (true/false/1/0), got '{raw}'"
        ))),
    }
}

fn parse_optional_usize<F>(lookup: &F, name: &str) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = IndexConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, IndexConfig::default());
        assert!(!config.report_parse_failures);
        assert!(config.discover_dimensions);
        assert_eq!(config.max_rows, DEFAULT_MAX_ROWS);
    }

    #[test]
    fn test_overrides() {
        let config = IndexConfig::from_lookup(lookup(&[
            ("DIMINDEX_REPORT_PARSE_FAILURES", "yes"),
            ("DIMINDEX_ROLLUP", "1"),
            ("DIMINDEX_MAX_ROWS", " 42 "),
            ("DIMINDEX_DISCOVER_DIMENSIONS", "off"),
            ("DIMINDEX_TIMESTAMP_COLUMN", "ts"),
        ]))
        .unwrap();

        assert!(config.report_parse_failures);
        assert!(config.rollup);
        assert_eq!(config.max_rows, 42);
        assert!(!config.discover_dimensions);
        assert_eq!(config.timestamp_column, "ts");
    }

    #[test]
    fn test_invalid_values() {
        let err = IndexConfig::from_lookup(lookup(&[("DIMINDEX_ROLLUP", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("DIMINDEX_ROLLUP"));

        assert!(IndexConfig::from_lookup(lookup(&[("DIMINDEX_MAX_ROWS", "-1")])).is_err());
        assert!(IndexConfig::from_lookup(lookup(&[("DIMINDEX_MAX_ROWS", "0")])).is_err());
    }

    #[test]
    fn test_timestamp_column_cannot_be_dimension() {
        let dims = DimensionsSpec::builder()
            .with_dimension(crate::schema::DimensionSchema::long("timestamp"))
            .build()
            .unwrap();
        let config = IndexConfig::default().with_dimensions(dims);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_max_rows_is_invalid() {
        let config = IndexConfig::default().with_max_rows(0);
        assert!(matches!(config.validate(), Err(Error::Config(ref msg)) if msg.contains("max_rows")));
        assert!(IndexConfig::default().with_max_rows(1).validate().is_ok());
    }
}
