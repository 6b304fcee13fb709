//! Error types for dimindex

use std::fmt;

/// Result type alias for dimindex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dimindex
#[derive(Debug)]
pub enum Error {
    /// A dictionary-only operation was invoked on a kind without a dictionary
    UnsupportedCapability(String),
    /// A scalar dimension received sequence-shaped input
    InvalidShape(String),
    /// A raw value could not be converted and failures are being reported
    ParseFailure(String),
    /// Arrow-related errors
    Arrow(arrow_schema::ArrowError),
    /// IO errors
    Io(std::io::Error),
    /// Serialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// Invalid dimension schema
    InvalidSchema(String),
    /// The mutable index reached its row limit
    IndexFull { max_rows: usize },
    /// No dimension with the given name has been observed
    UnknownDimension(String),
    /// Internal error
    Internal(String),
}

impl Error {
    /// True for the capability-probe failure callers are expected to check for
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedCapability(_))
    }

    /// True when the failure is attributable to the row being ingested
    pub fn rejects_row(&self) -> bool {
        matches!(self, Error::InvalidShape(_) | Error::ParseFailure(_))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Arrow(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedCapability(msg) => write!(f, "Unsupported capability: {}", msg),
            Error::InvalidShape(msg) => write!(f, "Invalid shape: {}", msg),
            Error::ParseFailure(msg) => write!(f, "Parse failure: {}", msg),
            Error::Arrow(e) => write!(f, "Arrow error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidSchema(msg) => write!(f, "Invalid schema: {}", msg),
            Error::IndexFull { max_rows } => {
                write!(f, "Mutable index is full: limit of {} rows reached", max_rows)
            }
            Error::UnknownDimension(name) => write!(f, "Unknown dimension: {}", name),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<arrow_schema::ArrowError> for Error {
    fn from(e: arrow_schema::ArrowError) -> Self {
        Error::Arrow(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_classification() {
        let err = Error::UnsupportedCapability("bitmaps".to_string());
        assert!(err.is_unsupported());
        assert!(!err.rejects_row());

        assert!(Error::InvalidShape("list".to_string()).rejects_row());
        assert!(Error::ParseFailure("abc".to_string()).rejects_row());
        assert!(!Error::IndexFull { max_rows: 1 }.rejects_row());
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(format!("{err}").starts_with("Serialization error"));
    }
}
