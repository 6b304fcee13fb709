//! Dimension schema definitions for dimindex
//!
//! Every ingested column is a dimension with a declared value type. Numeric
//! types are stored as raw primitives, strings go through a value dictionary.

mod dimensions;

pub use dimensions::{
    ColumnCapabilities,
    DimensionSchema,
    DimensionsSpec,
    DimensionsSpecBuilder,
    ValueType,
    COUNT_FIELD,
    TIME_FIELD,
};
