//! # dimindex
//!
//! Typed dimension indexers for a mutable, in-memory ingestion index.
//!
//! Every dimension of an [`IncrementalIndex`](incremental::IncrementalIndex)
//! is owned by a dimension indexer that decides how raw event values are
//! encoded into rows, how encoded rows are ordered, compared, and hashed for
//! rollup, and how cursor-bound selectors read values back.
//!
//! ## Dimension kinds
//!
//! - **Numeric** (`float`, `double`, `long`): values are stored inline in the
//!   row. Null, absent, and unparseable inputs are normalized to zero, so null
//!   and zero are indistinguishable after ingest. No dictionary and no bitmap
//!   index is kept.
//! - **String**: values are dictionary encoded, may be multi-valued, and get
//!   bitmap indexes when persisted.
//!
//! ## Layout
//!
//! - [`dimension`]: indexer trait, numeric and string indexers, dictionaries
//! - [`selector`]: column value and dimension selectors, extraction functions
//! - [`incremental`]: the mutable index, rows, cursors, and segment persist
//! - [`coercion`]: raw value conversion and null handling

pub mod bitmap;
pub mod coercion;
pub mod config;
pub mod dimension;
pub mod incremental;
pub mod schema;
pub mod selector;
pub mod telemetry;
pub mod value;

mod error;

pub use config::IndexConfig;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::dimension::{
        AnyDimensionIndexer, DimensionDesc, DimensionIndexer, DoubleDimensionIndexer,
        FloatDimensionIndexer, LongDimensionIndexer, StringDimensionIndexer,
    };
    pub use crate::incremental::{AddOutcome, CursorOrder, IncrementalIndex, InputRow, Segment};
    pub use crate::schema::{DimensionSchema, DimensionsSpec, ValueType};
    pub use crate::selector::{ColumnValueSelector, DimensionSelector, DimensionSpec, ExtractionFn};
    pub use crate::value::{ActualValue, EncodedKey, RawValue};
    pub use crate::{Error, IndexConfig, Result};
}
