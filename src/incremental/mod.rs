//! Mutable in-memory index
//!
//! The incremental index is responsible for:
//! - Registering declared dimensions and discovering new ones at ingest
//! - Encoding each event through its dimensions' indexers
//! - Publishing rows, optionally rolled up by timestamp and dimensions
//! - Handing out cursors and selectors for reads concurrent with ingest
//! - Persisting a snapshot as a columnar segment

mod facts;
mod input;
mod persist;
mod row;
mod telemetry;

pub use facts::{compare_rows, AddOutcome, FactsTable};
pub use input::InputRow;
pub use persist::{Segment, SegmentWriter};
pub use row::{Row, RowCursor};

use crate::config::IndexConfig;
use crate::dimension::{AnyDimensionIndexer, DimensionDesc};
use crate::schema::{ColumnCapabilities, ValueType};
use crate::selector::{ColumnValueSelector, DimensionSelector, DimensionSpec};
use crate::value::{EncodedKey, RawValue};
use crate::{Error, Result};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Row order of a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorOrder {
    /// Order in which rows were published
    #[default]
    Insertion,
    /// Timestamp, then each dimension in ordinal order
    Sorted,
}

/// Dimensions known to the index, in ordinal order
#[derive(Debug, Default)]
struct DimensionRegistry {
    descs: Vec<DimensionDesc>,
    by_name: HashMap<String, usize>,
}

impl DimensionRegistry {
    fn get(&self, name: &str) -> Option<&DimensionDesc> {
        self.by_name.get(name).map(|&i| &self.descs[i])
    }

    fn register(&mut self, name: &str, value_type: ValueType) -> &DimensionDesc {
        let index = self.descs.len();
        self.descs.push(DimensionDesc::new(
            index,
            name,
            AnyDimensionIndexer::for_type(value_type),
        ));
        self.by_name.insert(name.to_string(), index);
        telemetry::record_dimension_created(value_type.as_str());
        &self.descs[index]
    }
}

/// Mutable index fed one event at a time.
///
/// Ingest and reads may run concurrently from different threads. A cursor
/// sees the rows published when it was created.
#[derive(Debug)]
pub struct IncrementalIndex {
    config: IndexConfig,
    dimensions: RwLock<DimensionRegistry>,
    facts: FactsTable,
}

impl IncrementalIndex {
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;

        let mut registry = DimensionRegistry::default();
        for schema in &config.dimensions.dimensions {
            registry.register(&schema.name, schema.value_type);
        }

        let facts = FactsTable::new(config.rollup, config.max_rows);
        info!(
            declared_dimensions = registry.descs.len(),
            rollup = config.rollup,
            max_rows = config.max_rows,
            report_parse_failures = config.report_parse_failures,
            "Created incremental index"
        );

        Ok(Self {
            config,
            dimensions: RwLock::new(registry),
            facts,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Encode and publish one event.
    ///
    /// A row that fails to encode is rejected as a whole and nothing is
    /// published for it.
    pub fn add(&self, input: &InputRow) -> Result<AddOutcome> {
        let start = Instant::now();
        self.discover(input);

        let descs = self.dimensions.read().descs.clone();
        let encoded = match self.encode(input, &descs) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(timestamp = input.timestamp(), error = %e, "Rejected row");
                telemetry::record_rejection(rejection_reason(&e));
                return Err(e);
            }
        };

        let outcome = self
            .facts
            .add(Row::new(input.timestamp(), encoded), &descs)
            .inspect_err(|e| telemetry::record_rejection(rejection_reason(e)))?;

        telemetry::record_add(
            start.elapsed().as_secs_f64(),
            matches!(outcome, AddOutcome::RolledUp { .. }),
        );
        Ok(outcome)
    }

    /// Register undeclared event keys as string dimensions
    fn discover(&self, input: &InputRow) {
        if !self.config.discover_dimensions {
            return;
        }

        let is_new = |registry: &DimensionRegistry, name: &str| {
            registry.get(name).is_none()
                && !self.config.dimensions.is_excluded(name)
                && name != self.config.timestamp_column
        };

        let missing: Vec<&str> = {
            let registry = self.dimensions.read();
            input
                .dimension_names()
                .filter(|name| is_new(&*registry, name))
                .collect()
        };
        if missing.is_empty() {
            return;
        }

        let mut registry = self.dimensions.write();
        for name in missing {
            if !is_new(&*registry, name) {
                continue;
            }
            let desc = registry.register(name, ValueType::String);
            debug!(dimension = %desc.name, index = desc.index, "Discovered dimension");
        }
    }

    fn encode(&self, input: &InputRow, descs: &[DimensionDesc]) -> Result<Vec<EncodedKey>> {
        descs
            .iter()
            .map(|desc| {
                let raw = input.get(&desc.name).unwrap_or(&RawValue::Null);
                desc.indexer
                    .process_row_vals(raw, self.config.report_parse_failures)
                    .map_err(|e| match e {
                        Error::ParseFailure(msg) => {
                            Error::ParseFailure(format!("dimension '{}': {}", desc.name, msg))
                        }
                        Error::InvalidShape(msg) => {
                            Error::InvalidShape(format!("dimension '{}': {}", desc.name, msg))
                        }
                        other => other,
                    })
            })
            .collect()
    }

    /// Cursor over the rows published so far
    pub fn cursor(&self, order: CursorOrder) -> RowCursor {
        let mut rows = self.facts.snapshot();
        if order == CursorOrder::Sorted {
            let descs = self.dimensions.read().descs.clone();
            rows.sort_by(|a, b| compare_rows(a, b, &descs));
        }
        RowCursor::new(rows)
    }

    /// Column value selector for a named dimension
    pub fn make_column_value_selector<'a>(
        &self,
        cursor: &'a RowCursor,
        dimension: &str,
    ) -> Result<Box<dyn ColumnValueSelector + 'a>> {
        let desc = self.require(dimension)?;
        Ok(desc.indexer.make_column_value_selector(cursor, &desc))
    }

    /// Dimension selector for the dimension named by `spec`
    pub fn make_dimension_selector<'a>(
        &self,
        cursor: &'a RowCursor,
        spec: &DimensionSpec,
    ) -> Result<Box<dyn DimensionSelector + 'a>> {
        let desc = self.require(&spec.dimension)?;
        Ok(desc.indexer.make_dimension_selector(spec, cursor, &desc))
    }

    fn require(&self, name: &str) -> Result<DimensionDesc> {
        self.dimension(name)
            .ok_or_else(|| Error::UnknownDimension(name.to_string()))
    }

    pub fn dimension(&self, name: &str) -> Option<DimensionDesc> {
        self.dimensions.read().get(name).cloned()
    }

    /// Dimension names in ordinal order
    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions
            .read()
            .descs
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn capabilities(&self, name: &str) -> Option<ColumnCapabilities> {
        self.dimensions.read().get(name).map(DimensionDesc::capabilities)
    }

    /// Number of published rows
    pub fn row_count(&self) -> usize {
        self.facts.len()
    }

    /// Number of ingested events, counting rolled up ones
    pub fn ingested_count(&self) -> u64 {
        self.facts.ingested_count()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Build a columnar segment from the rows published so far, in sorted order
    pub fn persist(&self) -> Result<Segment> {
        let start = Instant::now();
        let descs = self.dimensions.read().descs.clone();
        let cursor = self.cursor(CursorOrder::Sorted);

        let segment = SegmentWriter::new(self.config.rollup).write(cursor.rows(), &descs)?;

        let elapsed = start.elapsed();
        info!(
            rows = segment.num_rows(),
            dimensions = descs.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Persisted segment"
        );
        telemetry::record_persist(elapsed.as_secs_f64(), segment.num_rows() as u64);
        Ok(segment)
    }
}

fn rejection_reason(error: &Error) -> &'static str {
    match error {
        Error::ParseFailure(_) => "parse_failure",
        Error::InvalidShape(_) => "invalid_shape",
        Error::IndexFull { .. } => "index_full",
        _ => "other",
    }
}
