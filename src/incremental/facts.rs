//! Row storage for the mutable index

use super::row::Row;
use crate::dimension::DimensionDesc;
use crate::value::EncodedKey;
use crate::{Error, Result};

use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of adding a row to the facts table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Published as a new row at this offset
    Added { row_number: usize },
    /// Folded into an existing row with the same timestamp and dimensions
    RolledUp { row_number: usize },
}

/// Append-only table of published rows.
///
/// With rollup enabled, rows are keyed by timestamp and dimension values
/// using each dimension's hash and equality, so rows that only differ by
/// null versus zero collapse together.
#[derive(Debug)]
pub struct FactsTable {
    rows: RwLock<Vec<Arc<Row>>>,
    /// Row hash to offsets of rows with that hash
    rollup_keys: Option<Mutex<HashMap<u64, Vec<usize>>>>,
    max_rows: usize,
}

impl FactsTable {
    pub fn new(rollup: bool, max_rows: usize) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            rollup_keys: rollup.then(|| Mutex::new(HashMap::new())),
            max_rows,
        }
    }

    pub fn is_rollup(&self) -> bool {
        self.rollup_keys.is_some()
    }

    /// Publish a fully encoded row
    pub fn add(&self, row: Row, dims: &[DimensionDesc]) -> Result<AddOutcome> {
        let Some(rollup_keys) = &self.rollup_keys else {
            return self.publish(row).map(|row_number| AddOutcome::Added { row_number });
        };

        let hash = row_hash(&row, dims);
        let mut keys = rollup_keys.lock();
        if let Some(candidates) = keys.get(&hash) {
            let rows = self.rows.read();
            for &offset in candidates {
                let existing = &rows[offset];
                if rows_equal(existing, &row, dims) {
                    existing.increment_count();
                    return Ok(AddOutcome::RolledUp { row_number: offset });
                }
            }
        }

        let row_number = self.publish(row)?;
        keys.entry(hash).or_default().push(row_number);
        Ok(AddOutcome::Added { row_number })
    }

    fn publish(&self, row: Row) -> Result<usize> {
        let mut rows = self.rows.write();
        if rows.len() >= self.max_rows {
            return Err(Error::IndexFull {
                max_rows: self.max_rows,
            });
        }
        rows.push(Arc::new(row));
        Ok(rows.len() - 1)
    }

    /// Handles to every row published so far
    pub fn snapshot(&self) -> Vec<Arc<Row>> {
        self.rows.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Sum of rollup counts, i.e. the number of ingested rows
    pub fn ingested_count(&self) -> u64 {
        self.rows.read().iter().map(|r| r.count()).sum()
    }
}

fn key_at<'r>(row: &'r Row, index: usize) -> Option<&'r EncodedKey> {
    row.dim(index)
}

/// Hash of timestamp plus dimensions, ignoring trailing dimensions that are
/// equal to null so rows ingested before a dimension existed hash the same
/// as rows that carry its default.
fn row_hash(row: &Row, dims: &[DimensionDesc]) -> u64 {
    let mut significant = row.dims().len().min(dims.len());
    while significant > 0 {
        let desc = &dims[significant - 1];
        if !desc.indexer.equal(key_at(row, desc.index), None) {
            break;
        }
        significant -= 1;
    }

    let hashes: Vec<u64> = dims[..significant]
        .iter()
        .map(|desc| desc.indexer.hash_key(key_at(row, desc.index)))
        .collect();
    crate::dimension::hash_of(&(row.timestamp(), hashes))
}

fn rows_equal(lhs: &Row, rhs: &Row, dims: &[DimensionDesc]) -> bool {
    lhs.timestamp() == rhs.timestamp()
        && dims
            .iter()
            .all(|desc| desc.indexer.equal(key_at(lhs, desc.index), key_at(rhs, desc.index)))
}

/// Order rows by timestamp, then by each dimension in ordinal order
pub fn compare_rows(lhs: &Row, rhs: &Row, dims: &[DimensionDesc]) -> Ordering {
    lhs.timestamp().cmp(&rhs.timestamp()).then_with(|| {
        dims.iter()
            .map(|desc| desc.indexer.compare(key_at(lhs, desc.index), key_at(rhs, desc.index)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    })
}
