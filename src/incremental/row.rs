//! Published rows and the cursor that walks them

use crate::value::EncodedKey;

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A row of the mutable index.
///
/// The dimension array is fixed once the row is published. It is as long as
/// the dimension list was when the row was ingested, so dimensions added
/// later are not covered by older rows.
#[derive(Debug)]
pub struct Row {
    timestamp: i64,
    dims: Box<[EncodedKey]>,
    /// Number of ingested rows folded into this one by rollup
    count: AtomicU64,
}

impl Row {
    pub fn new(timestamp: i64, dims: Vec<EncodedKey>) -> Self {
        Self {
            timestamp,
            dims: dims.into_boxed_slice(),
            count: AtomicU64::new(1),
        }
    }

    /// Event time in epoch milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn dims(&self) -> &[EncodedKey] {
        &self.dims
    }

    pub fn dim(&self, index: usize) -> Option<&EncodedKey> {
        self.dims.get(index)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn increment_count(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }
}

/// Cursor over a snapshot of published rows.
///
/// Selectors borrow the cursor and read whatever row it currently points
/// at, so advancing the cursor moves every selector built from it. The
/// cursor is confined to one thread.
#[derive(Debug)]
pub struct RowCursor {
    rows: Vec<Arc<Row>>,
    position: Cell<usize>,
}

impl RowCursor {
    pub fn new(rows: Vec<Arc<Row>>) -> Self {
        Self {
            rows,
            position: Cell::new(0),
        }
    }

    pub fn current(&self) -> Option<&Row> {
        self.rows.get(self.position.get()).map(Arc::as_ref)
    }

    /// Dimension array of the current row, empty once the cursor is done
    pub fn current_dims(&self) -> &[EncodedKey] {
        self.current().map(Row::dims).unwrap_or(&[])
    }

    pub fn advance(&self) {
        if !self.is_done() {
            self.position.set(self.position.get() + 1);
        }
    }

    pub fn is_done(&self) -> bool {
        self.position.get() >= self.rows.len()
    }

    pub fn reset(&self) {
        self.position.set(0);
    }

    /// Offset of the current row within the snapshot
    pub fn position(&self) -> usize {
        self.position.get()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let cursor = RowCursor::new(vec![
            Arc::new(Row::new(10, vec![EncodedKey::Long(1)])),
            Arc::new(Row::new(20, vec![])),
        ]);

        assert_eq!(cursor.current().unwrap().timestamp(), 10);
        assert_eq!(cursor.current_dims().len(), 1);

        cursor.advance();
        assert_eq!(cursor.position(), 1);
        assert!(cursor.current_dims().is_empty());

        cursor.advance();
        assert!(cursor.is_done());
        assert!(cursor.current().is_none());
        cursor.advance();
        assert_eq!(cursor.position(), 2);

        cursor.reset();
        assert_eq!(cursor.current().unwrap().timestamp(), 10);
    }

    #[test]
    fn test_row_count() {
        let row = Row::new(0, vec![]);
        assert_eq!(row.count(), 1);
        row.increment_count();
        assert_eq!(row.count(), 2);
    }
}
