//! Scan-time row deletions.

use std::ops::Range;

use strata_bits::BitMask;

/// Rows logically deleted since the file was written, in terms of the rows of one
/// top-level batch (bit set = deleted).
///
/// A mutation is only ever applied by the root struct reader.
#[derive(Debug, Clone, Default)]
pub struct Mutation {
    pub deleted_rows: Option<BitMask>,
}

impl Mutation {
    pub fn new(deleted_rows: BitMask) -> Mutation {
        Mutation {
            deleted_rows: Some(deleted_rows),
        }
    }

    /// Builds the mutation of one batch from a file-wide deletion mask, re-basing the
    /// bits of `range` to start at 0. Rows beyond the end of `deleted` are live.
    pub fn from_range(deleted: &BitMask, range: Range<usize>) -> Mutation {
        let len = range.len();
        let mut batch = BitMask::empty(len);
        for row in range.clone() {
            if deleted.get(row) {
                batch.set(row - range.start);
            }
        }
        Mutation::new(batch)
    }

    /// Returns `true` if the mutation deletes at least one row.
    pub fn has_deletions(&self) -> bool {
        self.deleted_rows.as_ref().is_some_and(BitMask::any)
    }

    #[inline]
    pub fn is_deleted(&self, row: usize) -> bool {
        self.deleted_rows.as_ref().is_some_and(|rows| rows.get(row))
    }

    /// Number of deleted rows among the first `num_rows`.
    pub fn deleted_count(&self, num_rows: usize) -> usize {
        self.deleted_rows
            .as_ref()
            .map_or(0, |rows| rows.count_ones_in(0..num_rows.min(rows.len())))
    }
}
