//! Row-group statistics and the row-group skip result.

use strata_bits::BitMask;
use strata_vector::Value;

/// Statistics of one column within one row group. `Value::Null` bounds are unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStats {
    pub row_count: u64,
    pub null_count: u64,
    pub min: Value,
    pub max: Value,
}

impl ColumnStats {
    /// Computes the statistics of a list of values (`Value::Null` = null row).
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnStats {
        let mut stats = ColumnStats::default();
        for value in values {
            stats.row_count += 1;
            if value.is_null() {
                stats.null_count += 1;
                continue;
            }
            if stats.min.is_null() || value < &stats.min {
                stats.min = value.clone();
            }
            if stats.max.is_null() || value > &stats.max {
                stats.max = value.clone();
            }
        }
        stats
    }

    /// Statistics that only count nulls, as kept for struct levels.
    pub fn from_nulls(nulls: impl IntoIterator<Item = bool>) -> ColumnStats {
        let mut stats = ColumnStats::default();
        for is_null in nulls {
            stats.row_count += 1;
            stats.null_count += u64::from(is_null);
        }
        stats
    }

    #[inline]
    pub fn has_nulls(&self) -> bool {
        self.null_count > 0
    }

    #[inline]
    pub fn all_null(&self) -> bool {
        self.null_count == self.row_count
    }
}

/// Scan-wide context for row-group filtering.
#[derive(Debug, Clone, Copy)]
pub struct StatsContext {
    /// Number of top-level rows in the scanned file.
    pub total_rows: u64,
}

impl StatsContext {
    /// Number of row groups of `row_group_size` rows needed to cover the file.
    pub fn row_group_count(&self, row_group_size: u64) -> usize {
        self.total_rows.div_ceil(row_group_size) as usize
    }
}

/// Accumulated row-group skip decisions (bit set = the row group can be skipped).
///
/// Readers only ever add skip evidence; a bit, once set, stays set.
#[derive(Debug, Clone, Default)]
pub struct FilterRowGroupsResult {
    pub filter_result: BitMask,
    pub total_count: usize,
}

impl FilterRowGroupsResult {
    pub fn new(total_count: usize) -> FilterRowGroupsResult {
        FilterRowGroupsResult {
            filter_result: BitMask::empty(total_count),
            total_count,
        }
    }

    /// Grows the result to cover at least `total_count` row groups.
    pub fn ensure_count(&mut self, total_count: usize) {
        if total_count > self.total_count {
            self.total_count = total_count;
            self.filter_result.resize(total_count);
        }
    }

    pub fn skip(&mut self, row_group: usize) {
        self.ensure_count(row_group + 1);
        self.filter_result.set(row_group);
    }

    pub fn is_skipped(&self, row_group: usize) -> bool {
        self.filter_result.get(row_group)
    }

    pub fn skipped_count(&self) -> usize {
        self.filter_result.count_ones()
    }
}
