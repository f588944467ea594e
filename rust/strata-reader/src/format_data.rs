//! Format-specific data access behind the readers.
//!
//! A reader never touches encoded streams directly: it asks its [`FormatData`] for
//! the nulls of a read window, and a leaf additionally asks its [`LeafData`] for the
//! dense non-null values.

use strata_bits::BitMask;
use strata_common::Result;
use strata_vector::values::Values;

use crate::{
    scan_spec::ScanSpec,
    stats::{FilterRowGroupsResult, StatsContext},
};

/// Null and row-group access for one column.
pub trait FormatData: Send {
    /// Decodes the nulls of the next `num_rows` rows of the read window (bit set =
    /// null) and merges in `incoming_nulls` from the enclosing struct. Returns `None`
    /// when no row in the window is null.
    ///
    /// When parent nulls are not stored in this column, rows that are null in
    /// `incoming_nulls` consume no entry of the column's streams.
    fn read_nulls(
        &mut self,
        num_rows: usize,
        incoming_nulls: Option<&BitMask>,
    ) -> Result<Option<BitMask>>;

    /// Skips `num_values` entries of the null stream and returns how many of them
    /// were non-null.
    fn skip_nulls(&mut self, num_values: u64) -> Result<u64>;

    /// Whether the column stores an entry (null) for rows whose parent is null, so
    /// that enclosing structs must not account for parent nulls themselves.
    fn parent_nulls_in_leaves(&self) -> bool;

    /// Adds the row groups that `scan_spec`'s own filter rules out to `result`.
    fn filter_row_groups(
        &self,
        scan_spec: &ScanSpec,
        row_group_size: u64,
        context: &StatsContext,
        result: &mut FilterRowGroupsResult,
    ) -> Result<()>;
}

/// Value access for a scalar column.
pub trait LeafData: FormatData {
    /// Decodes the next `count` non-null values.
    fn read_values(&mut self, count: usize) -> Result<Values>;

    /// Skips the next `count` non-null values.
    fn skip_values(&mut self, count: u64) -> Result<()>;
}
