//! The column reader contract and the bookkeeping shared by every reader.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use log::trace;
use strata_bits::BitMask;
use strata_common::{Result, verify_state};
use strata_vector::VectorRef;

use crate::{
    row_set::{self, RowIndex},
    stats::{FilterRowGroupsResult, StatsContext},
    struct_reader::StructColumnReader,
};

static NEXT_READER_ID: AtomicU64 = AtomicU64::new(1);

/// A selective reader of one column.
///
/// Offsets are in top-level rows: after `read(offset, rows, ..)` the reader is
/// positioned at `offset + rows.last() + 1`, however many physical values it
/// consumed. Row sets are relative to `offset`.
pub trait ColumnReader: Send {
    fn base(&self) -> &ReaderBase;

    fn base_mut(&mut self) -> &mut ReaderBase;

    /// Reads the window `[offset, offset + rows.last() + 1)`, decoding nulls and
    /// applying the filter of the reader's scan spec. `incoming_nulls` holds the
    /// nulls of the enclosing struct for the window.
    fn read(
        &mut self,
        offset: u64,
        rows: &[RowIndex],
        incoming_nulls: Option<&BitMask>,
    ) -> Result<()>;

    /// Skips `num_values` physical values and returns `num_values`. The read offset
    /// is fixed up by the caller (see [`seek_to`](Self::seek_to)).
    fn skip(&mut self, num_values: u64) -> Result<u64>;

    /// Materializes `rows` (a subset of the rows of the last read) into `result`.
    fn get_values(&mut self, rows: &[RowIndex], result: &mut Option<VectorRef>) -> Result<()>;

    /// Adds the row groups ruled out by this reader's statistics to `result`.
    fn filter_row_groups(
        &self,
        row_group_size: u64,
        context: &StatsContext,
        result: &mut FilterRowGroupsResult,
    ) -> Result<()>;

    /// Sets the read offset of this reader and of every reader below it.
    fn set_read_offset_recursive(&mut self, offset: u64) {
        self.base_mut().set_read_offset(offset);
    }

    /// Rows that passed the last read.
    fn output_rows(&self) -> &[RowIndex] {
        self.base().output_rows()
    }

    fn read_offset(&self) -> u64 {
        self.base().read_offset()
    }

    /// Whether the reader sits directly below the root struct, which makes it
    /// eligible for lazy loading.
    fn is_top_level(&self) -> bool {
        self.base().is_top_level()
    }

    fn reset_init_time_clocks(&mut self) {
        self.base_mut().reset_init_time();
    }

    /// Time spent positioning the reader before decoding, since the last reset.
    fn init_time_clocks(&self) -> Duration {
        self.base().init_time()
    }

    /// Records the nulls of a window of the enclosing struct that this reader has
    /// not read, so that a later seek skips only the values actually stored.
    fn add_parent_nulls(&mut self, first_row: u64, nulls: Option<&BitMask>, rows: &[RowIndex]) {
        self.base_mut().add_parent_nulls(first_row, nulls, rows);
    }

    /// Moves the reader forward to `offset`, skipping the physical values in between.
    ///
    /// # Errors
    ///
    /// Seeking backward is a contract violation.
    fn seek_to(&mut self, offset: u64) -> Result<()> {
        let read_offset = self.read_offset();
        if offset == read_offset {
            return Ok(());
        }
        verify_state!(offset > read_offset, "column readers cannot seek backward");
        let parent_nulls = self.base().parent_nulls_between(read_offset, offset);
        let distance = offset - read_offset - parent_nulls;
        trace!(
            "reader {} seeks {read_offset} -> {offset}, skipping {distance} values",
            self.base().id()
        );
        if distance > 0 {
            self.skip(distance)?;
        }
        self.set_read_offset_recursive(offset);
        Ok(())
    }

    fn as_struct(&self) -> Option<&StructColumnReader> {
        None
    }

    fn as_struct_mut(&mut self) -> Option<&mut StructColumnReader> {
        None
    }
}

/// Nulls of an enclosing-struct window that a reader skipped over.
#[derive(Debug, Clone)]
struct ParentNullRun {
    start: u64,
    nulls: BitMask,
}

impl ParentNullRun {
    fn end(&self) -> u64 {
        self.start + self.nulls.len() as u64
    }

    fn count_between(&self, from: u64, to: u64) -> u64 {
        let lo = from.max(self.start);
        let hi = to.min(self.end());
        if lo >= hi {
            return 0;
        }
        let range = (lo - self.start) as usize..(hi - self.start) as usize;
        self.nulls.count_ones_in(range) as u64
    }
}

/// State every reader keeps between `read` and `get_values`.
#[derive(Debug)]
pub struct ReaderBase {
    id: u64,
    read_offset: u64,
    output_rows: Vec<RowIndex>,
    nulls_in_read_range: Option<BitMask>,
    parent_nulls: VecDeque<ParentNullRun>,
    init_time: Duration,
    is_top_level: bool,
}

impl ReaderBase {
    pub fn new(is_top_level: bool) -> ReaderBase {
        ReaderBase {
            id: NEXT_READER_ID.fetch_add(1, Ordering::Relaxed),
            read_offset: 0,
            output_rows: Vec::new(),
            nulls_in_read_range: None,
            parent_nulls: VecDeque::new(),
            init_time: Duration::ZERO,
            is_top_level,
        }
    }

    /// Process-unique id of the reader, used by lazy vectors to find their owner.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn read_offset(&self) -> u64 {
        self.read_offset
    }

    /// Moves the read offset; recorded parent nulls behind it are dropped.
    pub fn set_read_offset(&mut self, offset: u64) {
        self.read_offset = offset;
        while self
            .parent_nulls
            .front()
            .is_some_and(|run| run.end() <= offset)
        {
            self.parent_nulls.pop_front();
        }
    }

    pub fn output_rows(&self) -> &[RowIndex] {
        &self.output_rows
    }

    pub fn set_output_rows(&mut self, rows: &[RowIndex]) {
        self.output_rows.clear();
        self.output_rows.extend_from_slice(rows);
    }

    pub fn clear_output_rows(&mut self) {
        self.output_rows.clear();
    }

    /// Nulls of the last read window, one bit per window row.
    pub fn nulls_in_read_range(&self) -> Option<&BitMask> {
        self.nulls_in_read_range.as_ref()
    }

    pub fn set_nulls_in_read_range(&mut self, nulls: Option<BitMask>) {
        self.nulls_in_read_range = nulls;
    }

    #[inline]
    pub fn is_null_in_read_range(&self, row: RowIndex) -> bool {
        self.nulls_in_read_range
            .as_ref()
            .is_some_and(|nulls| nulls.get(row as usize))
    }

    pub fn is_top_level(&self) -> bool {
        self.is_top_level
    }

    pub fn init_time(&self) -> Duration {
        self.init_time
    }

    pub fn reset_init_time(&mut self) {
        self.init_time = Duration::ZERO;
    }

    pub fn add_init_time(&mut self, time: Duration) {
        self.init_time += time;
    }

    /// Records the parent nulls of the window `[first_row, first_row + rows.last() + 1)`
    /// (`nulls` is indexed from `first_row`). Only the part of the window at or
    /// after the current read offset counts; a reader that already read the window
    /// is unaffected.
    pub fn add_parent_nulls(&mut self, first_row: u64, nulls: Option<&BitMask>, rows: &[RowIndex]) {
        let Some(nulls) = nulls else {
            return;
        };
        let window = row_set::window_len(rows);
        let end = first_row + window as u64;
        if window == 0 || self.read_offset >= end {
            return;
        }
        let mut run = ParentNullRun {
            start: first_row,
            nulls: nulls.clone(),
        };
        run.nulls.resize(window);
        if run.count_between(self.read_offset, end) > 0 {
            self.parent_nulls.push_back(run);
        }
    }

    /// Number of recorded parent nulls in `[from, to)`.
    pub fn parent_nulls_between(&self, from: u64, to: u64) -> u64 {
        self.parent_nulls
            .iter()
            .map(|run| run.count_between(from, to))
            .sum()
    }

    /// Recorded parent nulls at or after the read offset.
    pub fn pending_parent_nulls(&self) -> u64 {
        self.parent_nulls_between(self.read_offset, u64::MAX)
    }
}
