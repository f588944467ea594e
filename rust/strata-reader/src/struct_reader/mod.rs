//! Reader for struct (row-typed) columns.
//!
//! A [`StructColumnReader`] owns one child reader per file field it needs and
//! orchestrates them through a batch:
//!
//! - `read` computes the struct's nulls for the window, applies deletions (root
//!   only) and the struct's own null filter, then reads every child that cannot be
//!   deferred, narrowing the active rows by each filtered child in turn.
//! - `get_values` assembles the output row vector, reusing the previous one when it
//!   is uniquely held, and wraps deferred children in lazy vectors bound to the
//!   current read epoch.
//!
//! Children that are neither read nor skipped lag behind the struct. They catch up
//! with a seek, which accounts for the struct nulls recorded while they lagged.

use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, trace};
use strata_bits::BitMask;
use strata_common::{Result, error::Error, verify_arg, verify_state};
use strata_vector::{DataType, VectorRef};

use crate::{
    config::ReaderConfig,
    format_data::FormatData,
    mutation::Mutation,
    reader::{ColumnReader, ReaderBase},
    row_set::{self, RowIndex},
    scan_spec::ScanSpec,
    selectivity::SelectivityTimer,
    stats::{FilterRowGroupsResult, StatsContext},
};

mod lazy;
mod result;

pub struct StructColumnReader {
    base: ReaderBase,
    scan_spec: Arc<ScanSpec>,
    file_type: DataType,
    format_data: Box<dyn FormatData>,
    /// Child readers indexed by file field position (the child spec's subscript).
    children: Vec<Option<Box<dyn ColumnReader>>>,
    config: Arc<ReaderConfig>,
    is_root: bool,
    /// Incremented by every read and skip; lazy vectors of older epochs cannot load.
    epoch: u64,
    lazy_vector_read_offset: u64,
    /// Deferred children already loaded in the current epoch, by child index.
    loaded_children: AHashMap<usize, VectorRef>,
    mutation: Option<Mutation>,
    rows: Vec<RowIndex>,
    active_rows: Vec<RowIndex>,
    result_rows: Vec<RowIndex>,
}

impl StructColumnReader {
    /// Creates the root reader of a reader tree.
    pub fn root(
        scan_spec: Arc<ScanSpec>,
        file_type: DataType,
        format_data: Box<dyn FormatData>,
        children: Vec<Option<Box<dyn ColumnReader>>>,
        config: Arc<ReaderConfig>,
    ) -> Result<StructColumnReader> {
        config.validate()?;
        Self::new(scan_spec, file_type, format_data, children, config, true, false)
    }

    /// Creates a reader for a struct nested in another struct.
    pub fn nested(
        scan_spec: Arc<ScanSpec>,
        file_type: DataType,
        format_data: Box<dyn FormatData>,
        children: Vec<Option<Box<dyn ColumnReader>>>,
        config: Arc<ReaderConfig>,
        is_top_level: bool,
    ) -> Result<StructColumnReader> {
        Self::new(
            scan_spec,
            file_type,
            format_data,
            children,
            config,
            false,
            is_top_level,
        )
    }

    fn new(
        scan_spec: Arc<ScanSpec>,
        file_type: DataType,
        format_data: Box<dyn FormatData>,
        children: Vec<Option<Box<dyn ColumnReader>>>,
        config: Arc<ReaderConfig>,
        is_root: bool,
        is_top_level: bool,
    ) -> Result<StructColumnReader> {
        verify_arg!(scan_spec, scan_spec.data_type().is_struct());
        verify_arg!(file_type, file_type.is_struct());
        verify_arg!(children, children.len() <= file_type.size());
        Ok(StructColumnReader {
            base: ReaderBase::new(is_top_level),
            scan_spec,
            file_type,
            format_data,
            children,
            config,
            is_root,
            epoch: 0,
            lazy_vector_read_offset: 0,
            loaded_children: AHashMap::new(),
            mutation: None,
            rows: Vec::new(),
            active_rows: Vec::new(),
            result_rows: Vec::new(),
        })
    }

    pub fn scan_spec(&self) -> &Arc<ScanSpec> {
        &self.scan_spec
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// The query type of the rows this reader produces.
    pub fn requested_type(&self) -> &DataType {
        self.scan_spec.data_type()
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Offset of the window that deferred children load from.
    pub fn lazy_vector_read_offset(&self) -> u64 {
        self.lazy_vector_read_offset
    }

    /// The child reader at file field position `index`, if one was built.
    pub fn child(&self, index: usize) -> Option<&dyn ColumnReader> {
        self.children.get(index).and_then(|child| child.as_deref())
    }

    /// All child readers, in file field order.
    pub fn child_readers(&self) -> impl Iterator<Item = &dyn ColumnReader> + '_ {
        self.children.iter().filter_map(|child| child.as_deref())
    }

    /// Invalidates every lazy vector handed out so far.
    fn next_epoch(&mut self) {
        self.epoch += 1;
        self.loaded_children.clear();
    }

    fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    fn child_mut(&mut self, index: usize) -> Result<&mut Box<dyn ColumnReader>> {
        child_slot(&mut self.children, index)
    }

    /// A child is constant if its spec carries a constant, or if a nested struct's
    /// file type predates the field (its output channel lies beyond the file's
    /// fields). Constant children are never read.
    fn is_child_constant(&self, child_spec: &ScanSpec) -> bool {
        child_spec.is_constant()
            || (!self.is_root
                && child_spec
                    .channel()
                    .is_some_and(|channel| channel >= self.file_type.size()))
    }

    /// Whether a child is read in `read` rather than deferred to a lazy vector.
    fn is_deferred(&self, child_spec: &ScanSpec, child: &dyn ColumnReader) -> bool {
        self.config.lazy_loading
            && child.is_top_level()
            && child_spec.project_out()
            && !child_spec.has_filter()
            && !child_spec.extract_values()
    }

    /// Reads the next `num_values` top-level rows into `result`, applying
    /// `mutation`. Only valid on the root reader.
    ///
    /// `result` must hold a row-typed vector; it is reused in place when uniquely
    /// held.
    pub fn next(
        &mut self,
        num_values: usize,
        result: &mut Option<VectorRef>,
        mutation: Option<&Mutation>,
    ) -> Result<()> {
        verify_state!(self.is_root, "next is only valid on the root struct reader");
        verify_arg!(num_values, num_values <= self.config.max_batch_rows);
        if !self.has_children() {
            return self.next_without_children(num_values, result, mutation);
        }
        if num_values == 0 {
            return self.get_values(&[], result);
        }

        let mut rows = std::mem::take(&mut self.rows);
        row_set::fill_dense(&mut rows, num_values);
        self.mutation = mutation.filter(|mutation| mutation.has_deletions()).cloned();
        let read = self.read(self.base.read_offset(), &rows, None);
        self.rows = rows;
        self.mutation = None;
        read?;

        let mut output = std::mem::take(&mut self.result_rows);
        output.clear();
        output.extend_from_slice(self.base.output_rows());
        let materialized = self.get_values(&output, result);
        self.result_rows = output;
        materialized
    }

    /// Batch of a reader without child readers: a count(*) scan or a scan that
    /// selects only constants and fields missing from the file.
    fn next_without_children(
        &mut self,
        num_values: usize,
        result: &mut Option<VectorRef>,
        mutation: Option<&Mutation>,
    ) -> Result<()> {
        let num_rows = num_values - mutation.map_or(0, |m| m.deleted_count(num_values));
        trace!(
            "struct reader {} produces {num_rows} constant rows",
            self.base.id()
        );
        let mut vector = self.prepare_result(result)?;
        let row = result::as_row_mut(&mut vector)?;
        row.resize(num_rows);
        row.clear_nulls();
        for child_spec in self.scan_spec.children() {
            verify_state!(
                child_spec.is_constant() || child_spec.subscript().is_none(),
                "a struct reader without children only outputs constants and missing fields"
            );
            let Some(channel) = child_spec.channel() else {
                continue;
            };
            match child_spec.constant_value() {
                Some(value) => result::set_constant_field(row, channel, value, num_rows)?,
                None => result::set_null_field(row, channel, num_rows)?,
            }
        }
        *result = Some(vector);
        self.next_epoch();
        self.base
            .set_read_offset(self.base.read_offset() + num_values as u64);
        Ok(())
    }

    /// Sets up the window: positions the reader, decodes the struct nulls and
    /// starts with every requested row in the output.
    fn prepare_read(
        &mut self,
        offset: u64,
        rows: &[RowIndex],
        incoming_nulls: Option<&BitMask>,
    ) -> Result<()> {
        self.seek_to(offset)?;
        let nulls = self
            .format_data
            .read_nulls(row_set::window_len(rows), incoming_nulls)?;
        self.base.set_nulls_in_read_range(nulls);
        self.base.set_output_rows(rows);
        Ok(())
    }

    /// Records the struct nulls of the window in every non-constant child, unless
    /// the format already stores them in the leaves.
    fn record_parent_nulls_in_children(&mut self, offset: u64, rows: &[RowIndex]) -> Result<()> {
        if self.format_data.parent_nulls_in_leaves() {
            return Ok(());
        }
        let scan_spec = self.scan_spec.clone();
        for child_spec in scan_spec.children() {
            if self.is_child_constant(child_spec) {
                continue;
            }
            let Some(index) = child_spec.subscript() else {
                continue;
            };
            let child = child_slot(&mut self.children, index)?;
            child.add_parent_nulls(offset, self.base.nulls_in_read_range(), rows);
        }
        Ok(())
    }

    /// Narrows `active` to the rows whose struct nullness matches the struct's own
    /// null filter.
    fn filter_nulls(&self, active: &mut Vec<RowIndex>, keep_nulls: bool) {
        active.retain(|&row| self.base.is_null_in_read_range(row) == keep_nulls);
    }

    fn read_children(
        &mut self,
        offset: u64,
        active: &mut Vec<RowIndex>,
    ) -> Result<()> {
        let scan_spec = self.scan_spec.clone();
        for child_spec in scan_spec.children() {
            if self.is_child_constant(child_spec) {
                continue;
            }
            let Some(index) = child_spec.subscript() else {
                continue;
            };
            let child = self.child(index).ok_or_else(|| {
                Error::contract_violation(format!("no child reader for field {index}"))
            })?;
            if self.is_deferred(child_spec, child) {
                continue;
            }

            let track_selectivity = self.config.track_selectivity;
            let struct_nulls = self.base.nulls_in_read_range();
            let child = child_slot(&mut self.children, index)?;
            child.seek_to(offset)?;
            if !child_spec.has_filter() {
                child.read(offset, active, struct_nulls)?;
                continue;
            }

            let mut timer = track_selectivity
                .then(|| SelectivityTimer::new(child_spec.selectivity(), active.len()));
            child.reset_init_time_clocks();
            child.read(offset, active, struct_nulls)?;
            let narrowed = child.output_rows();
            debug_assert!(row_set::is_subset(narrowed, active));
            active.clear();
            active.extend_from_slice(narrowed);
            if let Some(mut timer) = timer.take() {
                timer.subtract(child.init_time_clocks());
                timer.finish(active.len());
            }
            if active.is_empty() {
                debug!(
                    "struct reader {}: filter on '{}' left no rows at {offset}",
                    self.base.id(),
                    child_spec.name()
                );
                break;
            }
        }
        Ok(())
    }
}

fn child_slot(
    children: &mut [Option<Box<dyn ColumnReader>>],
    index: usize,
) -> Result<&mut Box<dyn ColumnReader>> {
    children
        .get_mut(index)
        .and_then(Option::as_mut)
        .ok_or_else(|| Error::contract_violation(format!("no child reader for field {index}")))
}

impl ColumnReader for StructColumnReader {
    fn base(&self) -> &ReaderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ReaderBase {
        &mut self.base
    }

    fn read(
        &mut self,
        offset: u64,
        rows: &[RowIndex],
        incoming_nulls: Option<&BitMask>,
    ) -> Result<()> {
        verify_arg!(rows, !rows.is_empty());
        self.next_epoch();
        trace!(
            "struct reader {} reads {} rows at {offset}, epoch {}",
            self.base.id(),
            rows.len(),
            self.epoch
        );
        self.prepare_read(offset, rows, incoming_nulls)?;
        let window_end = offset + row_set::window_len(rows) as u64;

        let mut active = std::mem::take(&mut self.active_rows);
        active.clear();
        active.extend_from_slice(rows);

        if let Some(deleted) = self
            .mutation
            .as_ref()
            .and_then(|mutation| mutation.deleted_rows.as_ref())
        {
            verify_state!(
                self.base.nulls_in_read_range().is_none(),
                "only the top level can have a mutation"
            );
            verify_state!(
                row_set::is_dense(rows),
                "the top level must read a dense row set under a mutation"
            );
            active.clear();
            active.extend(
                deleted
                    .iter_unset_until(row_set::window_len(rows))
                    .map(|row| row as RowIndex),
            );
            self.base.set_output_rows(&active);
            if active.is_empty() {
                debug!(
                    "struct reader {}: all {} rows at {offset} deleted",
                    self.base.id(),
                    rows.len()
                );
                self.base.set_read_offset(window_end);
                self.active_rows = active;
                return Ok(());
            }
        }

        if let Some(filter) = self.scan_spec.filter() {
            verify_state!(
                filter.is_null_filter(),
                "a struct level only supports is-null and is-not-null filters"
            );
            let keep_nulls = filter.test_null();
            self.filter_nulls(&mut active, keep_nulls);
            self.base.set_output_rows(&active);
            if active.is_empty() {
                debug!(
                    "struct reader {}: null filter left no rows at {offset}",
                    self.base.id()
                );
                self.record_parent_nulls_in_children(offset, rows)?;
                self.base.set_read_offset(window_end);
                self.active_rows = active;
                return Ok(());
            }
        }

        verify_state!(self.has_children(), "struct reader has no child readers");
        let children_read = self.read_children(offset, &mut active);
        if let Err(e) = children_read {
            self.active_rows = active;
            return Err(e);
        }
        // Children that did not read the whole window miss a value for each null here.
        self.record_parent_nulls_in_children(offset, rows)?;

        if self.scan_spec.has_filter() {
            self.base.set_output_rows(&active);
        }
        self.active_rows = active;
        self.lazy_vector_read_offset = offset;
        self.base.set_read_offset(window_end);
        Ok(())
    }

    /// Skips `num_values` struct entries. Children skip the entries stored for them
    /// and end up on the same top-level row as this reader, recursively.
    fn skip(&mut self, num_values: u64) -> Result<u64> {
        self.next_epoch();
        let num_non_nulls = self.format_data.skip_nulls(num_values)?;
        let child_values = if self.format_data.parent_nulls_in_leaves() {
            num_values
        } else {
            num_non_nulls
        };
        trace!(
            "struct reader {} skips {num_values} values ({child_values} in children)",
            self.base.id()
        );
        let read_offset = self.base.read_offset();
        for child in self.children.iter_mut().flatten() {
            child.seek_to(read_offset)?;
            child.skip(child_values)?;
            let offset = child.read_offset() + num_values;
            child.set_read_offset_recursive(offset);
        }
        Ok(num_values)
    }

    fn get_values(&mut self, rows: &[RowIndex], result: &mut Option<VectorRef>) -> Result<()> {
        self.assemble_result(rows, result)
    }

    fn filter_row_groups(
        &self,
        row_group_size: u64,
        context: &StatsContext,
        result: &mut FilterRowGroupsResult,
    ) -> Result<()> {
        self.format_data
            .filter_row_groups(&self.scan_spec, row_group_size, context, result)?;
        for child in self.child_readers() {
            child.filter_row_groups(row_group_size, context, result)?;
        }
        if result.skipped_count() > 0 {
            debug!(
                "struct reader {}: {} of {} row groups skippable",
                self.base.id(),
                result.skipped_count(),
                result.total_count
            );
        }
        Ok(())
    }

    fn set_read_offset_recursive(&mut self, offset: u64) {
        self.base.set_read_offset(offset);
        for child in self.children.iter_mut().flatten() {
            child.set_read_offset_recursive(offset);
        }
    }

    fn as_struct(&self) -> Option<&StructColumnReader> {
        Some(self)
    }

    fn as_struct_mut(&mut self) -> Option<&mut StructColumnReader> {
        Some(self)
    }
}
