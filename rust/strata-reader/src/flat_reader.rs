//! Reader for scalar (leaf) columns.

use std::{sync::Arc, time::Instant};

use log::trace;
use strata_bits::BitMask;
use strata_common::{Result, error::Error, verify_arg, verify_state};
use strata_vector::{Vector, VectorRef, flat::FlatVector, values::Values};

use crate::{
    format_data::LeafData,
    reader::{ColumnReader, ReaderBase},
    row_set::{self, RowIndex},
    scan_spec::ScanSpec,
    stats::{FilterRowGroupsResult, StatsContext},
};

/// Decodes a scalar column over any [`LeafData`] source.
///
/// A read decodes the whole window into window-aligned values, then evaluates the
/// scan spec's filter on the requested rows. `get_values` gathers the requested rows
/// into a new flat vector on every call; leaf results are never reused.
pub struct FlatColumnReader {
    base: ReaderBase,
    scan_spec: Arc<ScanSpec>,
    data: Box<dyn LeafData>,
    values: Option<Values>,
}

impl FlatColumnReader {
    pub fn new(
        scan_spec: Arc<ScanSpec>,
        data: Box<dyn LeafData>,
        is_top_level: bool,
    ) -> Result<FlatColumnReader> {
        verify_arg!(scan_spec, !scan_spec.data_type().is_struct());
        Ok(FlatColumnReader {
            base: ReaderBase::new(is_top_level),
            scan_spec,
            data,
            values: None,
        })
    }

    pub fn scan_spec(&self) -> &Arc<ScanSpec> {
        &self.scan_spec
    }

    fn apply_filter(&mut self, rows: &[RowIndex]) {
        let Some(filter) = self.scan_spec.filter() else {
            self.base.set_output_rows(rows);
            return;
        };
        let values = self.values.as_ref();
        let passed: Vec<RowIndex> = rows
            .iter()
            .copied()
            .filter(|&row| {
                if self.base.is_null_in_read_range(row) {
                    filter.test_null()
                } else {
                    values.is_some_and(|values| filter.test_value(&values.get(row as usize)))
                }
            })
            .collect();
        self.base.set_output_rows(&passed);
    }
}

impl ColumnReader for FlatColumnReader {
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
        let start = Instant::now();
        self.seek_to(offset)?;
        self.base.add_init_time(start.elapsed());

        let window = row_set::window_len(rows);
        trace!(
            "flat reader {} reads {} of {window} rows at {offset}",
            self.base.id(),
            rows.len()
        );
        let nulls = self.data.read_nulls(window, incoming_nulls)?;
        let num_nulls = nulls.as_ref().map_or(0, BitMask::count_ones);
        let dense = self.data.read_values(window - num_nulls)?;
        self.values = Some(Values::scatter(&dense, nulls.as_ref(), window)?);
        self.base.set_nulls_in_read_range(nulls);
        self.apply_filter(rows);
        self.base.set_read_offset(offset + window as u64);
        Ok(())
    }

    fn skip(&mut self, num_values: u64) -> Result<u64> {
        let non_nulls = self.data.skip_nulls(num_values)?;
        self.data.skip_values(non_nulls)?;
        Ok(num_values)
    }

    fn get_values(&mut self, rows: &[RowIndex], result: &mut Option<VectorRef>) -> Result<()> {
        let values = self
            .values
            .as_ref()
            .ok_or_else(|| Error::contract_violation("get_values called before read"))?;
        verify_state!(
            row_set::window_len(rows) <= values.len(),
            "requested rows beyond the last read window"
        );
        let gathered = values.gather(rows.iter().map(|&row| row as usize));
        let nulls = self.base.nulls_in_read_range().map(|nulls| {
            let mut result = BitMask::empty(rows.len());
            for (i, &row) in rows.iter().enumerate() {
                result.set_value(i, nulls.get(row as usize));
            }
            result
        });
        let vector = FlatVector::try_new(gathered, nulls)?;
        *result = Some(Arc::new(Vector::Flat(vector)));
        Ok(())
    }

    fn filter_row_groups(
        &self,
        row_group_size: u64,
        context: &StatsContext,
        result: &mut FilterRowGroupsResult,
    ) -> Result<()> {
        self.data
            .filter_row_groups(&self.scan_spec, row_group_size, context, result)
    }
}
