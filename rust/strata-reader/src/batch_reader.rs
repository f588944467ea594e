//! Batch iteration over a root struct reader.

use std::sync::Arc;

use log::debug;
use strata_bits::BitMask;
use strata_common::{Result, error::Error, try_or_ret_some_err, verify_arg};
use strata_vector::{Vector, VectorRef, lazy::ensure_loaded};

use crate::{mutation::Mutation, reader::ColumnReader, struct_reader::StructColumnReader};

/// Drives a root [`StructColumnReader`] batch by batch up to a total row count.
///
/// Each batch is a row vector of the reader's requested type. Handing a batch back
/// through [`recycle`](BatchReader::recycle) lets the next batch reuse its storage,
/// provided no other reference to it is alive.
pub struct BatchReader<'a> {
    reader: &'a mut StructColumnReader,
    position: u64,
    end: u64,
    batch_rows: usize,
    deleted_rows: Option<BitMask>,
    recycled: Option<VectorRef>,
}

impl<'a> BatchReader<'a> {
    /// Iterates from the reader's current position until `end` (in top-level rows).
    pub fn new(reader: &'a mut StructColumnReader, end: u64) -> Result<BatchReader<'a>> {
        verify_arg!(reader, reader.is_root());
        let position = reader.read_offset();
        verify_arg!(end, end >= position);
        let batch_rows = reader.config().max_batch_rows;
        Ok(BatchReader {
            reader,
            position,
            end,
            batch_rows,
            deleted_rows: None,
            recycled: None,
        })
    }

    /// Applies a deletion mask indexed by absolute top-level row.
    pub fn with_deleted_rows(mut self, deleted_rows: BitMask) -> Self {
        self.deleted_rows = Some(deleted_rows);
        self
    }

    pub fn with_batch_rows(mut self, batch_rows: usize) -> Result<Self> {
        verify_arg!(
            batch_rows,
            batch_rows > 0 && batch_rows <= self.reader.config().max_batch_rows
        );
        self.batch_rows = batch_rows;
        Ok(self)
    }

    /// Top-level row the next batch starts at.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn reader(&self) -> &StructColumnReader {
        &*self.reader
    }

    /// Offers a consumed batch for reuse by the next one.
    pub fn recycle(&mut self, batch: VectorRef) {
        self.recycled = Some(batch);
    }

    /// Materializes a lazy column of the last batch.
    pub fn load(&mut self, vector: &mut VectorRef) -> Result<VectorRef> {
        ensure_loaded(vector, &mut *self.reader)
    }

    /// Skips `num_rows` top-level rows without materializing them. Lazy columns of
    /// earlier batches can no longer be loaded.
    pub fn skip_rows(&mut self, num_rows: u64) -> Result<()> {
        let target = self.position + num_rows;
        verify_arg!(num_rows, target <= self.end);
        self.reader.seek_to(target)?;
        self.position = target;
        Ok(())
    }

    fn next_mutation(&self, num_rows: usize) -> Option<Mutation> {
        let deleted = self.deleted_rows.as_ref()?;
        let start = self.position as usize;
        Some(Mutation::from_range(deleted, start..start + num_rows))
    }
}

impl Iterator for BatchReader<'_> {
    type Item = Result<VectorRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }
        let num_rows = (self.end - self.position).min(self.batch_rows as u64) as usize;
        let mutation = self.next_mutation(num_rows);
        let mut result = Some(self.recycled.take().unwrap_or_else(|| {
            Arc::new(Vector::empty_row(self.reader.requested_type().clone()))
        }));
        try_or_ret_some_err!(self.reader.next(num_rows, &mut result, mutation.as_ref()));
        self.position += num_rows as u64;
        let batch = try_or_ret_some_err!(
            result.ok_or_else(|| Error::invalid_operation("struct reader produced no batch"))
        );
        debug!(
            "batch of {} rows ({num_rows} read), next at {}",
            batch.len(),
            self.position
        );
        Some(Ok(batch))
    }
}
