//! Loading of deferred children.

use std::sync::Arc;

use log::trace;
use strata_common::{Result, error::Error, verify_state};
use strata_vector::{
    DataType, Vector, VectorRef,
    lazy::{ColumnLoader, LazyLoadSource},
};

use super::StructColumnReader;
use crate::reader::ColumnReader;

impl StructColumnReader {
    /// Finds the struct reader with the given id in the tree rooted at `self`.
    pub fn find_struct_reader(&mut self, id: u64) -> Option<&mut StructColumnReader> {
        if self.base.id() == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .flatten()
            .find_map(|child| child.as_struct_mut()?.find_struct_reader(id))
    }

    /// Reads the deferred child `loader` names over the rows of the last read and
    /// materializes them. The child first catches up to the window, skipping what
    /// it missed while deferred. A struct child refills `previous` in place when it
    /// is uniquely held.
    fn load_child(
        &mut self,
        loader: &ColumnLoader,
        data_type: &DataType,
        len: usize,
        previous: Option<VectorRef>,
    ) -> Result<VectorRef> {
        verify_state!(
            loader.epoch() == self.epoch,
            "lazy vector loaded after its reader moved past the batch"
        );
        if let Some(loaded) = self.loaded_children.get(&loader.child_index()) {
            return Ok(loaded.clone());
        }

        let StructColumnReader {
            base,
            children,
            lazy_vector_read_offset,
            ..
        } = self;
        let rows = base.output_rows();
        verify_state!(
            rows.len() == len,
            "lazy vector size differs from the rows of the last read"
        );
        let child = super::child_slot(children, loader.child_index())?;
        trace!(
            "struct reader {} loads field {} over {len} rows at {}",
            base.id(),
            loader.child_index(),
            lazy_vector_read_offset
        );
        child.seek_to(*lazy_vector_read_offset)?;
        child.read(*lazy_vector_read_offset, rows, base.nulls_in_read_range())?;

        let mut result = data_type.is_struct().then(|| {
            previous
                .filter(|previous| previous.data_type() == data_type)
                .unwrap_or_else(|| Arc::new(Vector::empty_row(data_type.clone())))
        });
        child.get_values(rows, &mut result)?;
        let loaded = result.ok_or_else(|| Error::invalid_operation("lazy child load"))?;
        self.loaded_children
            .insert(loader.child_index(), loaded.clone());
        Ok(loaded)
    }
}

impl LazyLoadSource for StructColumnReader {
    fn load_lazy(
        &mut self,
        loader: &ColumnLoader,
        data_type: &DataType,
        len: usize,
        previous: Option<VectorRef>,
    ) -> Result<VectorRef> {
        self.find_struct_reader(loader.reader_id())
            .ok_or_else(|| Error::contract_violation("lazy vector is not from this reader tree"))?
            .load_child(loader, data_type, len, previous)
    }
}
