//! Deferred columns.
//!
//! A [`LazyVector`] stands in for a projected column whose decoding was deferred by
//! the reader. It is either `Unloaded`, holding a [`ColumnLoader`] that names the
//! struct reader, the child and the read epoch it belongs to, or `Loaded`, holding
//! the materialized column.
//!
//! Loading is an explicit transition ([`LazyVector::load`]) that takes the reader
//! tree as a [`LazyLoadSource`]; there is no implicit decode on access. A loader is
//! only valid for the read epoch it was created in: once the owning reader starts
//! another read, loading fails with a contract violation.

use std::sync::Arc;

use strata_common::{Result, error::Error, verify_state};

use crate::{
    data_type::DataType,
    vector::{Vector, VectorRef},
};

/// Identifies the column a lazy vector materializes: the owning struct reader, the
/// index of the child reader within it and the read epoch of the owning reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnLoader {
    reader_id: u64,
    child_index: usize,
    epoch: u64,
}

impl ColumnLoader {
    pub fn new(reader_id: u64, child_index: usize, epoch: u64) -> ColumnLoader {
        ColumnLoader {
            reader_id,
            child_index,
            epoch,
        }
    }

    pub fn reader_id(&self) -> u64 {
        self.reader_id
    }

    pub fn child_index(&self) -> usize {
        self.child_index
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// The reader side of a lazy load.
pub trait LazyLoadSource {
    /// Materializes the column identified by `loader` as a vector of exactly `len`
    /// rows of `data_type`. `previous` is the vector this placeholder loaded in an
    /// earlier batch, offered for in-place reuse.
    ///
    /// # Errors
    ///
    /// Fails with a contract violation if the loader does not belong to this reader
    /// tree or if its epoch is stale.
    fn load_lazy(
        &mut self,
        loader: &ColumnLoader,
        data_type: &DataType,
        len: usize,
        previous: Option<VectorRef>,
    ) -> Result<VectorRef>;
}

#[derive(Debug, Clone)]
enum LazyState {
    Unloaded(ColumnLoader),
    Loaded(VectorRef),
}

/// A column whose decoding is deferred until [`load`](LazyVector::load) is called.
#[derive(Debug, Clone)]
pub struct LazyVector {
    data_type: DataType,
    len: usize,
    state: LazyState,
    /// Value of the previous load, kept across a reset.
    recycled: Option<VectorRef>,
}

impl LazyVector {
    pub fn new(data_type: DataType, len: usize, loader: ColumnLoader) -> LazyVector {
        LazyVector {
            data_type,
            len,
            state: LazyState::Unloaded(loader),
            recycled: None,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LazyState::Loaded(_))
    }

    pub fn loader(&self) -> Option<&ColumnLoader> {
        match &self.state {
            LazyState::Unloaded(loader) => Some(loader),
            LazyState::Loaded(_) => None,
        }
    }

    pub fn loaded(&self) -> Option<&VectorRef> {
        match &self.state {
            LazyState::Loaded(vector) => Some(vector),
            LazyState::Unloaded(_) => None,
        }
    }

    pub fn into_loaded(self) -> Option<VectorRef> {
        match self.state {
            LazyState::Loaded(vector) => Some(vector),
            LazyState::Unloaded(_) => None,
        }
    }

    /// Rebinds this placeholder to a new loader and row count. A previously loaded
    /// value is handed to the next load for reuse.
    pub fn reset(&mut self, loader: ColumnLoader, len: usize) {
        self.len = len;
        if let LazyState::Loaded(previous) =
            std::mem::replace(&mut self.state, LazyState::Unloaded(loader))
        {
            self.recycled = Some(previous);
        }
    }

    /// Loads the column through `source` if not loaded yet and returns it.
    pub fn load<S>(&mut self, source: &mut S) -> Result<&VectorRef>
    where
        S: LazyLoadSource + ?Sized,
    {
        if let LazyState::Unloaded(loader) = &self.state {
            let previous = self.recycled.take();
            let vector = source.load_lazy(loader, &self.data_type, self.len, previous)?;
            verify_state!(
                vector.len() == self.len,
                "lazy load returned a vector of a different size"
            );
            self.state = LazyState::Loaded(vector);
        }
        match &self.state {
            LazyState::Loaded(vector) => Ok(vector),
            LazyState::Unloaded(_) => Err(Error::invalid_operation("lazy load")),
        }
    }
}

/// Returns the materialized form of `vector`, loading it through `source` when it is
/// an unloaded lazy vector.
///
/// A uniquely held lazy vector transitions to `Loaded` in place. A shared one is
/// cloned first (the clone only copies the loader), so other holders are not
/// affected.
pub fn ensure_loaded<S>(vector: &mut VectorRef, source: &mut S) -> Result<VectorRef>
where
    S: LazyLoadSource + ?Sized,
{
    match vector.as_ref() {
        Vector::Lazy(lazy) => {
            if let Some(loaded) = lazy.loaded() {
                return Ok(loaded.clone());
            }
        }
        _ => return Ok(vector.clone()),
    }
    match Arc::make_mut(vector) {
        Vector::Lazy(lazy) => lazy.load(source).cloned(),
        _ => Err(Error::invalid_operation("ensure_loaded")),
    }
}
