//! Struct (row-typed) columns.

use std::sync::Arc;

use strata_bits::BitMask;
use strata_common::{Result, verify_arg};

use crate::{
    data_type::DataType,
    vector::{Vector, VectorEncoding, VectorRef},
};

/// A struct column: a null mask (bit set = null row) plus one child column per field
/// of the struct type.
///
/// Child slots may be unset (`None`): a freshly shaped row vector only
/// pre-populates struct-typed fields, everything else is filled in by the reader
/// that materializes the batch.
#[derive(Debug, Clone)]
pub struct RowVector {
    data_type: DataType,
    len: usize,
    nulls: Option<BitMask>,
    children: Vec<Option<VectorRef>>,
}

impl RowVector {
    /// Creates a row vector with explicit children.
    ///
    /// # Errors
    ///
    /// Returns an error if `data_type` is not a struct type, or if the number of
    /// children doesn't match the number of fields.
    pub fn try_new(
        data_type: DataType,
        nulls: Option<BitMask>,
        len: usize,
        children: Vec<Option<VectorRef>>,
    ) -> Result<RowVector> {
        verify_arg!(data_type, data_type.is_struct());
        verify_arg!(children, children.len() == data_type.size());
        if let Some(nulls) = nulls.as_ref() {
            verify_arg!(nulls, nulls.len() == len);
        }
        Ok(RowVector {
            data_type,
            len,
            nulls,
            children,
        })
    }

    /// Creates an empty row vector shaped after `data_type`: every struct-typed
    /// field holds an empty nested row vector (recursively), every other field is
    /// unset.
    ///
    /// # Panics
    ///
    /// Panics if `data_type` is not a struct type.
    pub fn with_query_shape(data_type: DataType) -> RowVector {
        assert!(data_type.is_struct(), "row vector requires a struct type");
        let mut children = vec![None; data_type.size()];
        fill_row_vector_children(&data_type, &mut children);
        RowVector {
            data_type,
            len: 0,
            nulls: None,
            children,
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

    /// Sets the number of rows, keeping the null mask (if any) the same length.
    pub fn resize(&mut self, len: usize) {
        self.len = len;
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.resize(len);
        }
    }

    pub fn nulls(&self) -> Option<&BitMask> {
        self.nulls.as_ref()
    }

    /// Returns a writable null mask of `len` bits, reusing the existing storage.
    pub fn mutable_nulls(&mut self, len: usize) -> &mut BitMask {
        let nulls = self.nulls.get_or_insert_with(BitMask::default);
        nulls.resize(len);
        nulls
    }

    /// Marks every row non-null, keeping the null storage for later batches.
    pub fn clear_nulls(&mut self) {
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.clear();
        }
    }

    /// Prepares the null storage for a new batch.
    pub fn reuse_nulls(&mut self) {
        self.clear_nulls();
    }

    /// Drops children that are wrapped in a dictionary; they refer to the previous
    /// batch's base vectors. Lazy and constant children stay, so the reader can
    /// refresh them in place.
    pub fn clear_containing_lazy_and_wrapped(&mut self) {
        for (child, field) in self.children.iter_mut().zip(self.data_type.fields()) {
            if child
                .as_ref()
                .is_some_and(|c| c.encoding() == VectorEncoding::Dictionary)
            {
                *child = field
                    .data_type
                    .is_struct()
                    .then(|| Arc::new(Vector::Row(RowVector::with_query_shape(field.data_type.clone()))));
            }
        }
    }

    #[inline]
    pub fn is_null_at(&self, index: usize) -> bool {
        self.nulls.as_ref().is_some_and(|nulls| nulls.get(index))
    }

    pub fn field_count(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[Option<VectorRef>] {
        &self.children
    }

    pub fn child_at(&self, index: usize) -> Option<&VectorRef> {
        self.children.get(index).and_then(Option::as_ref)
    }

    /// Returns the child slot at `index` for in-place materialization.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a field of the struct type.
    pub fn child_at_mut(&mut self, index: usize) -> &mut Option<VectorRef> {
        &mut self.children[index]
    }
}

/// Recursively makes empty row vectors for positions in `children` whose type in
/// `row_type` is a struct, so that the batch always matches the query schema
/// regardless of what the file contains.
pub fn fill_row_vector_children(row_type: &DataType, children: &mut [Option<VectorRef>]) {
    for (child, field) in children.iter_mut().zip(row_type.fields()) {
        if field.data_type.is_struct() {
            *child = Some(Arc::new(Vector::Row(RowVector::with_query_shape(
                field.data_type.clone(),
            ))));
        }
    }
}
