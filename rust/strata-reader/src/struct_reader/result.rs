//! Assembly of the struct reader's output row vector.

use std::sync::Arc;

use log::debug;
use strata_common::{Result, error::Error, verify_state};
use strata_vector::{
    Value, Vector, VectorRef,
    constant::ConstantVector,
    lazy::{ColumnLoader, LazyVector},
    row::RowVector,
};

use super::StructColumnReader;
use crate::{reader::ColumnReader, row_set::RowIndex};

/// Returns the container behind `result` if it can be mutated in place: it must be
/// uniquely held and, after unwrapping loaded lazy and dictionary layers (each of
/// them uniquely held too), a row vector.
///
/// A reused row vector gets its nulls reset and its dictionary-wrapped children
/// dropped. Lazy and constant children are kept for in-place refresh.
pub(crate) fn try_reuse_result(mut result: VectorRef) -> Option<VectorRef> {
    match Arc::get_mut(&mut result)? {
        Vector::Row(row) => {
            row.reuse_nulls();
            row.clear_containing_lazy_and_wrapped();
            return Some(result);
        }
        Vector::Lazy(lazy) if lazy.is_loaded() => {}
        Vector::Dictionary(_) => {}
        _ => return None,
    }
    match Arc::into_inner(result)? {
        Vector::Lazy(lazy) => try_reuse_result(lazy.into_loaded()?),
        Vector::Dictionary(dictionary) => try_reuse_result(dictionary.into_values()),
        _ => None,
    }
}

pub(crate) fn as_row_mut(vector: &mut VectorRef) -> Result<&mut RowVector> {
    Arc::get_mut(vector)
        .and_then(Vector::as_row_mut)
        .ok_or_else(|| Error::invalid_operation("struct result must be a uniquely held row vector"))
}

/// Puts a constant column of `size` rows at `channel`, resizing the existing one
/// when it is uniquely held, non-empty and holds the same value.
pub(crate) fn set_constant_field(
    row: &mut RowVector,
    channel: usize,
    value: &Value,
    size: usize,
) -> Result<()> {
    let data_type = row
        .data_type()
        .child_at(channel)
        .cloned()
        .ok_or_else(|| Error::contract_violation(format!("output channel {channel} out of range")))?;
    verify_state!(
        value.fits(&data_type),
        "constant value does not match the field type"
    );
    let field = row.child_at_mut(channel);
    if let Some(constant) = field
        .as_mut()
        .and_then(Arc::get_mut)
        .and_then(Vector::as_constant_mut)
    {
        if !constant.is_empty() && constant.value() == value {
            constant.resize(size);
            return Ok(());
        }
    }
    *field = Some(Arc::new(Vector::Constant(ConstantVector::new(
        data_type,
        value.clone(),
        size,
    ))));
    Ok(())
}

/// Puts a null constant at `channel` (a field missing from the file).
pub(crate) fn set_null_field(row: &mut RowVector, channel: usize, size: usize) -> Result<()> {
    set_constant_field(row, channel, &Value::Null, size)
}

impl StructColumnReader {
    /// Takes the caller's result container and returns the vector to fill: the
    /// container itself if reusable, otherwise a fresh row vector of the same type
    /// with struct fields pre-populated.
    pub(super) fn prepare_result(&self, result: &mut Option<VectorRef>) -> Result<VectorRef> {
        let current = result
            .take()
            .ok_or_else(|| Error::contract_violation("struct reader expects a non-null result"))?;
        verify_state!(
            current.data_type().is_struct(),
            "struct reader expects a row-typed result"
        );
        let row_type = current.data_type().clone();
        match try_reuse_result(current) {
            Some(reused) => Ok(reused),
            None => {
                debug!(
                    "struct reader {}: result is shared or not reusable, allocating",
                    self.base.id()
                );
                Ok(Arc::new(Vector::Row(RowVector::with_query_shape(row_type))))
            }
        }
    }

    pub(super) fn assemble_result(
        &mut self,
        rows: &[RowIndex],
        result: &mut Option<VectorRef>,
    ) -> Result<()> {
        verify_state!(self.has_children(), "struct reader has no child readers");
        let mut vector = self.prepare_result(result)?;
        let filled = self.fill_result(rows, &mut vector);
        *result = Some(vector);
        filled
    }

    fn fill_result(&mut self, rows: &[RowIndex], vector: &mut VectorRef) -> Result<()> {
        let row = as_row_mut(vector)?;
        row.resize(rows.len());
        if rows.is_empty() {
            return Ok(());
        }
        match self.base.nulls_in_read_range() {
            Some(nulls) => {
                let result_nulls = row.mutable_nulls(rows.len());
                for (i, &r) in rows.iter().enumerate() {
                    result_nulls.set_value(i, nulls.get(r as usize));
                }
            }
            None => row.clear_nulls(),
        }

        let scan_spec = self.scan_spec.clone();
        let mut lazy_prepared = false;
        for child_spec in scan_spec.children() {
            if !child_spec.project_out() {
                continue;
            }
            let Some(channel) = child_spec.channel() else {
                continue;
            };
            if let Some(constant) = child_spec.constant_value() {
                set_constant_field(row, channel, constant, rows.len())?;
                continue;
            }
            let index = match child_spec.subscript() {
                Some(index) if !self.is_child_constant(child_spec) => index,
                _ => {
                    set_null_field(row, channel, rows.len())?;
                    continue;
                }
            };
            let field_type = row.data_type().child_at(channel).cloned().ok_or_else(|| {
                Error::contract_violation(format!("output channel {channel} out of range"))
            })?;

            let deferred = match self.child(index) {
                Some(child) => self.is_deferred(child_spec, child),
                None => false,
            };
            if !deferred {
                let field = row.child_at_mut(channel);
                if field.is_none() && field_type.is_struct() {
                    *field = Some(Arc::new(Vector::Row(RowVector::with_query_shape(
                        field_type,
                    ))));
                }
                let child = self.child_mut(index)?;
                child.get_values(rows, field)?;
                continue;
            }

            if !lazy_prepared {
                if self.base.output_rows() != rows {
                    self.base.set_output_rows(rows);
                }
                lazy_prepared = true;
            }
            let loader = ColumnLoader::new(self.base.id(), index, self.epoch);
            let field = row.child_at_mut(channel);
            match field
                .as_mut()
                .and_then(Arc::get_mut)
                .and_then(Vector::as_lazy_mut)
            {
                Some(lazy) => lazy.reset(loader, rows.len()),
                None => {
                    *field = Some(Arc::new(Vector::Lazy(LazyVector::new(
                        field_type,
                        rows.len(),
                        loader,
                    ))))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_vector::{DataType, dictionary::DictionaryVector, flat::FlatVector, values::Values};

    struct Fixed(Option<VectorRef>);

    impl strata_vector::lazy::LazyLoadSource for Fixed {
        fn load_lazy(
            &mut self,
            _: &ColumnLoader,
            _: &DataType,
            _: usize,
            _: Option<VectorRef>,
        ) -> Result<VectorRef> {
            self.0
                .take()
                .ok_or_else(|| Error::invalid_operation("loaded twice"))
        }
    }

    fn row_type() -> DataType {
        DataType::struct_of([("a", DataType::Int64)])
    }

    fn row_vector() -> VectorRef {
        Arc::new(Vector::Row(RowVector::with_query_shape(row_type())))
    }

    #[test]
    fn test_unique_row_is_reused_in_place() {
        let vector = row_vector();
        let ptr = Arc::as_ptr(&vector);
        let reused = try_reuse_result(vector).unwrap();
        assert_eq!(Arc::as_ptr(&reused), ptr);
    }

    #[test]
    fn test_shared_row_is_not_reused() {
        let vector = row_vector();
        let _held = vector.clone();
        assert!(try_reuse_result(vector).is_none());
    }

    #[test]
    fn test_unwraps_loaded_lazy_and_dictionary() {
        let mut base = RowVector::with_query_shape(row_type());
        base.resize(1);
        let inner: VectorRef = Arc::new(Vector::Row(base));
        let ptr_base = Arc::as_ptr(&inner);
        let wrapped: VectorRef = Arc::new(Vector::Dictionary(
            DictionaryVector::try_new(vec![0, 0], None, inner).unwrap(),
        ));
        let reused = try_reuse_result(wrapped).unwrap();
        assert_eq!(Arc::as_ptr(&reused), ptr_base);

        let loaded_row = row_vector();
        let ptr_loaded = Arc::as_ptr(&loaded_row);
        let mut lazy = LazyVector::new(row_type(), 0, ColumnLoader::new(1, 0, 1));
        lazy.load(&mut Fixed(Some(loaded_row))).unwrap();
        let reused = try_reuse_result(Arc::new(Vector::Lazy(lazy))).unwrap();
        assert_eq!(Arc::as_ptr(&reused), ptr_loaded);

        let unloaded: VectorRef = Arc::new(Vector::Lazy(LazyVector::new(
            row_type(),
            1,
            ColumnLoader::new(1, 0, 1),
        )));
        assert!(try_reuse_result(unloaded).is_none());
    }

    #[test]
    fn test_constant_field_refreshed_in_place() {
        let mut row = RowVector::with_query_shape(row_type());
        set_constant_field(&mut row, 0, &Value::Int64(5), 3).unwrap();
        let first = Arc::as_ptr(row.child_at(0).unwrap());
        set_constant_field(&mut row, 0, &Value::Int64(5), 7).unwrap();
        let field = row.child_at(0).unwrap();
        assert_eq!(Arc::as_ptr(field), first);
        assert_eq!(field.len(), 7);

        set_constant_field(&mut row, 0, &Value::Int64(6), 7).unwrap();
        assert_ne!(Arc::as_ptr(row.child_at(0).unwrap()), first);
        assert!(set_constant_field(&mut row, 0, &Value::from("x"), 1).is_err());
        assert!(set_null_field(&mut row, 3, 1).is_err());

        let flat = FlatVector::try_new(Values::Int64(vec![1]), None).unwrap();
        *row.child_at_mut(0) = Some(Arc::new(Vector::Flat(flat)));
        set_null_field(&mut row, 0, 2).unwrap();
        assert!(row.child_at(0).unwrap().is_null_at(1));
    }
}
