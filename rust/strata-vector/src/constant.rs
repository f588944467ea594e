//! Constant-encoded columns.

use crate::{data_type::DataType, value::Value};

/// A column holding the same value in every row.
///
/// A constant over `Value::Null` is the null constant used for fields that are
/// missing from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantVector {
    data_type: DataType,
    value: Value,
    len: usize,
}

impl ConstantVector {
    pub fn new(data_type: DataType, value: Value, len: usize) -> ConstantVector {
        debug_assert!(value.fits(&data_type));
        ConstantVector {
            data_type,
            value,
            len,
        }
    }

    pub fn null(data_type: DataType, len: usize) -> ConstantVector {
        ConstantVector::new(data_type, Value::Null, len)
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn resize(&mut self, len: usize) {
        self.len = len;
    }
}
