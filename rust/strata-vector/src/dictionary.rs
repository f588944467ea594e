//! Dictionary-wrapped columns.

use strata_bits::BitMask;
use strata_common::{Result, verify_arg};

use crate::{data_type::DataType, value::Value, vector::VectorRef};

/// A column whose rows are indices into a shared base vector.
#[derive(Debug, Clone)]
pub struct DictionaryVector {
    indices: Vec<u32>,
    nulls: Option<BitMask>,
    values: VectorRef,
}

impl DictionaryVector {
    pub fn try_new(
        indices: Vec<u32>,
        nulls: Option<BitMask>,
        values: VectorRef,
    ) -> Result<DictionaryVector> {
        verify_arg!(
            indices,
            indices.iter().all(|&i| (i as usize) < values.len())
        );
        if let Some(nulls) = nulls.as_ref() {
            verify_arg!(nulls, nulls.len() == indices.len());
        }
        Ok(DictionaryVector {
            indices,
            nulls,
            values,
        })
    }

    pub fn data_type(&self) -> &DataType {
        self.values.data_type()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// The wrapped base vector.
    pub fn values(&self) -> &VectorRef {
        &self.values
    }

    pub fn into_values(self) -> VectorRef {
        self.values
    }

    pub fn is_null_at(&self, index: usize) -> bool {
        self.nulls.as_ref().is_some_and(|nulls| nulls.contains(index))
            || self.values.is_null_at(self.indices[index] as usize)
    }

    pub fn value_at(&self, index: usize) -> Value {
        if self.nulls.as_ref().is_some_and(|nulls| nulls.contains(index)) {
            Value::Null
        } else {
            self.values.value_at(self.indices[index] as usize)
        }
    }
}
