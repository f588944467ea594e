//! Decoded scalar columns.

use strata_bits::BitMask;
use strata_common::{Result, verify_arg};

use crate::{data_type::DataType, value::Value, values::Values};

/// A decoded scalar column: one value slot per row plus an optional null mask
/// (bit set = null).
#[derive(Debug, Clone, PartialEq)]
pub struct FlatVector {
    data_type: DataType,
    values: Values,
    nulls: Option<BitMask>,
}

impl FlatVector {
    /// Creates a flat vector, validating that the null mask covers every value slot.
    pub fn try_new(values: Values, nulls: Option<BitMask>) -> Result<FlatVector> {
        if let Some(nulls) = nulls.as_ref() {
            verify_arg!(nulls, nulls.len() == values.len());
        }
        let nulls = nulls.filter(BitMask::any);
        Ok(FlatVector {
            data_type: values.data_type(),
            values,
            nulls,
        })
    }

    /// Creates a flat vector from scalars; `Value::Null` entries become nulls.
    pub fn from_values(data_type: &DataType, values: &[Value]) -> Result<FlatVector> {
        let storage = Values::from_values(data_type, values)?;
        let nulls = BitMask::from_bools(&values.iter().map(Value::is_null).collect::<Vec<_>>());
        FlatVector::try_new(storage, Some(nulls))
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn nulls(&self) -> Option<&BitMask> {
        self.nulls.as_ref()
    }

    #[inline]
    pub fn is_null_at(&self, index: usize) -> bool {
        self.nulls.as_ref().is_some_and(|nulls| nulls.contains(index))
    }

    pub fn value_at(&self, index: usize) -> Value {
        if self.is_null_at(index) {
            Value::Null
        } else {
            self.values.get(index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_tracks_nulls() {
        let v = FlatVector::from_values(
            &DataType::Int64,
            &[Value::Int64(1), Value::Null, Value::Int64(3)],
        )
        .unwrap();
        assert_eq!(v.data_type(), &DataType::Int64);
        assert!(v.is_null_at(1));
        assert_eq!(v.value_at(2), Value::Int64(3));
        assert_eq!(v.value_at(1), Value::Null);
    }

    #[test]
    fn test_all_valid_mask_is_dropped() {
        let v = FlatVector::try_new(Values::Int64(vec![1, 2]), Some(BitMask::empty(2))).unwrap();
        assert!(v.nulls().is_none());
        assert!(FlatVector::try_new(Values::Int64(vec![1, 2]), Some(BitMask::empty(3))).is_err());
    }
}
