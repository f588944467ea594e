//! The column vector family.

use std::sync::Arc;

use crate::{
    constant::ConstantVector, data_type::DataType, dictionary::DictionaryVector,
    flat::FlatVector, lazy::LazyVector, row::RowVector, value::Value,
};

/// Shared handle to a column vector.
///
/// Readers treat a handle as mutable in place only when `Arc::get_mut` succeeds,
/// i.e. when no one else holds a reference to the same vector.
pub type VectorRef = Arc<Vector>;

/// The physical encoding of a [`Vector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorEncoding {
    Flat,
    Row,
    Constant,
    Dictionary,
    Lazy,
}

/// A column of a batch.
#[derive(Debug, Clone)]
pub enum Vector {
    Flat(FlatVector),
    Row(RowVector),
    Constant(ConstantVector),
    Dictionary(DictionaryVector),
    Lazy(LazyVector),
}

impl Vector {
    /// An empty struct column shaped after `data_type` (see
    /// [`RowVector::with_query_shape`]).
    pub fn empty_row(data_type: DataType) -> Vector {
        Vector::Row(RowVector::with_query_shape(data_type))
    }

    pub fn encoding(&self) -> VectorEncoding {
        match self {
            Vector::Flat(_) => VectorEncoding::Flat,
            Vector::Row(_) => VectorEncoding::Row,
            Vector::Constant(_) => VectorEncoding::Constant,
            Vector::Dictionary(_) => VectorEncoding::Dictionary,
            Vector::Lazy(_) => VectorEncoding::Lazy,
        }
    }

    pub fn data_type(&self) -> &DataType {
        match self {
            Vector::Flat(v) => v.data_type(),
            Vector::Row(v) => v.data_type(),
            Vector::Constant(v) => v.data_type(),
            Vector::Dictionary(v) => v.data_type(),
            Vector::Lazy(v) => v.data_type(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Vector::Flat(v) => v.len(),
            Vector::Row(v) => v.len(),
            Vector::Constant(v) => v.len(),
            Vector::Dictionary(v) => v.len(),
            Vector::Lazy(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        matches!(self, Vector::Lazy(_))
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Vector::Constant(_))
    }

    /// Returns the vector with any loaded lazy layers peeled off, or `None` if an
    /// unloaded lazy vector is in the way.
    pub fn loaded(&self) -> Option<&Vector> {
        match self {
            Vector::Lazy(lazy) => lazy.loaded().and_then(|v| v.loaded()),
            other => Some(other),
        }
    }

    /// Returns `true` if the row at `index` is null.
    ///
    /// # Panics
    ///
    /// Panics if this is an unloaded lazy vector; load it first.
    pub fn is_null_at(&self, index: usize) -> bool {
        match self {
            Vector::Flat(v) => v.is_null_at(index),
            Vector::Row(v) => v.is_null_at(index),
            Vector::Constant(v) => v.is_null(),
            Vector::Dictionary(v) => v.is_null_at(index),
            Vector::Lazy(v) => v
                .loaded()
                .expect("lazy vector must be loaded before access")
                .is_null_at(index),
        }
    }

    /// Returns the scalar at `index`. Struct rows report `Value::Null` when null and
    /// are otherwise not representable as a scalar.
    ///
    /// # Panics
    ///
    /// Panics if this is an unloaded lazy vector, or a non-null struct row is
    /// requested.
    pub fn value_at(&self, index: usize) -> Value {
        match self {
            Vector::Flat(v) => v.value_at(index),
            Vector::Row(v) => {
                assert!(v.is_null_at(index), "struct rows have no scalar value");
                Value::Null
            }
            Vector::Constant(v) => v.value().clone(),
            Vector::Dictionary(v) => v.value_at(index),
            Vector::Lazy(v) => v
                .loaded()
                .expect("lazy vector must be loaded before access")
                .value_at(index),
        }
    }

    pub fn as_flat(&self) -> Option<&FlatVector> {
        match self {
            Vector::Flat(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&RowVector> {
        match self {
            Vector::Row(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_row_mut(&mut self) -> Option<&mut RowVector> {
        match self {
            Vector::Row(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantVector> {
        match self {
            Vector::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_constant_mut(&mut self) -> Option<&mut ConstantVector> {
        match self {
            Vector::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&DictionaryVector> {
        match self {
            Vector::Dictionary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_lazy(&self) -> Option<&LazyVector> {
        match self {
            Vector::Lazy(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_lazy_mut(&mut self) -> Option<&mut LazyVector> {
        match self {
            Vector::Lazy(v) => Some(v),
            _ => None,
        }
    }
}

impl From<FlatVector> for Vector {
    fn from(v: FlatVector) -> Self {
        Vector::Flat(v)
    }
}

impl From<RowVector> for Vector {
    fn from(v: RowVector) -> Self {
        Vector::Row(v)
    }
}

impl From<ConstantVector> for Vector {
    fn from(v: ConstantVector) -> Self {
        Vector::Constant(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dictionary::DictionaryVector, values::Values};
    use strata_bits::BitMask;

    #[test]
    fn test_dictionary_access_through_base() {
        let base: VectorRef = Arc::new(
            FlatVector::try_new(
                Values::Int64(vec![5, 6, 7]),
                Some(BitMask::from_positions([1], 3)),
            )
            .unwrap()
            .into(),
        );
        let dict = Vector::Dictionary(DictionaryVector::try_new(vec![2, 1, 0, 2], None, base).unwrap());
        assert_eq!(dict.len(), 4);
        assert_eq!(dict.encoding(), VectorEncoding::Dictionary);
        assert_eq!(dict.data_type(), &DataType::Int64);
        assert_eq!(dict.value_at(0), Value::Int64(7));
        assert!(dict.is_null_at(1));
        assert_eq!(dict.value_at(2), Value::Int64(5));
    }

    #[test]
    fn test_constant_null_vector() {
        let v = Vector::Constant(ConstantVector::null(DataType::String, 5));
        assert!(v.is_null_at(4));
        assert_eq!(v.value_at(0), Value::Null);
        assert!(v.loaded().is_some());
    }
}
