//! Typed storage for the values of a flat column.

use strata_bits::BitMask;
use strata_common::{Result, error::Error};

use crate::{data_type::DataType, value::Value};

/// Dense, typed value storage.
///
/// A `Values` buffer holds one slot per logical position. Slots at null positions
/// hold the type's default value; nullness itself is tracked separately by a
/// [`BitMask`] owned by the enclosing column.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Boolean(Vec<bool>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

impl Values {
    /// Creates empty storage for a scalar type.
    ///
    /// # Errors
    ///
    /// Struct types have no value storage of their own.
    pub fn empty(data_type: &DataType) -> Result<Values> {
        Self::with_capacity(data_type, 0)
    }

    pub fn with_capacity(data_type: &DataType, capacity: usize) -> Result<Values> {
        Ok(match data_type {
            DataType::Boolean => Values::Boolean(Vec::with_capacity(capacity)),
            DataType::Int64 => Values::Int64(Vec::with_capacity(capacity)),
            DataType::Float64 => Values::Float64(Vec::with_capacity(capacity)),
            DataType::String => Values::String(Vec::with_capacity(capacity)),
            DataType::Struct(_) => {
                return Err(Error::invalid_arg(
                    "data_type",
                    format!("no value storage for {data_type}"),
                ));
            }
        })
    }

    /// Builds storage from a list of scalars; nulls become default slots.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-null value does not match `data_type`.
    pub fn from_values<'a>(
        data_type: &DataType,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> Result<Values> {
        let mut result = Values::empty(data_type)?;
        for value in values {
            result.push(value)?;
        }
        Ok(result)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Values::Boolean(_) => DataType::Boolean,
            Values::Int64(_) => DataType::Int64,
            Values::Float64(_) => DataType::Float64,
            Values::String(_) => DataType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::Boolean(v) => v.len(),
            Values::Int64(v) => v.len(),
            Values::Float64(v) => v.len(),
            Values::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value at `index` as a scalar.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> Value {
        match self {
            Values::Boolean(v) => Value::Boolean(v[index]),
            Values::Int64(v) => Value::Int64(v[index]),
            Values::Float64(v) => Value::Float64(v[index]),
            Values::String(v) => Value::String(v[index].clone()),
        }
    }

    /// Appends a scalar; `Value::Null` appends the default slot.
    pub fn push(&mut self, value: &Value) -> Result<()> {
        match (self, value) {
            (Values::Boolean(v), Value::Boolean(x)) => v.push(*x),
            (Values::Int64(v), Value::Int64(x)) => v.push(*x),
            (Values::Float64(v), Value::Float64(x)) => v.push(*x),
            (Values::String(v), Value::String(x)) => v.push(x.clone()),
            (values, Value::Null) => values.push_default(),
            (values, value) => {
                return Err(Error::invalid_arg(
                    "value",
                    format!("{value:?} does not fit {}", values.data_type()),
                ));
            }
        }
        Ok(())
    }

    pub fn push_default(&mut self) {
        match self {
            Values::Boolean(v) => v.push(false),
            Values::Int64(v) => v.push(0),
            Values::Float64(v) => v.push(0.0),
            Values::String(v) => v.push(String::new()),
        }
    }

    /// Appends the value at `index` of `source` (same type) to `self`.
    fn push_from(&mut self, source: &Values, index: usize) {
        match (self, source) {
            (Values::Boolean(v), Values::Boolean(s)) => v.push(s[index]),
            (Values::Int64(v), Values::Int64(s)) => v.push(s[index]),
            (Values::Float64(v), Values::Float64(s)) => v.push(s[index]),
            (Values::String(v), Values::String(s)) => v.push(s[index].clone()),
            (values, _) => values.push_default(),
        }
    }

    /// Copies out the values at the given positions, in order.
    ///
    /// # Panics
    ///
    /// Panics if any position is out of bounds.
    pub fn gather(&self, positions: impl IntoIterator<Item = usize>) -> Values {
        let positions = positions.into_iter();
        let mut result = self.empty_like(positions.size_hint().0);
        for pos in positions {
            result.push_from(self, pos);
        }
        result
    }

    /// Expands dense non-null values into `len` slots, placing default slots at the
    /// positions marked in `nulls`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of dense values doesn't match the number of
    /// non-null positions.
    pub fn scatter(dense: &Values, nulls: Option<&BitMask>, len: usize) -> Result<Values> {
        let Some(nulls) = nulls else {
            if dense.len() != len {
                return Err(Error::invalid_arg(
                    "dense",
                    format!("expected {len} values, got {}", dense.len()),
                ));
            }
            return Ok(dense.clone());
        };
        let non_nulls = len - nulls.count_ones_in(0..len.min(nulls.len()));
        if dense.len() != non_nulls {
            return Err(Error::invalid_arg(
                "dense",
                format!("expected {non_nulls} non-null values, got {}", dense.len()),
            ));
        }
        let mut result = dense.empty_like(len);
        let mut next = 0;
        for i in 0..len {
            if nulls.get(i) {
                result.push_default();
            } else {
                result.push_from(dense, next);
                next += 1;
            }
        }
        Ok(result)
    }

    fn empty_like(&self, capacity: usize) -> Values {
        match self {
            Values::Boolean(_) => Values::Boolean(Vec::with_capacity(capacity)),
            Values::Int64(_) => Values::Int64(Vec::with_capacity(capacity)),
            Values::Float64(_) => Values::Float64(Vec::with_capacity(capacity)),
            Values::String(_) => Values::String(Vec::with_capacity(capacity)),
        }
    }

    /// Drops the first `count` values.
    pub fn drain_front(&mut self, count: usize) {
        match self {
            Values::Boolean(v) => drop(v.drain(..count)),
            Values::Int64(v) => drop(v.drain(..count)),
            Values::Float64(v) => drop(v.drain(..count)),
            Values::String(v) => drop(v.drain(..count)),
        }
    }

    /// Returns the values in `range` as a new buffer.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Values {
        match self {
            Values::Boolean(v) => Values::Boolean(v[range].to_vec()),
            Values::Int64(v) => Values::Int64(v[range].to_vec()),
            Values::Float64(v) => Values::Float64(v[range].to_vec()),
            Values::String(v) => Values::String(v[range].to_vec()),
        }
    }
}
