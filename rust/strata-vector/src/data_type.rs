//! Logical column types.

use std::fmt;

/// The logical type of a column.
///
/// Scalar types cover what the leaf readers decode; `Struct` is a row with named,
/// independently encoded fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    String,
    Struct(Vec<Field>),
}

/// A named field of a struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Field {
        Field {
            name: name.into(),
            data_type,
        }
    }
}

impl DataType {
    /// Builds a struct type from `(name, type)` pairs.
    pub fn struct_of<N: Into<String>>(fields: impl IntoIterator<Item = (N, DataType)>) -> DataType {
        DataType::Struct(
            fields
                .into_iter()
                .map(|(name, data_type)| Field::new(name, data_type))
                .collect(),
        )
    }

    #[inline]
    pub fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    /// Returns the fields of a struct type, or an empty slice for scalar types.
    pub fn fields(&self) -> &[Field] {
        match self {
            DataType::Struct(fields) => fields,
            _ => &[],
        }
    }

    /// Number of child fields (0 for scalar types).
    pub fn size(&self) -> usize {
        self.fields().len()
    }

    pub fn child_at(&self, index: usize) -> Option<&DataType> {
        self.fields().get(index).map(|field| &field.data_type)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => f.write_str("boolean"),
            DataType::Int64 => f.write_str("int64"),
            DataType::Float64 => f.write_str("float64"),
            DataType::String => f.write_str("string"),
            DataType::Struct(fields) => {
                f.write_str("struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                f.write_str(">")
            }
        }
    }
}
