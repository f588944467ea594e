//! Columnar batch model produced by the selective readers.
//!
//! A batch column is a [`vector::Vector`] held behind a reference-counted
//! [`vector::VectorRef`]. Readers mutate a previous batch in place only when they hold
//! the sole reference to it (`Arc::get_mut`); any other holder forces a fresh
//! allocation.
//!
//! # Main Components
//!
//! - [`data_type::DataType`] and [`data_type::Field`]: the logical schema of a column.
//! - [`value::Value`]: a single scalar, used for constants and statistics.
//! - [`values::Values`]: typed, dense value storage of a flat column.
//! - [`vector::Vector`]: one of
//!   - [`flat::FlatVector`] (decoded values plus nulls),
//!   - [`row::RowVector`] (struct column: nulls plus child columns),
//!   - [`constant::ConstantVector`] (one value repeated, including the null constant),
//!   - [`dictionary::DictionaryVector`] (indices into another vector),
//!   - [`lazy::LazyVector`] (a deferred column decoded on explicit load).

pub mod constant;
pub mod data_type;
pub mod dictionary;
pub mod flat;
pub mod lazy;
pub mod row;
pub mod value;
pub mod values;
pub mod vector;

pub use data_type::{DataType, Field};
pub use value::Value;
pub use vector::{Vector, VectorEncoding, VectorRef};
