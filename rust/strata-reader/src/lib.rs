//! Selective column readers for nested struct columns.
//!
//! A reader tree mirrors the query's struct schema: a [`struct_reader::StructColumnReader`]
//! per struct level and a [`flat_reader::FlatColumnReader`] per scalar leaf, all
//! implementing the [`reader::ColumnReader`] contract. Each batch goes through two
//! phases:
//!
//! 1. `read(offset, rows, nulls)` decodes nulls, applies deletions and pushdown
//!    filters, and narrows the active row set.
//! 2. `get_values(rows, result)` assembles the output batch, reusing the previous
//!    container when it is uniquely held and deferring projected, unfiltered
//!    children as lazy vectors.
//!
//! Every reader in a subtree keeps its read offset in top-level row terms, no matter
//! how many physical values it actually consumed.

pub mod batch_reader;
pub mod config;
pub mod filter;
pub mod flat_reader;
pub mod format_data;
pub mod memory_data;
pub mod mutation;
pub mod reader;
pub mod row_set;
pub mod scan_spec;
pub mod selectivity;
pub mod stats;
pub mod struct_reader;

pub use config::ReaderConfig;
pub use reader::ColumnReader;
pub use row_set::RowIndex;
pub use struct_reader::StructColumnReader;

#[cfg(test)]
mod tests;
