//! Resizable `u64`-word bit masks used for null bitmaps, deleted-row bitmaps
//! and row-group skip bitmaps.

pub mod bit_mask;

pub use bit_mask::BitMask;
