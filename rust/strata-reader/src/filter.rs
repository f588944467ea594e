//! Pushdown filters.
//!
//! A filter decides per row whether it survives the scan. It is evaluated in three
//! places: against nulls, against decoded values and, conservatively, against
//! row-group statistics (a row group is skipped only when no row in it can pass).

use ahash::AHashSet;
use strata_vector::Value;

use crate::stats::ColumnStats;

/// Discriminant of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    IsNull,
    IsNotNull,
    BigintRange,
    DoubleRange,
    BytesValues,
    BoolValue,
}

#[derive(Debug, Clone)]
pub enum Filter {
    IsNull,
    IsNotNull,
    /// Inclusive integer range.
    BigintRange {
        lower: i64,
        upper: i64,
        null_allowed: bool,
    },
    /// Inclusive floating point range.
    DoubleRange {
        lower: f64,
        upper: f64,
        null_allowed: bool,
    },
    /// String membership.
    BytesValues {
        values: AHashSet<String>,
        null_allowed: bool,
    },
    BoolValue {
        value: bool,
        null_allowed: bool,
    },
}

impl Filter {
    pub fn bigint_range(lower: i64, upper: i64, null_allowed: bool) -> Filter {
        Filter::BigintRange {
            lower,
            upper,
            null_allowed,
        }
    }

    pub fn double_range(lower: f64, upper: f64, null_allowed: bool) -> Filter {
        Filter::DoubleRange {
            lower,
            upper,
            null_allowed,
        }
    }

    pub fn bytes_values<S: Into<String>>(
        values: impl IntoIterator<Item = S>,
        null_allowed: bool,
    ) -> Filter {
        Filter::BytesValues {
            values: values.into_iter().map(Into::into).collect(),
            null_allowed,
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::IsNull => FilterKind::IsNull,
            Filter::IsNotNull => FilterKind::IsNotNull,
            Filter::BigintRange { .. } => FilterKind::BigintRange,
            Filter::DoubleRange { .. } => FilterKind::DoubleRange,
            Filter::BytesValues { .. } => FilterKind::BytesValues,
            Filter::BoolValue { .. } => FilterKind::BoolValue,
        }
    }

    /// Returns `true` for the filters a struct level may carry.
    #[inline]
    pub fn is_null_filter(&self) -> bool {
        matches!(self, Filter::IsNull | Filter::IsNotNull)
    }

    /// Whether a null row passes.
    pub fn test_null(&self) -> bool {
        match self {
            Filter::IsNull => true,
            Filter::IsNotNull => false,
            Filter::BigintRange { null_allowed, .. }
            | Filter::DoubleRange { null_allowed, .. }
            | Filter::BytesValues { null_allowed, .. }
            | Filter::BoolValue { null_allowed, .. } => *null_allowed,
        }
    }

    /// Whether a non-null row holding `value` passes. Values of a kind the filter
    /// does not apply to never pass.
    pub fn test_value(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.test_null();
        }
        match self {
            Filter::IsNull => false,
            Filter::IsNotNull => true,
            Filter::BigintRange { lower, upper, .. } => value
                .as_i64()
                .is_some_and(|v| *lower <= v && v <= *upper),
            Filter::DoubleRange { lower, upper, .. } => value
                .as_f64()
                .is_some_and(|v| *lower <= v && v <= *upper),
            Filter::BytesValues { values, .. } => {
                value.as_str().is_some_and(|v| values.contains(v))
            }
            Filter::BoolValue { value: expected, .. } => value.as_bool() == Some(*expected),
        }
    }

    /// Returns `false` only if no row described by `stats` can pass.
    pub fn test_stats(&self, stats: &ColumnStats) -> bool {
        if stats.row_count == 0 {
            return false;
        }
        if stats.has_nulls() && self.test_null() {
            return true;
        }
        if stats.all_null() {
            return false;
        }
        match self {
            Filter::IsNull => false,
            Filter::IsNotNull => true,
            Filter::BigintRange { lower, upper, .. } => overlaps(
                stats.min.as_i64(),
                stats.max.as_i64(),
                *lower,
                *upper,
            ),
            Filter::DoubleRange { lower, upper, .. } => overlaps(
                stats.min.as_f64(),
                stats.max.as_f64(),
                *lower,
                *upper,
            ),
            Filter::BytesValues { values, .. } => {
                let (min, max) = (stats.min.as_str(), stats.max.as_str());
                values.iter().any(|v| {
                    min.is_none_or(|min| min <= v.as_str()) && max.is_none_or(|max| v.as_str() <= max)
                })
            }
            Filter::BoolValue { value, .. } => {
                let (min, max) = (stats.min.as_bool(), stats.max.as_bool());
                min.is_none_or(|min| min <= *value) && max.is_none_or(|max| *value <= max)
            }
        }
    }
}

/// Whether `[min, max]` (unknown bounds are open) intersects `[lower, upper]`.
fn overlaps<T: PartialOrd>(min: Option<T>, max: Option<T>, lower: T, upper: T) -> bool {
    max.is_none_or(|max| lower <= max) && min.is_none_or(|min| min <= upper)
}
