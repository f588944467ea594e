//! Row addressing within a read window.
//!
//! A row set is an ascending slice of row indices relative to the start of the
//! current read window. The window itself spans `[0, last + 1)`: rows of the window
//! that are not in the set are still consumed by a read, they are just not
//! materialized.

/// Index of a row within a read window.
pub type RowIndex = u32;

/// Number of rows in the read window covered by `rows`.
#[inline]
pub fn window_len(rows: &[RowIndex]) -> usize {
    rows.last().map_or(0, |&last| last as usize + 1)
}

/// Returns `true` if `rows` is exactly `0..rows.len()`.
#[inline]
pub fn is_dense(rows: &[RowIndex]) -> bool {
    window_len(rows) == rows.len()
}

/// Returns `true` if `rows` is strictly ascending.
pub fn is_ascending(rows: &[RowIndex]) -> bool {
    rows.windows(2).all(|pair| pair[0] < pair[1])
}

/// Returns `true` if every row of `narrowed` is also in `rows`. Both sets must be
/// ascending.
pub fn is_subset(narrowed: &[RowIndex], rows: &[RowIndex]) -> bool {
    let mut candidates = rows.iter();
    narrowed
        .iter()
        .all(|row| candidates.by_ref().any(|candidate| candidate == row))
}

/// Sets `rows` to the dense set `0..len`, extending the existing contents instead
/// of rewriting them.
pub fn fill_dense(rows: &mut Vec<RowIndex>, len: usize) {
    let old_len = rows.len();
    if len > old_len {
        rows.extend(old_len as RowIndex..len as RowIndex);
    } else {
        rows.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_and_density() {
        assert_eq!(window_len(&[]), 0);
        assert_eq!(window_len(&[0, 3, 9]), 10);
        assert!(is_dense(&[0, 1, 2]));
        assert!(!is_dense(&[0, 2]));
        assert!(is_dense(&[]));
    }

    #[test]
    fn test_subset() {
        assert!(is_subset(&[1, 4], &[0, 1, 2, 4]));
        assert!(is_subset(&[], &[0, 1]));
        assert!(!is_subset(&[3], &[0, 1, 2, 4]));
        assert!(!is_subset(&[4, 1], &[0, 1, 2, 4]));
    }

    #[test]
    fn test_fill_dense_reuses_prefix() {
        let mut rows = Vec::new();
        fill_dense(&mut rows, 4);
        assert_eq!(rows, [0, 1, 2, 3]);
        fill_dense(&mut rows, 2);
        assert_eq!(rows, [0, 1]);
        fill_dense(&mut rows, 5);
        assert_eq!(rows, [0, 1, 2, 3, 4]);
        assert!(is_ascending(&rows));
    }
}
