use serde::{Deserialize, Serialize};

/// Computed pagination window for a one-based page request.
///
/// Both parameter conventions (zero-based skip/take and one-based inclusive
/// row range) are always computed, so statements written against either
/// style work unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    /// Rows to skip (zero-based offset/limit convention).
    pub skip: u64,
    /// Rows to take (offset/limit convention).
    pub take: u64,
    /// First row of the window, one-based inclusive.
    pub take_start: u64,
    /// Last row of the window, one-based inclusive.
    pub take_end: u64,
}

impl PageBounds {
    /// `page_index` and `page_size` are one-based; callers validate `>= 1`
    /// before constructing bounds. The window arithmetic saturates, so
    /// absurd requests pin at `u64::MAX` instead of overflowing.
    pub fn new(page_index: u64, page_size: u64) -> Self {
        let skip = page_index.saturating_sub(1).saturating_mul(page_size);
        PageBounds {
            skip,
            take: page_size,
            take_start: skip.saturating_add(1),
            take_end: page_index.saturating_mul(page_size),
        }
    }
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub total_count: u64,
    /// The served page. Clamped down to `total_pages` when the request
    /// overshoots; `0` when there are no results at all.
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub contents: Vec<T>,
}

impl<T> PageResult<T> {
    /// Build the page metadata for an executed data statement.
    ///
    /// The clamp is metadata-only: `contents` is whatever the statement
    /// returned for the requested (unclamped) window, never re-queried.
    /// A zero total forces `page` to 0; callers rely on that as the
    /// zero-results sentinel.
    pub fn compute(total_count: u64, page_index: u64, page_size: u64, contents: Vec<T>) -> Self {
        let total_pages = total_pages(total_count, page_size);
        PageResult {
            total_count,
            page: page_index.min(total_pages),
            page_size,
            total_pages,
            contents,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            contents: self.contents.into_iter().map(f).collect(),
        }
    }
}

/// Ceiling division via the remainder: exact multiples divide evenly,
/// remainders round the last page up.
pub(crate) fn total_pages(total_count: u64, page_size: u64) -> u64 {
    if total_count % page_size == 0 {
        total_count / page_size
    } else {
        total_count / page_size + 1
    }
}

/// Join the count and data statements into one batch, inserting a statement
/// terminator only when the count statement does not already end with one.
pub(crate) fn assemble_batch(count_sql: &str, data_sql: &str) -> String {
    if count_sql.ends_with(';') {
        format!("{count_sql}{data_sql}")
    } else {
        format!("{count_sql};{data_sql}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_table() {
        // (total_count, page_size, expected)
        let cases = [
            (100u64, 10u64, 10u64),
            (101, 10, 11),
            (99, 10, 10),
            (1, 10, 1),
            (10, 10, 1),
            (11, 10, 2),
            (0, 10, 0),
            (25, 10, 3),
        ];
        for (total, size, expected) in cases {
            assert_eq!(total_pages(total, size), expected, "total={total} size={size}");
        }
    }

    #[test]
    fn bounds_arithmetic() {
        let bounds = PageBounds::new(3, 20);
        assert_eq!(bounds.skip, 40);
        assert_eq!(bounds.take, 20);
        assert_eq!(bounds.take_start, 41);
        assert_eq!(bounds.take_end, 60);

        let first = PageBounds::new(1, 10);
        assert_eq!(first.skip, 0);
        assert_eq!(first.take_start, 1);
        assert_eq!(first.take_end, 10);
    }

    #[test]
    fn huge_window_requests_saturate_instead_of_overflowing() {
        let bounds = PageBounds::new(u64::MAX, 2);
        assert_eq!(bounds.skip, u64::MAX);
        assert_eq!(bounds.take, 2);
        assert_eq!(bounds.take_start, u64::MAX);
        assert_eq!(bounds.take_end, u64::MAX);
    }

    #[test]
    fn overshooting_page_is_clamped_to_total_pages() {
        let result = PageResult::<i64>::compute(25, 5, 10, vec![]);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.page, 3);
        assert_eq!(result.total_count, 25);
    }

    #[test]
    fn page_within_range_is_kept() {
        let result = PageResult::compute(25, 2, 10, vec![11, 12]);
        assert_eq!(result.page, 2);
        assert_eq!(result.contents, vec![11, 12]);
    }

    #[test]
    fn zero_total_forces_page_zero() {
        let result = PageResult::<i64>::compute(0, 1, 10, vec![]);
        assert_eq!(result.total_pages, 0);
        assert_eq!(result.page, 0);
        assert!(result.contents.is_empty());
    }

    #[test]
    fn terminator_insertion_is_idempotent() {
        assert_eq!(
            assemble_batch("SELECT COUNT(*) FROM t", "SELECT * FROM t"),
            "SELECT COUNT(*) FROM t;SELECT * FROM t"
        );
        assert_eq!(
            assemble_batch("SELECT COUNT(*) FROM t;", "SELECT * FROM t"),
            "SELECT COUNT(*) FROM t;SELECT * FROM t"
        );
    }
}
