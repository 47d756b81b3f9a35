//! Offset/limit windows over query results.
//!
//! The engine applies a [`PageWindow`] exactly as given. Bounding the window
//! against [`QUERY_MAX_SIZE`] is left to callers, typically at the edge where
//! request parameters are parsed with [`PageWindow::from_params`].

use std::cmp::min;

/// Suggested upper bound for a single page of results.
pub const QUERY_MAX_SIZE: u64 = 50;

/// Request option naming the number of matches to skip.
pub const PAGE_START_OPTION: &str = "start";

/// Request option naming the maximum number of records to return.
pub const PAGE_LIMIT_OPTION: &str = "limit";

/// Which slice of the sorted match set a query returns.
///
/// # Example
///
/// ```ignore
/// use docbridge::page::PageWindow;
///
/// let window = PageWindow::new(20, 10);
/// assert_eq!(window.slice_len(25), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Number of matches to skip.
    pub start: u64,
    /// Maximum number of records to return.
    pub limit: u64,
}

impl PageWindow {
    pub fn new(start: u64, limit: u64) -> Self {
        Self { start, limit }
    }

    /// A window covering every match.
    pub fn all() -> Self {
        Self { start: 0, limit: u64::MAX }
    }

    /// The first `limit` matches.
    pub fn first(limit: u64) -> Self {
        Self { start: 0, limit }
    }

    /// Returns a copy whose limit does not exceed `max`.
    pub fn clamp(self, max: u64) -> Self {
        Self { start: self.start, limit: min(self.limit, max) }
    }

    /// Number of records this window yields from `total` matches.
    pub fn slice_len(&self, total: u64) -> u64 {
        min(self.limit, total.saturating_sub(self.start))
    }

    /// Builds a window from request parameters such as a parsed query string.
    ///
    /// Reads [`PAGE_START_OPTION`] and [`PAGE_LIMIT_OPTION`]. Missing or
    /// unparseable values fall back to a start of zero and a limit of `max`;
    /// the limit is always bounded by `max`.
    pub fn from_params<'a, I>(params: I, max: u64) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut window = Self::first(max);

        for (key, value) in params {
            match key {
                PAGE_START_OPTION => {
                    if let Ok(start) = value.trim().parse() {
                        window.start = start;
                    }
                }
                PAGE_LIMIT_OPTION => {
                    if let Ok(limit) = value.trim().parse() {
                        window.limit = limit;
                    }
                }
                _ => {}
            }
        }

        window.clamp(max)
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::all()
    }
}
