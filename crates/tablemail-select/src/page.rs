//! LIMIT/page windows.

/// A page of results.
///
/// Pages are numbered from 1; page 0 is read as page 1. A `limit` of 0
/// means unbounded: every row on a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageWindow {
    limit: usize,
    page: usize,
}

impl PageWindow {
    /// Creates a window of `limit` rows starting at page `page`.
    pub fn new(limit: usize, page: usize) -> Self {
        PageWindow {
            limit,
            page: page.max(1),
        }
    }

    /// A window holding every row.
    pub fn unbounded() -> Self {
        Self::new(0, 1)
    }

    /// Rows per page; 0 means unbounded.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The 1-based page number.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Returns true if the window holds every row.
    pub fn is_unbounded(&self) -> bool {
        self.limit == 0
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> usize {
        if self.is_unbounded() {
            0
        } else {
            (self.page - 1).saturating_mul(self.limit)
        }
    }

    /// Cuts this page out of a full, ordered result.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        if self.is_unbounded() {
            return items;
        }
        items
            .into_iter()
            .skip(self.offset())
            .take(self.limit)
            .collect()
    }

    /// Whether a next page may exist, given how many rows this page held.
    ///
    /// A page is "full" when the source returned exactly `limit` rows; only
    /// then is there possibly more to fetch.
    pub fn has_next(&self, returned: usize) -> bool {
        !self.is_unbounded() && returned == self.limit
    }

    /// The window for the following page.
    pub fn next(&self) -> Self {
        Self::new(self.limit, self.page.saturating_add(1))
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}
