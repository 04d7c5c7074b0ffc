//! Page cursor calculation
//!
//! Every document exposes its page position through the [`Pagination`]
//! trait. Collections use [`PageCursor`], a pure function of
//! `(total, size, current)`; every other view uses [`Unpaginated`].

use serde::Serialize;

/// Page accessors every document variant provides
pub trait Pagination {
    fn first_page(&self) -> Option<u64>;

    fn last_page(&self) -> Option<u64>;

    fn current_page(&self) -> Option<u64>;

    fn previous_page(&self) -> Option<u64>;

    fn next_page(&self) -> Option<u64>;

    fn offset(&self) -> Option<u64>;

    fn limit(&self) -> Option<u64>;

    /// Number of results rendered in this document
    fn count(&self) -> Option<u64>;

    /// Total number of results for the request
    fn total(&self) -> Option<u64>;
}

/// Cursor position within a paginated collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    total: u64,
    size: u64,
    current: u64,
    count: u64,
}

impl PageCursor {
    /// `size` below 1 is treated as 1, `current` below 1 clamps to 1
    pub fn new(total: u64, size: u64, current: u64) -> Self {
        Self {
            total,
            size: size.max(1),
            current: current.max(1),
            count: 0,
        }
    }

    /// Record how many results the page actually holds
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// `ceil(total / size)`, zero for an empty collection
    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(self.size)
    }
}

impl Pagination for PageCursor {
    fn first_page(&self) -> Option<u64> {
        Some(1)
    }

    fn last_page(&self) -> Option<u64> {
        Some(self.page_count())
    }

    fn current_page(&self) -> Option<u64> {
        Some(self.current)
    }

    fn previous_page(&self) -> Option<u64> {
        (self.current > 1).then(|| self.current - 1)
    }

    fn next_page(&self) -> Option<u64> {
        if self.current < self.page_count() {
            self.current.checked_add(1)
        } else {
            None
        }
    }

    /// Saturates for pages beyond `u64::MAX / size`
    fn offset(&self) -> Option<u64> {
        Some((self.current - 1).saturating_mul(self.size))
    }

    fn limit(&self) -> Option<u64> {
        Some(self.size)
    }

    fn count(&self) -> Option<u64> {
        Some(self.count)
    }

    fn total(&self) -> Option<u64> {
        Some(self.total)
    }
}

/// Pagination of a document that is not a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unpaginated {
    count: u64,
}

impl Unpaginated {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

impl Pagination for Unpaginated {
    fn first_page(&self) -> Option<u64> {
        None
    }

    fn last_page(&self) -> Option<u64> {
        None
    }

    fn current_page(&self) -> Option<u64> {
        None
    }

    fn previous_page(&self) -> Option<u64> {
        None
    }

    fn next_page(&self) -> Option<u64> {
        None
    }

    fn offset(&self) -> Option<u64> {
        None
    }

    fn limit(&self) -> Option<u64> {
        None
    }

    fn count(&self) -> Option<u64> {
        Some(self.count)
    }

    fn total(&self) -> Option<u64> {
        None
    }
}

/// Page block merged into a collection's `meta`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PageMeta {
    pub fn from_pagination(pages: &dyn Pagination) -> Self {
        Self {
            page: pages.current_page(),
            last_page: pages.last_page(),
            previous_page: pages.previous_page(),
            next_page: pages.next_page(),
            offset: pages.offset(),
            limit: pages.limit(),
            total: pages.total(),
        }
    }
}

/// Build a page cursor link
///
/// An absent page yields no link.
pub fn cursor_link(base: &str, size: u64, page: Option<u64>) -> Option<String> {
    page.map(|page| format!("{}?page[size]={}&page[number]={}", base, size, page))
}
