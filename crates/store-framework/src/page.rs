//! # Pagination
//!
//! Request and response shapes for paged list calls, plus the [`Pagination`] block every
//! store publishes. Backends are allowed to omit response fields; [`PageResponse::into_parts`]
//! substitutes the documented defaults so no `None` ever reaches an observer.

use serde::{Deserialize, Serialize};

/// Page size used when neither the configuration nor the backend says otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A request for one page. Both numbers are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Builds a request, coercing zero values to 1.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }
}

/// One page as returned by a backend. Every pagination field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl<T> Default for PageResponse<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current_page: None,
            total_pages: None,
            total_count: None,
            page_size: None,
        }
    }
}

impl<T> PageResponse<T> {
    /// A response with only items and no pagination metadata.
    pub fn items(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// A bare list treated as a single page holding everything.
    pub fn single_page(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            current_page: Some(1),
            total_pages: Some(1),
            total_count: Some(count as u64),
            page_size: (count > 0).then_some(count as u32),
            items,
        }
    }

    /// Splits into items and a fully defaulted [`Pagination`].
    ///
    /// Defaults: page 1, one page in total, zero items counted, and `fallback_page_size`.
    /// Zero values from the backend are treated as omitted.
    pub fn into_parts(self, fallback_page_size: u32) -> (Vec<T>, Pagination) {
        let page = Pagination {
            current: self.current_page.filter(|p| *p > 0).unwrap_or(1),
            total_pages: self.total_pages.filter(|p| *p > 0).unwrap_or(1),
            total_count: self.total_count.unwrap_or(0),
            page_size: self
                .page_size
                .filter(|s| *s > 0)
                .unwrap_or(fallback_page_size.max(1)),
        };
        (self.items, page)
    }
}

/// Pagination as observed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub page_size: u32,
}

impl Pagination {
    /// The state after a failed load or a reset.
    pub fn first(page_size: u32) -> Self {
        Self {
            current: 1,
            total_pages: 1,
            total_count: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current > 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}
