//! Pagination state for list workflows.
//!
//! Requested pages are clamped into `[1, max(1, page_count)]` rather than
//! rejected, so a stale or hand-edited page number still yields a listing.

use std::collections::BTreeMap;

use braces_rs_core::ContextValue;

/// The `page` query value that selects the last page.
pub const LAST_PAGE: &str = "last";

/// Page size, resolved page and total count for one request.
///
/// # Examples
///
/// ```
/// use braces_rs_views::pagination::PaginationState;
///
/// let state = PaginationState::compute(5, 2, Some("3"));
/// assert_eq!(state.page_count(), 3);
/// assert_eq!(state.offset(), 4);
/// assert_eq!(state.limit(), 2);
///
/// let clamped = PaginationState::compute(5, 2, Some("99"));
/// assert_eq!(clamped.current_page, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    /// Items per page, always positive.
    pub page_size: usize,
    /// The resolved 1-indexed page.
    pub current_page: usize,
    /// Total number of items across all pages.
    pub total: usize,
}

/// Clamps a non-keyword page value into `[1, last]`.
///
/// Digits too large for `usize` are still past the end, so they resolve to
/// `last`. Negative and non-numeric values resolve to 1.
fn requested_page(raw: &str, last: usize) -> usize {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    digits.parse::<usize>().map_or(last, |n| n.clamp(1, last))
}

impl PaginationState {
    /// Resolves the requested page against `total` items.
    ///
    /// A missing or non-numeric page resolves to 1, `"last"` to the last
    /// page, and anything out of range to the nearest valid page. A zero
    /// `page_size` is treated as 1.
    pub fn compute(total: usize, page_size: usize, requested: Option<&str>) -> Self {
        let page_size = page_size.max(1);
        let last = total.div_ceil(page_size).max(1);
        let current_page = match requested.map(str::trim) {
            Some(LAST_PAGE) => last,
            Some(raw) => requested_page(raw, last),
            None => 1,
        };
        Self {
            page_size,
            current_page,
            total,
        }
    }

    /// A single page holding every item, used when pagination is off.
    pub fn unpaginated(total: usize) -> Self {
        Self {
            page_size: total.max(1),
            current_page: 1,
            total,
        }
    }

    /// `ceil(total / page_size)`; zero when there are no items.
    pub const fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }

    /// Index of the first item on the current page.
    pub const fn offset(&self) -> usize {
        (self.current_page - 1) * self.page_size
    }

    /// Number of items the current page asks for.
    pub const fn limit(&self) -> usize {
        self.page_size
    }

    /// Returns `true` if a later page exists.
    pub const fn has_next(&self) -> bool {
        self.current_page < self.page_count()
    }

    /// Returns `true` if an earlier page exists.
    pub const fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Returns `true` if there is more than one page.
    pub const fn is_paginated(&self) -> bool {
        self.page_count() > 1
    }

    /// 1-based index of the first item on the page, 0 when empty.
    pub const fn start_index(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.offset() + 1
        }
    }

    /// 1-based index of the last item on the page, 0 when empty.
    pub fn end_index(&self) -> usize {
        (self.offset() + self.page_size).min(self.total)
    }

    /// The `page_obj` context value.
    pub fn to_page_obj(&self) -> ContextValue {
        let mut map = BTreeMap::new();
        map.insert("number".to_string(), ContextValue::from(self.current_page));
        map.insert("num_pages".to_string(), ContextValue::from(self.page_count()));
        map.insert("count".to_string(), ContextValue::from(self.total));
        map.insert("per_page".to_string(), ContextValue::from(self.page_size));
        map.insert("has_next".to_string(), ContextValue::Bool(self.has_next()));
        map.insert(
            "has_previous".to_string(),
            ContextValue::Bool(self.has_previous()),
        );
        map.insert("start_index".to_string(), ContextValue::from(self.start_index()));
        map.insert("end_index".to_string(), ContextValue::from(self.end_index()));
        ContextValue::Dict(map)
    }

    /// The `paginator` context value.
    pub fn to_paginator(&self) -> ContextValue {
        let mut map = BTreeMap::new();
        map.insert("count".to_string(), ContextValue::from(self.total));
        map.insert("num_pages".to_string(), ContextValue::from(self.page_count()));
        map.insert("per_page".to_string(), ContextValue::from(self.page_size));
        ContextValue::Dict(map)
    }
}
