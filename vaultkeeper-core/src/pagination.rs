//! Menu paging arithmetic.
//!
//! Offsets travel through callback payloads, so they are untrusted. They
//! are aligned to a page boundary and wrapped into
//! `[0, page_count * page_size)`: "next" on the last page lands on the
//! first, "previous" on the first lands on the last.

use crate::callback::CallbackAction;

/// Secrets shown per menu page
pub const DEFAULT_PAGE_SIZE: i64 = 6;

/// A resolved menu page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Row offset of the first secret on the page
    pub offset: i64,
    /// 1-based page number, 0 when there are no secrets
    pub number: i64,
    pub count: i64,
    pub size: i64,
}

impl Page {
    /// Resolve a possibly out-of-range offset against the current total
    pub fn resolve(offset: i64, total: i64, page_size: i64) -> Self {
        let size = page_size.max(1);
        let count = page_count(total, size);

        if count == 0 {
            return Self {
                offset: 0,
                number: 0,
                count: 0,
                size,
            };
        }

        let index = offset.div_euclid(size).rem_euclid(count);

        Self {
            offset: index * size,
            number: index + 1,
            count,
            size,
        }
    }

    /// Whether navigation buttons make sense
    pub fn has_siblings(&self) -> bool {
        self.count > 1
    }
}

/// Number of pages needed for `total` items
pub fn page_count(total: i64, page_size: i64) -> i64 {
    let size = page_size.max(1);
    let total = total.max(0);
    total / size + i64::from(total % size != 0)
}

/// The raw offset a menu action asks for, before wrapping
pub fn step_offset(action: CallbackAction, offset: i64, page_size: i64) -> i64 {
    match action {
        CallbackAction::Next => offset.saturating_add(page_size),
        CallbackAction::Prev => offset.saturating_sub(page_size),
        _ => offset,
    }
}
