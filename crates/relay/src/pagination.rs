//! Paginated reads over the durable history
//!
//! Page 1 is the newest `limit` messages, page 2 the `limit` before those,
//! and so on. Each page is a single tail-relative range query.

use crate::models::{HistoryQuery, Message};
use crate::store::HistoryStore;

/// Effective page parameters after defaulting and clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Resolve raw query values.
    ///
    /// Missing or non-numeric values use the defaults, `page` is raised to
    /// at least 1, and a non-zero `limit` is clamped to `[1, max_limit]`.
    pub fn from_query(query: &HistoryQuery, default_limit: u32, max_limit: u32) -> Self {
        let page = parse_number(query.page.as_deref())
            .filter(|p| *p != 0)
            .unwrap_or(1)
            .clamp(1, u32::MAX as i64) as u32;

        let limit = parse_number(query.limit.as_deref())
            .filter(|l| *l != 0)
            .unwrap_or(default_limit as i64)
            .clamp(1, max_limit.max(1) as i64) as u32;

        Self { page, limit }
    }

    /// Tail offsets `(start, end)` for this page, inclusive.
    pub fn tail_range(&self) -> (isize, isize) {
        tail_range(self.page, self.limit)
    }
}

fn parse_number(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse::<i64>().ok()
}

/// Inclusive offsets from the tail covering page `page` of size `limit`.
///
/// `start = -(page * limit)` and `end = -((page - 1) * limit) - 1`. For the
/// first page that gives `end = -1`, the newest entry; an end offset that
/// would come out non-negative is pinned to -1 for the same reason.
pub fn tail_range(page: u32, limit: u32) -> (isize, isize) {
    let page = page.max(1) as isize;
    let limit = limit as isize;

    let start = page.saturating_mul(limit).saturating_neg();
    let end = (page - 1).saturating_mul(limit).saturating_neg().saturating_sub(1);
    let end = if end >= 0 { -1 } else { end };

    (start, end)
}

pub async fn fetch_page(store: &HistoryStore, request: PageRequest) -> Vec<Message> {
    if request.limit == 0 {
        return Vec::new();
    }
    let (start, end) = request.tail_range();
    store.range_read(start, end).await
}
