//! Pagination calculator.

use crate::config::PageDefaults;
use crate::params::PageParams;

/// Resolved limit/offset applied to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
    pub limit: u64,
    pub offset: u64,
}

/// Resolve pagination: an explicit per-call page overrides the
/// configured default wholesale; neither present means no limit/offset
/// and no page count.
pub fn resolve(explicit: Option<&PageParams>, default: Option<&PageDefaults>) -> Option<PageSlice> {
    if let Some(page) = explicit {
        return Some(PageSlice {
            limit: page.limit,
            offset: page.offset,
        });
    }
    default.map(|d| PageSlice {
        limit: d.limit,
        offset: d.offset,
    })
}

/// Pages of size `limit` needed to cover `total` rows.
pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    ((total as f64) / (limit as f64)).ceil() as u64
}
