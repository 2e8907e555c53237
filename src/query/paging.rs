//! Pagination: page/per-page to offset/limit plus the resolved sort.

use crate::query::ListQuery;
use crate::store::SortDir;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagingParams {
    pub limit: u64,
    pub offset: u64,
    pub sort_field: String,
    pub sort_dir: SortDir,
}

/// Row counts stay within a signed 64-bit range so every backend can take them.
const MAX_ROWS: u64 = i64::MAX as u64;

/// Pure; the query is already validated so page and per-page are at least 1.
pub fn calc_pagination(query: &ListQuery, default_sort_field: &str) -> PagingParams {
    let limit = query.per_page().min(MAX_ROWS);
    PagingParams {
        limit,
        offset: query.page().saturating_sub(1).saturating_mul(limit).min(MAX_ROWS),
        sort_field: query
            .sort_field()
            .unwrap_or(default_sort_field)
            .to_string(),
        sort_dir: query.sort_dir(),
    }
}
