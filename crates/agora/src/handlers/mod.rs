//! Controllers: the terminal stages of each route.
//!
//! Controllers can rely on the session, the current user and the template
//! environment having been set up by the stages before them.

pub mod comments;
pub mod threads;
pub mod users;

#[cfg(test)]
mod fixtures;

use agora_core::forum::User;

use crate::{context::RequestScope, error::PipelineError, views::Pagination};

/// 1-based page number from `?p=`.
pub(crate) fn page(scope: &RequestScope) -> usize {
    scope
        .request()
        .query()
        .int("p")
        .filter(|p| *p > 0)
        .and_then(|p| usize::try_from(p).ok())
        .unwrap_or(1)
}

/// Rows skipped before `page`. Saturates for page numbers past any real
/// listing, which then comes back empty.
fn offset(page: usize, per_page: usize) -> usize {
    page.saturating_sub(1).saturating_mul(per_page)
}

/// Limit and offset for a page, fetching one extra row to detect a next page.
pub(crate) fn window(page: usize, per_page: usize) -> (usize, usize) {
    (per_page.saturating_add(1), offset(page, per_page))
}

/// Trims the extra row fetched by [`window`] and links the next page.
pub(crate) fn paginate<T>(
    mut rows: Vec<T>,
    page: usize,
    per_page: usize,
    href: impl Fn(usize) -> String,
) -> (Vec<T>, Pagination) {
    let has_more = rows.len() > per_page;
    rows.truncate(per_page);
    let pagination = Pagination {
        offset: offset(page, per_page),
        next_href: has_more.then(|| href(page.saturating_add(1))),
    };
    (rows, pagination)
}

/// Numeric query parameter identifying an entity. Missing or malformed ids
/// are a 404.
pub(crate) fn query_id(scope: &RequestScope, key: &str) -> Result<i64, PipelineError> {
    scope
        .request()
        .query()
        .int(key)
        .ok_or_else(|| PipelineError::NotFound(format!("missing or invalid `{key}`")))
}

/// The signed in user of a route behind `authenticated_only`.
pub(crate) fn require_user(scope: &RequestScope) -> Result<User, PipelineError> {
    scope
        .current_user()
        .cloned()
        .ok_or_else(|| PipelineError::Internal("route requires a signed in user".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window() {
        assert_eq!(window(1, 30), (31, 0));
        assert_eq!(window(3, 30), (31, 60));
    }

    #[test]
    fn test_window_saturates_for_huge_pages() {
        let page = usize::MAX;
        assert_eq!(window(page, 100), (101, usize::MAX));

        let (rows, pagination) = paginate(Vec::<i64>::new(), page, 100, |p| format!("/?p={p}"));
        assert!(rows.is_empty());
        assert_eq!(pagination.offset, usize::MAX);
        assert!(pagination.next_href.is_none());
    }

    #[test]
    fn test_paginate_detects_next_page() {
        let (rows, pagination) = paginate(vec![1, 2, 3], 2, 2, |p| format!("/newest?p={p}"));
        assert_eq!(rows, vec![1, 2]);
        assert_eq!(pagination.offset, 2);
        assert_eq!(pagination.next_href.as_deref(), Some("/newest?p=3"));

        let (rows, pagination) = paginate(vec![1, 2], 1, 2, |p| format!("/newest?p={p}"));
        assert_eq!(rows, vec![1, 2]);
        assert!(pagination.next_href.is_none());
    }
}
