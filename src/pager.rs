//! Page-accumulating list state shared by the thread directory and the feed.
//!
//! A load is split in two halves, [`Pager::begin`] and [`Pager::finish`], so the
//! owner can release its lock while the request is in flight. A load that
//! starts while another is running is refused.

use async_trait::async_trait;
use log::error;

use crate::api::PageQuery;
use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnError {
    /// Leave `has_more` alone so the next trigger retries.
    KeepPaging,
    StopPaging,
}

#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

/// Something that can ask for the next page when the end of a list scrolls
/// into view.
#[async_trait]
pub trait VisibilityTrigger: Send + Sync {
    async fn on_visible(&self);
}

#[derive(Debug)]
pub struct Pager<T> {
    items: Vec<T>,
    page: u32,
    limit: u32,
    has_more: bool,
    loading: bool,
    query: String,
    on_error: OnError,
}

impl<T> Pager<T> {
    pub fn new(limit: u32, on_error: OnError) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            limit,
            has_more: true,
            loading: false,
            query: String::new(),
            on_error,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Starts a load and returns the request to make, or `None` when a load is
    /// already running or there is nothing more to fetch. A new search clears
    /// the list and restarts at page 1; `query` of `None` keeps the current one.
    pub fn begin(&mut self, new_search: bool, query: Option<&str>) -> Option<PageQuery> {
        if self.loading || (!new_search && !self.has_more) {
            return None;
        }
        self.loading = true;

        if new_search {
            self.items.clear();
            self.page = 1;
            if let Some(q) = query {
                self.query = q.to_string();
            }
        }

        Some(PageQuery {
            page: self.page,
            limit: self.limit,
            query: self.query.clone(),
        })
    }

    /// Completes the load started by `begin`. Returns how many items arrived.
    pub fn finish(&mut self, request: &PageQuery, result: Result<Page<T>, ApiError>) -> Result<usize, ApiError> {
        self.loading = false;
        match result {
            Ok(page) => {
                let added = page.items.len();
                self.items.extend(page.items);
                self.has_more = page.has_more;
                self.page = request.page + 1;
                Ok(added)
            }
            Err(e) => {
                error!("Failed to load page {} (q={:?}): {}", request.page, request.query, e);
                if self.on_error == OnError::StopPaging {
                    self.has_more = false;
                }
                Err(e)
            }
        }
    }
}
