use async_trait::async_trait;
use log::info;
use std::sync::{ Arc, Mutex, MutexGuard };

use crate::api::PerfApi;
use crate::error::ApiError;
use crate::models::feed::FeedItem;
use crate::pager::{ OnError, Page, Pager, VisibilityTrigger };

/// News-style articles, newest first. A failed page ends paging until the
/// next new search.
pub struct FeedBrowser {
    api: Arc<dyn PerfApi>,
    pager: Mutex<Pager<FeedItem>>,
}

impl FeedBrowser {
    pub fn new(api: Arc<dyn PerfApi>, page_size: u32) -> Self {
        Self {
            api,
            pager: Mutex::new(Pager::new(page_size, OnError::StopPaging)),
        }
    }

    /// A new search always sends `query`, treating `None` as no filter.
    pub async fn load_feed(&self, new_search: bool, query: Option<&str>) -> Result<usize, ApiError> {
        let query = if new_search { Some(query.unwrap_or("")) } else { None };
        let request = match self.pager().begin(new_search, query) {
            Some(request) => request,
            None => return Ok(0),
        };
        let result = self.api
            .list_feed(&request).await
            .map(|page| Page { items: page.items, has_more: page.has_more });
        self.pager().finish(&request, result)
    }

    pub async fn item(&self, id: &str) -> Result<FeedItem, ApiError> {
        self.api.feed_item(id).await
    }

    pub async fn generate(&self) -> Result<(), ApiError> {
        info!("Requesting more feed items");
        self.api.generate_feed().await
    }

    pub fn items(&self) -> Vec<FeedItem> {
        self.pager().items().to_vec()
    }

    pub fn has_more(&self) -> bool {
        self.pager().has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.pager().is_loading()
    }

    fn pager(&self) -> MutexGuard<'_, Pager<FeedItem>> {
        self.pager.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl VisibilityTrigger for FeedBrowser {
    async fn on_visible(&self) {
        let _ = self.load_feed(false, None).await;
    }
}
