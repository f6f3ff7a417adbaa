use async_trait::async_trait;
use log::{ error, info };
use std::sync::{ Arc, Mutex, MutexGuard };

use crate::api::PerfApi;
use crate::error::ApiError;
use crate::models::thread::{ ChatThread, ChatThreadInput };
use crate::pager::{ OnError, Page, Pager, VisibilityTrigger };
use crate::session::ThreadObserver;

/// The user's past conversations, newest first, loaded page by page.
pub struct ThreadDirectory {
    api: Arc<dyn PerfApi>,
    user_id: String,
    pager: Mutex<Pager<ChatThread>>,
}

impl ThreadDirectory {
    pub fn new(api: Arc<dyn PerfApi>, user_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            pager: Mutex::new(Pager::new(page_size, OnError::KeepPaging)),
        }
    }

    /// Loads the next page, or the first page of a new search. Returns how
    /// many threads arrived; `Ok(0)` when the call was a no-op.
    pub async fn load_threads(&self, new_search: bool, query: Option<&str>) -> Result<usize, ApiError> {
        let request = match self.pager().begin(new_search, query) {
            Some(request) => request,
            None => return Ok(0),
        };
        let result = self.api
            .list_threads(&self.user_id, &request).await
            .map(|page| Page { items: page.threads, has_more: page.has_more });
        self.pager().finish(&request, result)
    }

    /// Records a thread on the server and refreshes the list so it shows up.
    pub async fn register(&self, thread_id: &str, summary: &str) -> Result<ChatThread, ApiError> {
        let input = ChatThreadInput {
            thread_id: thread_id.to_string(),
            user_id: self.user_id.clone(),
            summary: summary.to_string(),
        };
        let thread = self.api.create_thread(&input).await?;
        info!("Thread {} registered as '{}'", thread.thread_id, thread.summary);

        if let Err(e) = self.load_threads(true, None).await {
            error!("Failed to refresh threads after registering {}: {}", thread_id, e);
        }
        Ok(thread)
    }

    pub fn threads(&self) -> Vec<ChatThread> {
        self.pager().items().to_vec()
    }

    pub fn has_more(&self) -> bool {
        self.pager().has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.pager().is_loading()
    }

    pub fn current_query(&self) -> String {
        self.pager().query().to_string()
    }

    fn pager(&self) -> MutexGuard<'_, Pager<ChatThread>> {
        self.pager.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ThreadObserver for ThreadDirectory {
    async fn thread_started(&self, thread_id: &str, first_message: &str) {
        if let Err(e) = self.register(thread_id, first_message).await {
            error!("Failed to register thread {}: {}", thread_id, e);
        }
    }
}

#[async_trait]
impl VisibilityTrigger for ThreadDirectory {
    async fn on_visible(&self) {
        // Failures are already logged by the pager.
        let _ = self.load_threads(false, None).await;
    }
}
