//! In-process stand-in for the remote service, shared by unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::api::{ ByteStream, PageQuery, PerfApi };
use crate::error::ApiError;
use crate::models::chat::{ ChatHistory, StreamRequest };
use crate::models::feed::{ FeedItem, FeedPage };
use crate::models::preferences::ScentProfile;
use crate::models::thread::{ ChatThread, ChatThreadInput, ThreadPage };

pub fn token_frame(content: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({ "type": "token", "content": content }))
}

pub fn chunked(chunks: &[&str]) -> ByteStream {
    let items: Vec<Result<Bytes, ApiError>> = chunks
        .iter()
        .map(|c| Ok(Bytes::from(c.to_string())))
        .collect();
    Box::pin(futures::stream::iter(items))
}

fn server_error(route: &str) -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        url: format!("http://fake{}", route),
    }
}

#[derive(Default)]
pub struct FakeApi {
    streams: Mutex<VecDeque<ByteStream>>,
    stream_requests: Mutex<Vec<StreamRequest>>,
    history: Mutex<Option<String>>,
    history_requests: Mutex<Vec<String>>,
    created_threads: Mutex<Vec<String>>,
    fail_thread_creation: Mutex<bool>,
    thread_pages: Mutex<VecDeque<Option<String>>>,
    thread_queries: Mutex<Vec<PageQuery>>,
    feed_pages: Mutex<VecDeque<Option<String>>>,
    feed_queries: Mutex<Vec<PageQuery>>,
    generate_calls: Mutex<usize>,
    profile: Mutex<Option<ScentProfile>>,
    fail_profile_save: Mutex<bool>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stream(&self, stream: ByteStream) {
        self.streams.lock().unwrap().push_back(stream);
    }

    pub fn push_channel(&self, rx: UnboundedReceiver<Result<Bytes, ApiError>>) {
        self.push_stream(Box::pin(UnboundedReceiverStream::new(rx)));
    }

    pub fn stream_requests(&self) -> Vec<StreamRequest> {
        self.stream_requests.lock().unwrap().clone()
    }

    pub fn set_history(&self, json: &str) {
        *self.history.lock().unwrap() = Some(json.to_string());
    }

    pub fn history_requests(&self) -> Vec<String> {
        self.history_requests.lock().unwrap().clone()
    }

    pub fn created_threads(&self) -> Vec<String> {
        self.created_threads.lock().unwrap().clone()
    }

    pub fn fail_thread_creation(&self) {
        *self.fail_thread_creation.lock().unwrap() = true;
    }

    /// Queues one page response; `None` makes that request fail.
    pub fn push_thread_page(&self, json: Option<&str>) {
        self.thread_pages.lock().unwrap().push_back(json.map(str::to_string));
    }

    pub fn thread_queries(&self) -> Vec<PageQuery> {
        self.thread_queries.lock().unwrap().clone()
    }

    pub fn push_feed_page(&self, json: Option<&str>) {
        self.feed_pages.lock().unwrap().push_back(json.map(str::to_string));
    }

    pub fn feed_queries(&self) -> Vec<PageQuery> {
        self.feed_queries.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        *self.generate_calls.lock().unwrap()
    }

    pub fn saved_profile(&self) -> Option<ScentProfile> {
        self.profile.lock().unwrap().clone()
    }

    pub fn fail_profile_save(&self) {
        *self.fail_profile_save.lock().unwrap() = true;
    }
}

#[async_trait]
impl PerfApi for FakeApi {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ApiError> {
        self.stream_requests.lock().unwrap().push(request.clone());
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| server_error("/agentic-rag-alfa/stream"))
    }

    async fn create_thread(&self, input: &ChatThreadInput) -> Result<ChatThread, ApiError> {
        if *self.fail_thread_creation.lock().unwrap() {
            return Err(server_error("/threads"));
        }
        self.created_threads.lock().unwrap().push(input.thread_id.clone());
        Ok(ChatThread {
            thread_id: input.thread_id.clone(),
            user_id: input.user_id.clone(),
            summary: input.summary.clone(),
            create_time: None,
        })
    }

    async fn history(&self, thread_id: &str) -> Result<ChatHistory, ApiError> {
        self.history_requests.lock().unwrap().push(thread_id.to_string());
        let json = self.history.lock().unwrap().clone();
        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(server_error("/history")),
        }
    }

    async fn list_threads(&self, _user_id: &str, query: &PageQuery) -> Result<ThreadPage, ApiError> {
        self.thread_queries.lock().unwrap().push(query.clone());
        match self.thread_pages.lock().unwrap().pop_front().flatten() {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(server_error("/threads")),
        }
    }

    async fn list_feed(&self, query: &PageQuery) -> Result<FeedPage, ApiError> {
        self.feed_queries.lock().unwrap().push(query.clone());
        match self.feed_pages.lock().unwrap().pop_front().flatten() {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(server_error("/feed")),
        }
    }

    async fn feed_item(&self, id: &str) -> Result<FeedItem, ApiError> {
        Err(server_error(&format!("/feed/{}", id)))
    }

    async fn generate_feed(&self) -> Result<(), ApiError> {
        *self.generate_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn save_scent_profile(&self, _user_id: &str, profile: &ScentProfile) -> Result<(), ApiError> {
        if *self.fail_profile_save.lock().unwrap() {
            return Err(server_error("/user/scent-profile"));
        }
        *self.profile.lock().unwrap() = Some(profile.clone());
        Ok(())
    }

    async fn scent_profile(&self, _user_id: &str) -> Result<Option<ScentProfile>, ApiError> {
        Ok(self.profile.lock().unwrap().clone())
    }
}
