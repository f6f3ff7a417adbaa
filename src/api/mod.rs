pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::ApiError;
use crate::models::chat::{ ChatHistory, StreamRequest };
use crate::models::feed::{ FeedItem, FeedPage };
use crate::models::preferences::ScentProfile;
use crate::models::thread::{ ChatThread, ChatThreadInput, ThreadPage };

pub use self::http::HttpApi;

/// Raw response body of the chat stream, chunked however the transport
/// delivers it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
    pub query: String,
}

/// The remote fragrance service. Everything the client knows about the world
/// goes through here.
#[async_trait]
pub trait PerfApi: Send + Sync {
    /// Opens `POST /agentic-rag-alfa/stream`. Resolves once headers are in;
    /// a non-success status is an error.
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ApiError>;

    async fn create_thread(&self, input: &ChatThreadInput) -> Result<ChatThread, ApiError>;

    async fn history(&self, thread_id: &str) -> Result<ChatHistory, ApiError>;

    async fn list_threads(&self, user_id: &str, query: &PageQuery) -> Result<ThreadPage, ApiError>;

    async fn list_feed(&self, query: &PageQuery) -> Result<FeedPage, ApiError>;

    async fn feed_item(&self, id: &str) -> Result<FeedItem, ApiError>;

    /// Asks the service to write more feed articles in the background.
    async fn generate_feed(&self) -> Result<(), ApiError>;

    async fn save_scent_profile(&self, user_id: &str, profile: &ScentProfile) -> Result<(), ApiError>;

    /// `Ok(None)` when the user has not taken the quiz yet.
    async fn scent_profile(&self, user_id: &str) -> Result<Option<ScentProfile>, ApiError>;
}
