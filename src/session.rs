//! Conversation state for the active thread and the streaming request that
//! grows the last assistant message.
//!
//! All mutation happens inside [`StreamingChatSession`]; observers read
//! [`SessionSnapshot`]s published on a watch channel after every change.

use async_trait::async_trait;
use futures::future::{ AbortHandle, Abortable };
use futures::StreamExt;
use log::{ debug, error, info, warn };
use std::sync::{ Arc, Mutex, MutexGuard };
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::PerfApi;
use crate::error::ChatError;
use crate::models::chat::{ ChatMessage, StreamRequest };
use crate::sse::{ SseDecoder, SseItem, StreamEvent };
use crate::store::ThreadStore;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub model: String,
    pub user_id: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub is_loading: bool,
    pub thread_id: Option<String>,
}

#[derive(Debug)]
pub enum StreamOutcome {
    /// The server sent `[DONE]`.
    Completed,
    /// The body ended without the sentinel.
    Ended,
    Cancelled,
    Failed(ChatError),
}

/// Told when a submit had to start a brand new thread.
#[async_trait]
pub trait ThreadObserver: Send + Sync {
    async fn thread_started(&self, thread_id: &str, first_message: &str);
}

struct ActiveStream {
    id: u64,
    /// Index of the assistant placeholder this stream writes into.
    target: usize,
    abort: AbortHandle,
}

#[derive(Default)]
struct SessionState {
    messages: Vec<ChatMessage>,
    input: String,
    thread_id: Option<String>,
    active: Option<ActiveStream>,
    next_stream_id: u64,
    /// Bumped whenever the log is reset, so a slow history fetch cannot
    /// overwrite a newer conversation.
    epoch: u64,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            input: self.input.clone(),
            is_loading: self.active.is_some(),
            thread_id: self.thread_id.clone(),
        }
    }

    fn cancel_active(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.abort.abort();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    api: Arc<dyn PerfApi>,
    store: Arc<dyn ThreadStore>,
    observer: Option<Arc<dyn ThreadObserver>>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

#[derive(Clone)]
pub struct StreamingChatSession {
    inner: Arc<Inner>,
}

impl StreamingChatSession {
    pub fn new(api: Arc<dyn PerfApi>, store: Arc<dyn ThreadStore>, config: SessionConfig) -> Self {
        Self::build(api, store, None, config)
    }

    pub fn with_observer(
        api: Arc<dyn PerfApi>,
        store: Arc<dyn ThreadStore>,
        observer: Arc<dyn ThreadObserver>,
        config: SessionConfig
    ) -> Self {
        Self::build(api, store, Some(observer), config)
    }

    fn build(
        api: Arc<dyn PerfApi>,
        store: Arc<dyn ThreadStore>,
        observer: Option<Arc<dyn ThreadObserver>>,
        config: SessionConfig
    ) -> Self {
        let thread_id = match store.current() {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not read the current thread: {}", e);
                None
            }
        };
        let state = SessionState { thread_id, ..SessionState::default() };
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Inner {
                api,
                store,
                observer,
                config,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state().active.is_some()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        let mut state = self.state();
        state.input = text.into();
        self.publish(&state);
    }

    /// Sends the draft input and clears it.
    pub async fn submit_input(&self) -> Result<StreamOutcome, ChatError> {
        let text = {
            let mut state = self.state();
            let text = std::mem::take(&mut state.input);
            self.publish(&state);
            text
        };
        self.submit(&text).await
    }

    /// Sends `text` and streams the reply into a new assistant message.
    ///
    /// A stream that is still open is cancelled first. Transport failures are
    /// logged and reported as [`StreamOutcome::Failed`]; whatever was received
    /// stays in the log. Only empty text is an `Err`.
    pub async fn submit(&self, text: &str) -> Result<StreamOutcome, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        {
            let mut state = self.state();
            if state.cancel_active() {
                warn!("Cancelling the open stream to send a new message");
            }
            state.epoch += 1;
            state.messages.push(ChatMessage::human(text));
            self.publish(&state);
        }

        let (thread_id, fresh) = self.resolve_thread();

        let (abort, registration) = AbortHandle::new_pair();
        let stream_id = {
            let mut state = self.state();
            state.thread_id = Some(thread_id.clone());
            if state.cancel_active() {
                warn!("Another message was sent meanwhile; cancelling its stream");
            }
            state.messages.push(ChatMessage::assistant(""));
            let id = state.next_stream_id;
            let target = state.messages.len() - 1;
            state.next_stream_id += 1;
            state.active = Some(ActiveStream { id, target, abort });
            self.publish(&state);
            id
        };

        if fresh {
            self.notify_thread_started(&thread_id, text);
        }

        let request = StreamRequest {
            message: text.to_string(),
            model: self.inner.config.model.clone(),
            thread_id,
            stream_tokens: true,
            user_id: self.inner.config.user_id.clone(),
        };

        let outcome = match Abortable::new(self.read_stream(stream_id, &request), registration).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("Chat stream failed: {}", e);
                StreamOutcome::Failed(e)
            }
            Err(_aborted) => StreamOutcome::Cancelled,
        };

        self.finish(stream_id);
        debug!("Stream {} finished: {:?}", stream_id, outcome);
        Ok(outcome)
    }

    /// Aborts the open stream, if any.
    pub fn cancel(&self) {
        let mut state = self.state();
        if state.cancel_active() {
            info!("Chat stream cancelled");
            self.publish(&state);
        }
    }

    /// Replaces the log with the stored conversation of `thread_id`. On
    /// failure the log stays empty.
    pub async fn load_history(&self, thread_id: &str) -> Result<usize, ChatError> {
        let epoch = {
            let mut state = self.state();
            state.cancel_active();
            state.messages.clear();
            state.epoch += 1;
            self.publish(&state);
            state.epoch
        };

        let history = match self.inner.api.history(thread_id).await {
            Ok(history) => history,
            Err(e) => {
                error!("Failed to load history for thread {}: {}", thread_id, e);
                return Err(ChatError::HistoryFetch(e));
            }
        };
        let messages = history.into_messages();
        let count = messages.len();

        let mut state = self.state();
        if state.epoch != epoch {
            warn!("Discarding history of thread {}: conversation changed meanwhile", thread_id);
            return Ok(0);
        }
        state.messages = messages;
        self.publish(&state);
        info!("Loaded {} messages for thread {}", count, thread_id);
        Ok(count)
    }

    /// Makes `thread_id` the current thread and loads its messages.
    pub async fn switch_thread(&self, thread_id: &str) -> Result<usize, ChatError> {
        self.inner.store.set(thread_id)?;
        {
            let mut state = self.state();
            state.thread_id = Some(thread_id.to_string());
            self.publish(&state);
        }
        self.load_history(thread_id).await
    }

    /// Leaves the current thread; the next submit starts a new one.
    pub fn new_thread(&self) -> Result<(), ChatError> {
        self.inner.store.clear()?;
        let mut state = self.state();
        state.cancel_active();
        state.thread_id = None;
        state.messages.clear();
        state.epoch += 1;
        self.publish(&state);
        Ok(())
    }

    async fn read_stream(&self, stream_id: u64, request: &StreamRequest) -> Result<StreamOutcome, ChatError> {
        let mut body = self.inner.api.open_stream(request).await.map_err(ChatError::Connection)?;
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(ChatError::Connection)?;
            decoder.push(&chunk);

            while let Some(item) = decoder.next_item() {
                match item {
                    SseItem::Done => {
                        drop(body);
                        return Ok(StreamOutcome::Completed);
                    }
                    SseItem::Event(StreamEvent::Token { content }) => {
                        if !self.append_token(stream_id, &content) {
                            return Ok(StreamOutcome::Cancelled);
                        }
                    }
                    SseItem::Event(StreamEvent::Error { content }) => {
                        warn!("Agent reported an error: {}", content);
                    }
                    SseItem::Event(StreamEvent::Message { .. }) => {
                        debug!("Ignoring intermediate message on stream {}", stream_id);
                    }
                }
            }
        }

        if !decoder.remainder().is_empty() {
            debug!("Stream {} ended with an unterminated frame", stream_id);
        }
        Ok(StreamOutcome::Ended)
    }

    /// Returns false when the stream is no longer the active one.
    fn append_token(&self, stream_id: u64, token: &str) -> bool {
        let mut state = self.state();
        let target = match &state.active {
            Some(active) if active.id == stream_id => active.target,
            _ => return false,
        };
        match state.messages.get_mut(target) {
            Some(message) => message.content.push_str(token),
            None => return false,
        }
        self.publish(&state);
        true
    }

    fn finish(&self, stream_id: u64) {
        let mut state = self.state();
        let owned = state.active.as_ref().map(|a| a.id) == Some(stream_id);
        if owned {
            state.active = None;
        }
        let published = self.inner.updates.borrow().is_loading;
        if owned || published != state.active.is_some() {
            self.publish(&state);
        }
    }

    /// Current thread from the store, falling back to the in-memory id when
    /// the store cannot be read. Generates and persists one when neither
    /// exists. The flag is true for a new thread.
    fn resolve_thread(&self) -> (String, bool) {
        let stored = match self.inner.store.current() {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not read the current thread: {}", e);
                self.state().thread_id.clone()
            }
        };
        if let Some(id) = stored {
            return (id, false);
        }

        let id = Uuid::new_v4().to_string();
        if let Err(e) = self.inner.store.set(&id) {
            error!("Failed to persist new thread {}: {}", id, e);
        }
        info!("Started thread {}", id);
        (id, true)
    }

    fn notify_thread_started(&self, thread_id: &str, first_message: &str) {
        if let Some(observer) = self.inner.observer.clone() {
            let thread_id = thread_id.to_string();
            let summary = first_message.to_string();
            tokio::spawn(async move {
                observer.thread_started(&thread_id, &summary).await;
            });
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &SessionState) {
        self.inner.updates.send_replace(state.snapshot());
    }
}
