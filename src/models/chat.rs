use serde::{ Serialize, Deserialize };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self { role: Role::Human, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Body of `POST /agentic-rag-alfa/stream`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamRequest {
    pub message: String,
    pub model: String,
    pub thread_id: String,
    pub stream_tokens: bool,
    pub user_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryRequest {
    pub thread_id: String,
}

/// A message as the history endpoint returns it. The backend names the role
/// field `type`, older payloads use `role`; any role string is accepted here
/// and filtered later.
#[derive(Clone, Debug, Deserialize)]
pub struct HistoryRecord {
    #[serde(alias = "type")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl HistoryRecord {
    pub fn into_message(self) -> Option<ChatMessage> {
        if self.content.is_empty() {
            return None;
        }
        let role = match self.role.as_str() {
            "human" => Role::Human,
            "assistant" => Role::Assistant,
            _ => return None,
        };
        Some(ChatMessage { role, content: self.content })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatHistory {
    #[serde(default)]
    pub messages: Vec<HistoryRecord>,
}

impl ChatHistory {
    /// Keeps human and assistant turns with content, in the order received.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages.into_iter().filter_map(HistoryRecord::into_message).collect()
    }
}
