use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };

/// Body of `POST /threads`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatThreadInput {
    pub thread_id: String,
    pub user_id: String,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatThread {
    pub thread_id: String,
    pub user_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(
        rename = "createTime",
        default,
        deserialize_with = "super::lenient_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ThreadPage {
    #[serde(default)]
    pub threads: Vec<ChatThread>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
}
