use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, info };
use reqwest::{ Client as HttpClient, Response, StatusCode, header::{ HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE } };
use url::Url;

use super::{ ByteStream, PageQuery, PerfApi };
use crate::error::ApiError;
use crate::models::chat::{ ChatHistory, HistoryRequest, StreamRequest };
use crate::models::feed::{ FeedItem, FeedPage };
use crate::models::preferences::{ ScentProfile, ScentProfileResponse };
use crate::models::thread::{ ChatThread, ChatThreadInput, ThreadPage };

const STREAM_ROUTE: &str = "/agentic-rag-alfa/stream";

pub struct HttpApi {
    http: HttpClient,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }
}

fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ApiError::Status {
            status,
            url: resp.url().to_string(),
        })
    }
}

fn page_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    vec![
        ("page", query.page.to_string()),
        ("limit", query.limit.to_string()),
        ("q", query.query.clone())
    ]
}

#[async_trait]
impl PerfApi for HttpApi {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ApiError> {
        let url = self.url(STREAM_ROUTE);
        debug!("Opening chat stream for thread {}", request.thread_id);

        let resp = self.http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send().await?;
        let resp = check_status(resp)?;

        let body = resp.bytes_stream().map(|chunk| chunk.map_err(ApiError::from));
        Ok(Box::pin(body))
    }

    async fn create_thread(&self, input: &ChatThreadInput) -> Result<ChatThread, ApiError> {
        let resp = self.http.post(self.url("/threads")).json(input).send().await?;
        let thread = check_status(resp)?.json::<ChatThread>().await?;
        info!("Registered thread {} ({})", thread.thread_id, thread.summary);
        Ok(thread)
    }

    async fn history(&self, thread_id: &str) -> Result<ChatHistory, ApiError> {
        let body = HistoryRequest { thread_id: thread_id.to_string() };
        let resp = self.http.post(self.url("/history")).json(&body).send().await?;
        Ok(check_status(resp)?.json::<ChatHistory>().await?)
    }

    async fn list_threads(&self, user_id: &str, query: &PageQuery) -> Result<ThreadPage, ApiError> {
        let mut params = page_params(query);
        params.push(("user_id", user_id.to_string()));
        debug!("Listing threads: {:?}", params);

        let resp = self.http.get(self.url("/threads")).query(&params).send().await?;
        Ok(check_status(resp)?.json::<ThreadPage>().await?)
    }

    async fn list_feed(&self, query: &PageQuery) -> Result<FeedPage, ApiError> {
        let params = page_params(query);
        debug!("Listing feed: {:?}", params);

        let resp = self.http.get(self.url("/feed")).query(&params).send().await?;
        Ok(check_status(resp)?.json::<FeedPage>().await?)
    }

    async fn feed_item(&self, id: &str) -> Result<FeedItem, ApiError> {
        let resp = self.http.get(self.url(&format!("/feed/{}", id))).send().await?;
        Ok(check_status(resp)?.json::<FeedItem>().await?)
    }

    async fn generate_feed(&self) -> Result<(), ApiError> {
        let resp = self.http.post(self.url("/feed/generate")).send().await?;
        check_status(resp)?;
        Ok(())
    }

    async fn save_scent_profile(&self, user_id: &str, profile: &ScentProfile) -> Result<(), ApiError> {
        let url = self.url(&format!("/user/{}/scent-profile", user_id));
        let resp = self.http.post(url).json(profile).send().await?;
        check_status(resp)?;
        Ok(())
    }

    async fn scent_profile(&self, user_id: &str) -> Result<Option<ScentProfile>, ApiError> {
        let url = self.url(&format!("/user/{}/scent-profile", user_id));
        let resp = self.http.get(url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = check_status(resp)?.json::<ScentProfileResponse>().await?;
        Ok(body.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_validated_and_normalized() {
        let api = HttpApi::new("http://localhost:8088/").unwrap();
        assert_eq!(api.url("/threads"), "http://localhost:8088/threads");
        assert!(matches!(HttpApi::new("not a url"), Err(ApiError::Url(_))));
    }

    #[test]
    fn page_params_include_empty_query() {
        let params = page_params(&PageQuery { page: 2, limit: 20, query: String::new() });
        assert_eq!(
            params,
            vec![("page", "2".to_string()), ("limit", "20".to_string()), ("q", String::new())]
        );
    }
}
