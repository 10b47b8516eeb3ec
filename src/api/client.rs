use super::error::ApiError;
use super::identity::{HostIdentity, FALLBACK_USER_ID};
use super::types::{
    AiStatus, AiStatusResponse, Channel, ChannelList, ChatReply, FeedPage, ItemId, Post, PostList,
    SuggestionList, TopicList,
};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default backend location (development server of the Mini App).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Backend endpoint paths, relative to the base URL.
pub mod endpoints {
    pub const FEED: &str = "feed/my";
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const SEARCH: &str = "search";
    pub const CHANNELS: &str = "channels";
    pub const CHANNELS_ADD: &str = "channels/add";
    pub const CHANNELS_REMOVE: &str = "channels/remove";
    pub const TOPICS_GET: &str = "topics/get";
    pub const TOPICS_SAVE: &str = "topics/save";
    pub const LIKE: &str = "like";
    pub const AI_STATUS: &str = "ai/status";
    pub const AI_CHAT: &str = "ai/chat";
    pub const AI_SUGGESTIONS: &str = "ai/suggestions";
}

/// Construction parameters for [`ApiClient`].
#[derive(Debug)]
pub struct ClientOptions {
    pub base_url: String,
    pub identity: HostIdentity,
    pub fallback_user_id: i64,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            identity: HostIdentity::Absent,
            fallback_user_id: FALLBACK_USER_ID,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// JSON-over-HTTP client for the Telepulse backend.
///
/// Cheap to clone: the connection pool and identity are shared. Every request
/// carries a `user_id` resolved at call time. There is no retry and no caching
/// here; callers decide what to do with failures.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    identity: Arc<HostIdentity>,
    fallback_user_id: i64,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        // PERF-019: pooled client with keepalive, the backend is hit on every interaction
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(3))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(concat!("telepulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(
            base_url = %options.base_url,
            identity = ?options.identity,
            "API client configured"
        );

        Ok(Self {
            http,
            base_url: Arc::from(options.base_url.trim_end_matches('/')),
            identity: Arc::new(options.identity),
            fallback_user_id: options.fallback_user_id,
            timeout: options.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The id that will be attached to the next request.
    pub fn user_id(&self) -> i64 {
        self.identity.resolve(self.fallback_user_id)
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// POST `payload` to `endpoint` with the caller's `user_id` merged in.
    ///
    /// `payload` must serialize to a JSON object (or unit for no fields).
    /// Fields in `payload` take precedence over the injected `user_id`.
    pub async fn send<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        payload: &P,
    ) -> Result<Value, ApiError> {
        let user_id = self.user_id();
        let body = with_user_id(serde_json::to_value(payload)?, user_id)?;
        let url = self.endpoint_url(endpoint);

        tracing::debug!(endpoint, user_id, "Sending API request");

        let request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&body)?);

        self.execute(endpoint, request).await
    }

    /// GET `endpoint` without a body (used for the AI readiness probe).
    pub async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint);
        tracing::trace!(endpoint, "Sending API probe");
        self.execute(endpoint, self.http.get(&url)).await
    }

    async fn execute(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ApiError> {
        let outcome = tokio::time::timeout(self.timeout, async {
            let response = request.send().await?;

            if !response.status().is_success() {
                return Err(ApiError::HttpStatus(response.status().as_u16()));
            }

            let bytes = read_limited_body(response, MAX_RESPONSE_SIZE).await?;
            Ok::<Value, ApiError>(serde_json::from_slice(&bytes)?)
        })
        .await
        .map_err(|_| ApiError::Timeout(self.timeout))?;

        if let Err(e) = &outcome {
            tracing::warn!(endpoint, error = %e, "API request failed");
        }
        outcome
    }

    async fn call<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        payload: &P,
    ) -> Result<T, ApiError> {
        decode_envelope(self.send(endpoint, payload).await?)
    }

    // ========================================================================
    // Typed endpoints
    // ========================================================================

    pub async fn feed_page(&self, page: u32, limit: u32) -> Result<FeedPage, ApiError> {
        self.call(endpoints::FEED, &json!({ "page": page, "limit": limit }))
            .await
    }

    pub async fn recommendations(&self, limit: u32) -> Result<Vec<Post>, ApiError> {
        let list: PostList = self
            .call(endpoints::RECOMMENDATIONS, &json!({ "limit": limit }))
            .await?;
        Ok(list.posts)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Post>, ApiError> {
        let list: PostList = self
            .call(endpoints::SEARCH, &json!({ "query": query }))
            .await?;
        Ok(list.posts)
    }

    pub async fn channels(&self) -> Result<Vec<Channel>, ApiError> {
        let list: ChannelList = self.call(endpoints::CHANNELS, &()).await?;
        Ok(list.channels)
    }

    /// Response shape is backend-defined; returned as-is after the success check.
    pub async fn add_channel(&self, identifier: &str) -> Result<Value, ApiError> {
        self.call(endpoints::CHANNELS_ADD, &json!({ "channel": identifier }))
            .await
    }

    pub async fn remove_channel(&self, channel_id: &ItemId) -> Result<(), ApiError> {
        let value = self
            .send(endpoints::CHANNELS_REMOVE, &json!({ "channel_id": channel_id }))
            .await?;
        check_success(&value)
    }

    pub async fn topics(&self) -> Result<Vec<String>, ApiError> {
        let list: TopicList = self.call(endpoints::TOPICS_GET, &()).await?;
        Ok(list.topics)
    }

    pub async fn save_topics(&self, topics: &[String]) -> Result<(), ApiError> {
        let value = self
            .send(endpoints::TOPICS_SAVE, &json!({ "topics": topics }))
            .await?;
        check_success(&value)
    }

    pub async fn like(&self, post_url: &str) -> Result<(), ApiError> {
        let value = self
            .send(endpoints::LIKE, &json!({ "post_url": post_url }))
            .await?;
        check_success(&value)
    }

    pub async fn ai_status(&self) -> Result<AiStatus, ApiError> {
        let response: AiStatusResponse = decode_envelope(self.get(endpoints::AI_STATUS).await?)?;
        Ok(response.status)
    }

    pub async fn ai_chat(&self, message: &str) -> Result<String, ApiError> {
        let reply: ChatReply = self
            .call(endpoints::AI_CHAT, &json!({ "message": message }))
            .await?;
        Ok(reply.response)
    }

    pub async fn ai_suggestions(&self) -> Result<Vec<String>, ApiError> {
        let list: SuggestionList = self.call(endpoints::AI_SUGGESTIONS, &()).await?;
        Ok(list.suggestions)
    }
}

/// Merge `user_id` into a JSON object payload. Explicit payload fields win.
fn with_user_id(payload: Value, user_id: i64) -> Result<Value, ApiError> {
    let mut merged = Map::new();
    merged.insert("user_id".to_string(), Value::from(user_id));
    match payload {
        Value::Null => {}
        Value::Object(fields) => merged.extend(fields),
        other => {
            return Err(ApiError::Validation(format!(
                "Request payload must be a JSON object, got {}",
                other
            )))
        }
    }
    Ok(Value::Object(merged))
}

/// `success: false` becomes [`ApiError::Rejected`]; a missing flag counts as success.
fn check_success(value: &Value) -> Result<(), ApiError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(ApiError::Rejected(message));
    }
    Ok(())
}

fn decode_envelope<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    check_success(&value)?;
    Ok(serde_json::from_value(value)?)
}

async fn read_limited_body(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        // SEC-003: saturating_add so a hostile length cannot wrap the check
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientOptions::new(server.uri())).unwrap()
    }

    #[test]
    fn test_with_user_id_merges_fields() {
        let merged = with_user_id(json!({"page": 2}), 5).unwrap();
        assert_eq!(merged, json!({"user_id": 5, "page": 2}));
    }

    #[test]
    fn test_with_user_id_payload_wins() {
        let merged = with_user_id(json!({"user_id": 9}), 5).unwrap();
        assert_eq!(merged["user_id"], 9);
    }

    #[test]
    fn test_with_user_id_unit_payload() {
        assert_eq!(with_user_id(Value::Null, 1).unwrap(), json!({"user_id": 1}));
    }

    #[test]
    fn test_with_user_id_rejects_non_object() {
        let err = with_user_id(json!([1, 2]), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_check_success_prefers_message_then_error() {
        let err = check_success(&json!({"success": false, "error": "boom"})).unwrap_err();
        assert_eq!(err.server_message(), Some("boom"));
        assert!(check_success(&json!({"posts": []})).is_ok());
    }

    #[tokio::test]
    async fn test_send_injects_fallback_user_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/feed/my"))
            .and(body_partial_json(json!({"user_id": 12345, "page": 1, "limit": 20})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "posts": [], "hasMore": false})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server).feed_page(1, 20).await.unwrap();
        assert!(page.posts.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_send_uses_host_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels"))
            .and(body_partial_json(json!({"user_id": 42})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "channels": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut options = ClientOptions::new(server.uri());
        options.identity = HostIdentity::Fixed(42);
        let client = ApiClient::new(options).unwrap();
        assert!(client.channels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).search("rust").await.unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(500)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).search("rust").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_rejection_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/remove"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "message": "Not subscribed"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .remove_channel(&ItemId::Int(3))
            .await
            .unwrap_err();
        assert_eq!(err.server_message(), Some("Not subscribed"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut options = ClientOptions::new(server.uri());
        options.timeout = Duration::from_millis(50);
        let client = ApiClient::new(options).unwrap();

        let err = client.like("https://t.me/a/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_ai_status_is_get_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ai/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "status": {"is_loaded": false, "loading": true, "load_progress": 40}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let status = client_for(&server).ai_status().await.unwrap();
        assert!(status.loading);
        assert!(!status.is_loaded);
        assert_eq!(status.load_progress, 40.0);
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/topics/get"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "topics": ["tech", "news"]})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(ClientOptions::new(format!("{}/", server.uri()))).unwrap();
        assert_eq!(client.topics().await.unwrap(), vec!["tech", "news"]);
    }
}
