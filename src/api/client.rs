use crate::api::types::{AskRequest, AskResponse, QuizRequest};
use crate::api::{
    ApiError, NewNode, Node, NodeId, NodeUpdate, Quiz, QuizEvaluation, QuizResult, QuizSubmission,
};
use crate::config::Config;
use crate::util::validate_base_url;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Tree responses are small; anything bigger is a misbehaving server.
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Longest server error message carried into `ApiError::HttpStatus`.
const MAX_ERROR_MESSAGE_LEN: usize = 200;

const TREE_PATH: [&str; 2] = ["api", "knowledge-tree"];

// ============================================================================
// TreeApi Trait
// ============================================================================

/// The knowledge-tree operations the client model depends on.
///
/// Implemented by [`HttpClient`] for the real service and by
/// [`MemoryApi`](crate::api::MemoryApi) for offline use.
#[async_trait]
pub trait TreeApi: Send + Sync {
    /// Top-level nodes in display order.
    async fn roots(&self) -> Result<Vec<Node>, ApiError>;

    /// Direct children of `parent` in display order.
    async fn children(&self, parent: NodeId) -> Result<Vec<Node>, ApiError>;

    /// Nodes whose name or description matches `query`.
    async fn search(&self, query: &str) -> Result<Vec<Node>, ApiError>;

    async fn node(&self, id: NodeId) -> Result<Node, ApiError>;

    async fn create(&self, node: &NewNode) -> Result<Node, ApiError>;

    async fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Node, ApiError>;

    async fn delete(&self, id: NodeId) -> Result<(), ApiError>;

    /// Ask the server to generate child topics for `node`.
    ///
    /// Resolves once the server has stored the new children.
    async fn populate(&self, node: &Node) -> Result<(), ApiError>;
}

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Create a custom redirect policy with loop detection and limited hops.
///
/// - Limits redirects to 3 hops maximum
/// - Detects redirect loops (same URL appearing twice in chain)
/// - Logs redirect chain for debugging
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// reqwest-backed client for the knowledge-tree service and its quiz, history
/// and ask endpoints.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base: Url,
    request_timeout: Duration,
    slow_timeout: Duration,
}

impl HttpClient {
    /// Build a client for the service at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: &str, config: &Config) -> Result<Self, ApiError> {
        let base = validate_base_url(base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.populate_timeout().max(config.request_timeout()))
            .build()?;

        tracing::info!(base_url = %base, "Configured knowledge-tree API client");

        Ok(Self {
            client,
            base,
            request_timeout: config.request_timeout(),
            slow_timeout: config.populate_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint<I, S>(&self, segments: I) -> Result<Url, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn tree_endpoint(&self, rest: &[&str]) -> Result<Url, ApiError> {
        self.endpoint(TREE_PATH.iter().chain(rest.iter()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).header(ACCEPT, "application/json")
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<RequestBuilder, ApiError> {
        let bytes = serde_json::to_vec(body)?;
        Ok(self
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .body(bytes))
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(&self, request: RequestBuilder, timeout: Duration) -> Result<Vec<u8>, ApiError> {
        let response = tokio::time::timeout(timeout, request.timeout(timeout).send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = read_limited_bytes(response, MAX_RESPONSE_SIZE)
                .await
                .unwrap_or_default();
            let message = error_message(&body);
            tracing::debug!(status = status.as_u16(), message = %message, "Request failed");
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let bytes = self.send(request, timeout).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ------------------------------------------------------------------------
    // Quiz, history and ask endpoints
    // ------------------------------------------------------------------------

    /// Generate a multiple-choice quiz on `topic`.
    pub async fn generate_quiz(&self, topic: &str) -> Result<Quiz, ApiError> {
        let url = self.endpoint(["api", "evaluate", "generate-quiz"])?;
        let request = self.json_request(Method::POST, url, &QuizRequest { topic })?;
        self.send_json(request, self.slow_timeout).await
    }

    /// Submit answers and get the graded result.
    pub async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizEvaluation, ApiError> {
        let url = self.endpoint(["api", "evaluate", "submit-quiz"])?;
        let request = self.json_request(Method::POST, url, submission)?;
        self.send_json(request, self.slow_timeout).await
    }

    /// All quiz results, newest first as the server orders them.
    pub async fn history(&self) -> Result<Vec<QuizResult>, ApiError> {
        let url = self.endpoint(["api", "evaluate", "history"])?;
        self.send_json(self.request(Method::GET, url), self.request_timeout)
            .await
    }

    pub async fn history_for(&self, topic: &str) -> Result<Vec<QuizResult>, ApiError> {
        let url = self.endpoint(["api", "evaluate", "history", topic])?;
        self.send_json(self.request(Method::GET, url), self.request_timeout)
            .await
    }

    /// Ask a free-form question and return the answer text.
    pub async fn ask(&self, question: &str) -> Result<String, ApiError> {
        let url = self.endpoint(["api", "chatgpt", "ask"])?;
        let request = self.json_request(Method::POST, url, &AskRequest { question })?;
        let response: AskResponse = self.send_json(request, self.slow_timeout).await?;
        Ok(response.answer)
    }
}

#[async_trait]
impl TreeApi for HttpClient {
    async fn roots(&self) -> Result<Vec<Node>, ApiError> {
        let url = self.tree_endpoint(&["roots"])?;
        self.send_json(self.request(Method::GET, url), self.request_timeout)
            .await
    }

    async fn children(&self, parent: NodeId) -> Result<Vec<Node>, ApiError> {
        let url = self.tree_endpoint(&["children", &parent.to_string()])?;
        self.send_json(self.request(Method::GET, url), self.request_timeout)
            .await
    }

    async fn search(&self, query: &str) -> Result<Vec<Node>, ApiError> {
        let mut url = self.tree_endpoint(&["search"])?;
        url.query_pairs_mut().append_pair("query", query);
        self.send_json(self.request(Method::GET, url), self.request_timeout)
            .await
    }

    async fn node(&self, id: NodeId) -> Result<Node, ApiError> {
        let url = self.tree_endpoint(&[&id.to_string()])?;
        self.send_json(self.request(Method::GET, url), self.request_timeout)
            .await
    }

    async fn create(&self, node: &NewNode) -> Result<Node, ApiError> {
        let url = self.tree_endpoint(&[])?;
        let request = self.json_request(Method::POST, url, node)?;
        self.send_json(request, self.request_timeout).await
    }

    async fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Node, ApiError> {
        let url = self.tree_endpoint(&[&id.to_string()])?;
        let request = self.json_request(Method::PUT, url, update)?;
        self.send_json(request, self.request_timeout).await
    }

    async fn delete(&self, id: NodeId) -> Result<(), ApiError> {
        let url = self.tree_endpoint(&[&id.to_string()])?;
        self.send(self.request(Method::DELETE, url), self.request_timeout)
            .await
            .map(|_| ())
    }

    async fn populate(&self, node: &Node) -> Result<(), ApiError> {
        let url = self.endpoint(["api", "chatgpt", "populate", node.name.as_str()])?;
        tracing::info!(node_id = %node.id, name = %node.name, "Requesting AI population");
        self.send(self.request(Method::POST, url), self.slow_timeout)
            .await
            .map(|_| ())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"message": ...}`, `{"error": ...}` or plain text.
fn error_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(text) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                if !msg.trim().is_empty() {
                    return truncate_message(msg.trim());
                }
            }
        }
        return String::new();
    }

    truncate_message(text)
}

fn truncate_message(msg: &str) -> String {
    match msg.char_indices().nth(MAX_ERROR_MESSAGE_LEN) {
        Some((idx, _)) => format!("{}...", &msg[..idx]),
        None => msg.to_string(),
    }
}

/// Read a response body, failing once it exceeds `limit` bytes.
async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: Content-Length already says too big
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
