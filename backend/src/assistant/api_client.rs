//! Assistant API client
//!
//! HTTP client for the upstream assistant service (threads, messages, runs).
//! Every call is independently failable and reports the upstream status and
//! body on failure.

use crate::assistant::types::{
    CreateMessageRequest, CreateRunRequest, RunObject, ThreadObject,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of a single upstream call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("upstream status {}: {body}", .status.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string()))]
pub struct UpstreamError {
    /// HTTP status, `None` for transport failures
    pub status: Option<u16>,
    /// Response body or transport error message
    pub body: String,
}

impl UpstreamError {
    /// Non-success HTTP response
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
        }
    }

    /// Transport failure (connection refused, timeout, ...)
    pub fn transport(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }

    /// The request could not be addressed; nothing was sent
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: message.into(),
        }
    }

    /// Response body was not the expected JSON
    pub fn decode(status: u16, err: serde_json::Error, body: &str) -> Self {
        Self {
            status: Some(status),
            body: format!("Failed to parse JSON response: {} - Response body: {}", err, body),
        }
    }
}

/// Operations of the upstream assistant service
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create an empty thread and return its identifier
    async fn create_thread(&self) -> Result<String, UpstreamError>;

    /// Append a user message to a thread
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), UpstreamError>;

    /// Start a run of `assistant_id` on a thread
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunObject, UpstreamError>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, UpstreamError>;

    /// List messages of a thread, newest first, optionally only those of one run
    ///
    /// The payload is returned as raw JSON for the answer extractor.
    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Value, UpstreamError>;
}

/// `AssistantApi` over authenticated HTTPS
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client sharing the given connection pool
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of `segments` below the base URL
    ///
    /// Each segment is percent-encoded as exactly one path segment, so ids
    /// received from the widget cannot address another endpoint.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(UpstreamError::invalid_request(format!(
                "Invalid path segment: {:?}",
                bad
            )));
        }

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            UpstreamError::invalid_request(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                UpstreamError::invalid_request(format!("Base URL cannot have a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, UpstreamError> {
        let url = self.endpoint(segments)?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2"))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, UpstreamError> {
        tracing::debug!(operation, "Calling assistant API");

        let response = builder.send().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Assistant API request failed");
            UpstreamError::transport(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(UpstreamError::transport)?;

        if !status.is_success() {
            tracing::error!(
                operation,
                status_code = status.as_u16(),
                error_body = %body,
                "Assistant API returned error status"
            );
            return Err(UpstreamError::http(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::decode(status.as_u16(), e, &body))
    }
}

#[async_trait]
impl AssistantApi for OpenAiClient {
    async fn create_thread(&self) -> Result<String, UpstreamError> {
        let builder = self.request(Method::POST, &["threads"])?.json(&json!({}));
        let thread: ThreadObject = self.send("create_thread", builder).await?;
        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), UpstreamError> {
        let builder = self
            .request(Method::POST, &["threads", thread_id, "messages"])?
            .json(&CreateMessageRequest {
                role: "user",
                content,
            });
        let _: Value = self.send("add_message", builder).await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunObject, UpstreamError> {
        let builder = self
            .request(Method::POST, &["threads", thread_id, "runs"])?
            .json(&CreateRunRequest { assistant_id });
        self.send("create_run", builder).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, UpstreamError> {
        let builder = self.request(Method::GET, &["threads", thread_id, "runs", run_id])?;
        self.send("get_run", builder).await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let mut builder = self
            .request(Method::GET, &["threads", thread_id, "messages"])?
            .query(&[("order", "desc"), ("limit", "20")]);
        if let Some(run_id) = run_id {
            builder = builder.query(&[("run_id", run_id)]);
        }
        self.send("list_messages", builder).await
    }
}
