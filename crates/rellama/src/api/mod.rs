//! HTTP client for the Ollama-compatible backend.
//!
//! Non-streaming calls carry a 20 second timeout. Streaming calls (generate,
//! chat, pull) only bound connection establishment: generation length is
//! unbounded by design, so the body read has no deadline.

pub mod types;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{RellamaError, Result};
use crate::stream::JsonLines;
pub use types::*;

/// Deadline for calls that return a single JSON document.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Client handle over a backend base URL (normalized to end with `api/`).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RellamaError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// List models available on the backend.
    pub async fn tags(&self) -> Result<ModelList> {
        self.get_json("tags").await
    }

    /// List models currently loaded into memory on the backend.
    pub async fn ps(&self) -> Result<ModelList> {
        self.get_json("ps").await
    }

    /// Backend server version.
    pub async fn version(&self) -> Result<VersionInfo> {
        self.get_json("version").await
    }

    /// Detailed information for one model.
    pub async fn show(&self, model: &str) -> Result<ShowResponse> {
        let response = self
            .client
            .post(self.endpoint("show"))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response, model).await?;
        response
            .json()
            .await
            .map_err(|e| RellamaError::Serialization(format!("Failed to decode response: {e}")))
    }

    /// Remove a model from the backend.
    pub async fn delete(&self, model: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint("delete"))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response, model).await.map(|_| ())
    }

    /// Start a generation; the response is a record stream ending with a
    /// `done: true` chunk.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<JsonLines<GenerateChunk>> {
        self.post_stream("generate", request, &request.model).await
    }

    /// Start a multi-turn chat completion over the full message history.
    pub async fn chat(&self, request: &ChatRequest) -> Result<JsonLines<ChatChunk>> {
        self.post_stream("chat", request, &request.model).await
    }

    /// Pull a model onto the backend; the response streams progress records.
    pub async fn pull(&self, model: &str) -> Result<JsonLines<PullProgress>> {
        self.post_stream("pull", &serde_json::json!({ "model": model }), model)
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T> {
        let response = self
            .client
            .get(self.endpoint(route))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response, route).await?;
        response
            .json()
            .await
            .map_err(|e| RellamaError::Serialization(format!("Failed to decode response: {e}")))
    }

    async fn post_stream<B: Serialize, T: DeserializeOwned>(
        &self,
        route: &str,
        body: &B,
        subject: &str,
    ) -> Result<JsonLines<T>> {
        tracing::debug!(route, "Opening backend stream");

        let response = self
            .client
            .post(self.endpoint(route))
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response, subject).await?;
        Ok(JsonLines::from_response(response))
    }
}

/// Map reqwest send failures onto the transport error taxonomy.
fn map_send_error(e: reqwest::Error) -> RellamaError {
    if e.is_timeout() {
        RellamaError::Network(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        RellamaError::Network(format!("Failed to connect to backend: {e}"))
    } else {
        RellamaError::Network(format!("Request failed: {e}"))
    }
}

/// Reject non-2xx responses; 404 is the distinguished "not found" case so
/// callers can react to an absent model instead of a generic failure.
async fn check_status(response: reqwest::Response, subject: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(RellamaError::NotFound(format!("'{subject}'")));
    }

    let body = response.text().await.unwrap_or_default();
    Err(RellamaError::Network(format!(
        "Backend returned {status}: {body}"
    )))
}
