//! HTTP transport seam.
//!
//! The client never touches `reqwest` directly; it hands the request body to a
//! [`Transport`], which lets tests substitute an in-memory implementation.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;

use super::errors::InferenceError;
use super::types::ChatCompletionRequest;

/// Status and fully-read body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one JSON POST and returns the whole response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` with `Authorization: Bearer {token}`.
    ///
    /// Must not treat non-2xx statuses as errors; only failures to send the
    /// request or read the body are errors.
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &ChatCompletionRequest,
    ) -> Result<TransportResponse, InferenceError>;
}

/// `reqwest`-backed transport. No timeout and no retries are configured.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest::Client` (proxies, custom TLS roots).
    pub fn with_client(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &ChatCompletionRequest,
    ) -> Result<TransportResponse, InferenceError> {
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| InferenceError::BodyReadFailed {
            reason: e.to_string(),
        })?;

        Ok(TransportResponse { status, body })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
