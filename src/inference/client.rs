//! MaLLaM chat completions client.
//!
//! Sends one chat completion request to the Mesolitica LLM router and
//! returns the parsed response body.

use std::fmt;
use std::sync::Arc;

use super::config::ClientConfig;
use super::errors::InferenceError;
use super::transport::{HttpTransport, Transport};
use super::types::{ChatCompletionResponse, CompletionOptions, Model};

// ─── Constants ───────────────────────────────────────────────────────────────

/// The router endpoint every request is sent to.
pub const CHAT_COMPLETIONS_URL: &str = "https://llm-router.nous.mesolitica.com/chat/completions";

// ─── MallamClient ────────────────────────────────────────────────────────────

/// Construction options for [`MallamClient`].
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// API token sent as `Authorization: Bearer <token>`. Not validated.
    pub token: String,
    /// Defaults to `mallam-small`.
    pub model: Option<Model>,
}

impl ClientOptions {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            model: None,
        }
    }

    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("token", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl From<ClientConfig> for ClientOptions {
    fn from(config: ClientConfig) -> Self {
        Self {
            token: config.token,
            model: config.model,
        }
    }
}

/// Client for the MaLLaM chat completions endpoint.
///
/// Immutable after construction. Cloning is cheap and clones share the
/// underlying transport, so one client can serve concurrent calls.
#[derive(Clone)]
pub struct MallamClient {
    token: Arc<str>,
    model: Model,
    transport: Arc<dyn Transport>,
}

impl MallamClient {
    /// Create a client backed by a default `reqwest` transport.
    ///
    /// Performs no I/O and accepts any token, including an empty one.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_transport(options, Arc::new(HttpTransport::new()))
    }

    /// Create a client that sends requests through `transport`.
    pub fn with_transport(options: ClientOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            token: Arc::from(options.token),
            model: options.model.unwrap_or_default(),
            transport,
        }
    }

    /// Create a client from a loaded [`ClientConfig`].
    pub fn from_config(config: ClientConfig) -> Self {
        Self::new(config.into())
    }

    /// The model every request from this client names.
    pub fn model(&self) -> Model {
        self.model
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &'static str {
        CHAT_COMPLETIONS_URL
    }

    // ─── Chat Completion ─────────────────────────────────────────────────

    /// Send a chat completion request for `options.prompt`.
    ///
    /// Unset sampling options are filled with their defaults for this call
    /// only. The whole response body is read and parsed as a single JSON
    /// document, even when `stream` is requested.
    ///
    /// A non-2xx status is not an error: the body is parsed and returned like
    /// any other. Errors are returned only when the request cannot be sent,
    /// the body cannot be read, or the body is not a JSON object. Fields that
    /// are null, mistyped or unknown are kept in the response's `extra` maps.
    pub async fn chat_completions(
        &self,
        options: impl Into<CompletionOptions>,
    ) -> Result<ChatCompletionResponse, InferenceError> {
        let options = options.into();
        let prompt_chars = options.prompt.chars().count();
        let body = options.into_request(self.model);

        // Request metadata only; the token and prompt text stay out of logs.
        tracing::debug!(
            url = CHAT_COMPLETIONS_URL,
            model = %body.model,
            prompt_chars,
            max_tokens = body.max_tokens,
            temperature = body.temperature,
            top_p = body.top_p,
            top_k = body.top_k,
            stream = body.stream,
            "sending chat completion request"
        );

        let response = self
            .transport
            .post_json(CHAT_COMPLETIONS_URL, &self.token, &body)
            .await?;

        if !response.is_success() {
            tracing::warn!(
                status = response.status,
                body_len = response.body.len(),
                "chat completion returned non-success status; parsing body anyway"
            );
        }

        let parsed = parse_response(&response.body)?;

        tracing::debug!(
            status = response.status,
            id = ?parsed.id,
            choices = parsed.choices().len(),
            total_tokens = ?parsed.usage.as_ref().and_then(|u| u.total_tokens),
            "chat completion received"
        );

        Ok(parsed)
    }
}

impl fmt::Debug for MallamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MallamClient")
            .field("token", &"<redacted>")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Parse a response body. Any JSON object is accepted.
fn parse_response(body: &str) -> Result<ChatCompletionResponse, InferenceError> {
    serde_json::from_str(body).map_err(|e| InferenceError::InvalidResponse {
        reason: e.to_string(),
        body: body.to_string(),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::transport::TransportResponse;
    use crate::inference::types::ChatCompletionRequest;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    const SAMPLE_RESPONSE: &str = r#"{"id":"x","object":"o","created":1,"model":"mallam-small","choices":[{"index":0,"message":{"role":"assistant","content":"hi"},"logprobs":null,"finish_reason":"stop"}],"usage":{"prompt_tokens":1,"total_tokens":2,"completion_tokens":1}}"#;

    #[derive(Debug, Clone)]
    struct RecordedRequest {
        url: String,
        token: String,
        body: serde_json::Value,
    }

    /// In-memory transport that records requests and replays a canned reply.
    struct RecordingTransport {
        reply: Result<TransportResponse, fn() -> InferenceError>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl RecordingTransport {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(TransportResponse {
                    status,
                    body: body.to_string(),
                }),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: fn() -> InferenceError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn post_json(
            &self,
            url: &str,
            token: &str,
            body: &ChatCompletionRequest,
        ) -> Result<TransportResponse, InferenceError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url: url.to_string(),
                token: token.to_string(),
                body: serde_json::to_value(body).unwrap(),
            });
            // Yield so concurrent calls interleave.
            tokio::task::yield_now().await;
            match &self.reply {
                Ok(resp) => Ok(resp.clone()),
                Err(make_err) => Err(make_err()),
            }
        }
    }

    fn client_with(options: ClientOptions, transport: &Arc<RecordingTransport>) -> MallamClient {
        MallamClient::with_transport(options, transport.clone())
    }

    #[test]
    fn test_model_defaults_to_small() {
        let client = MallamClient::new(ClientOptions::new("t"));
        assert_eq!(client.model(), Model::MallamSmall);
        assert_eq!(client.endpoint(), CHAT_COMPLETIONS_URL);

        let tiny = MallamClient::new(ClientOptions::new("t").model(Model::MallamTiny));
        assert_eq!(tiny.model(), Model::MallamTiny);
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = MallamClient::new(ClientOptions::new("super-secret"));
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("MallamSmall"));
        assert!(!format!("{:?}", ClientOptions::new("super-secret")).contains("super-secret"));
    }

    #[test]
    fn test_from_config() {
        let client = MallamClient::from_config(ClientConfig {
            token: "t".into(),
            model: Some(Model::MallamTiny),
        });
        assert_eq!(client.model(), Model::MallamTiny);
    }

    #[tokio::test]
    async fn test_request_uses_defaults_and_fixed_fields() {
        let transport = RecordingTransport::replying(200, SAMPLE_RESPONSE);
        let client = client_with(ClientOptions::new("tok"), &transport);

        client.chat_completions("Apa itu nasi lemak?").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, CHAT_COMPLETIONS_URL);
        assert_eq!(
            requests[0].body,
            json!({
                "model": "mallam-small",
                "temperature": 0.9,
                "top_p": 0.95,
                "top_k": 50,
                "max_tokens": 256,
                "stop": ["[/INST]", "[INST]", "<s>"],
                "messages": [{ "role": "user", "content": "Apa itu nasi lemak?" }],
                "tools": null,
                "stream": false
            })
        );
    }

    #[tokio::test]
    async fn test_overrides_do_not_leak_between_calls() {
        let transport = RecordingTransport::replying(200, SAMPLE_RESPONSE);
        let client = client_with(ClientOptions::new("tok").model(Model::MallamTiny), &transport);

        client
            .chat_completions(
                CompletionOptions::new("first")
                    .max_tokens(10)
                    .temperature(0.2)
                    .top_p(0.3)
                    .top_k(4)
                    .stream(true),
            )
            .await
            .unwrap();
        client.chat_completions("second").await.unwrap();

        let requests = transport.requests();
        let first = &requests[0].body;
        assert_eq!(first["model"], "mallam-tiny");
        assert_eq!(first["max_tokens"], 10);
        assert_eq!(first["temperature"], 0.2);
        assert_eq!(first["top_p"], 0.3);
        assert_eq!(first["top_k"], 4);
        assert_eq!(first["stream"], true);

        let second = &requests[1].body;
        assert_eq!(second["model"], "mallam-tiny");
        assert_eq!(second["max_tokens"], 256);
        assert_eq!(second["temperature"], 0.9);
        assert_eq!(second["top_p"], 0.95);
        assert_eq!(second["top_k"], 50);
        assert_eq!(second["stream"], false);
    }

    #[tokio::test]
    async fn test_token_passed_verbatim_including_empty() {
        for token in ["abc.def-123", "", "with space"] {
            let transport = RecordingTransport::replying(200, SAMPLE_RESPONSE);
            let client = client_with(ClientOptions::new(token), &transport);
            client.chat_completions("hi").await.unwrap();
            assert_eq!(transport.requests()[0].token, token);
        }
    }

    #[tokio::test]
    async fn test_response_returned_unmodified() {
        let transport = RecordingTransport::replying(200, SAMPLE_RESPONSE);
        let client = client_with(ClientOptions::new("tok"), &transport);

        let resp = client.chat_completions("hi").await.unwrap();
        assert_eq!(resp.id.as_deref(), Some("x"));
        assert_eq!(resp.first_content(), Some("hi"));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::from_str::<serde_json::Value>(SAMPLE_RESPONSE).unwrap()
        );
    }

    #[tokio::test]
    async fn test_non_success_status_body_still_returned() {
        let transport = RecordingTransport::replying(401, r#"{"detail":"Not authenticated"}"#);
        let client = client_with(ClientOptions::new("bad"), &transport);

        let resp = client.chat_completions("hi").await.unwrap();
        assert!(resp.choices().is_empty());
        assert_eq!(resp.extra["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_mismatched_shape_returned_as_is() {
        let body = r#"{"id":"x","created":1716883200.5,"usage":null,"choices":[{"index":0,"message":{"role":"assistant","content":null,"tool_calls":[]},"finish_reason":null,"stop_reason":7}]}"#;
        let transport = RecordingTransport::replying(200, body);
        let client = client_with(ClientOptions::new("tok"), &transport);

        let resp = client.chat_completions("hi").await.unwrap();
        assert!(resp.first_content().is_none());
        assert!(resp.usage.is_none());
        assert_eq!(resp.choices()[0].extra["stop_reason"], 7);
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::from_str::<serde_json::Value>(body).unwrap()
        );
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let transport = RecordingTransport::failing(|| InferenceError::ConnectionFailed {
            endpoint: CHAT_COMPLETIONS_URL.into(),
            reason: "dns error: failed to lookup address".into(),
        });
        let client = client_with(ClientOptions::new("tok"), &transport);

        let err = client.chat_completions("hi").await.unwrap_err();
        assert!(err.is_transport_error());
        assert_eq!(transport.requests().len(), 1, "no retry expected");
    }

    #[tokio::test]
    async fn test_non_json_body_propagates() {
        let transport = RecordingTransport::replying(502, "<html>Bad Gateway</html>");
        let client = client_with(ClientOptions::new("tok"), &transport);

        let err = client.chat_completions("hi").await.unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse { .. }));
        assert_eq!(err.response_body(), Some("<html>Bad Gateway</html>"));
    }

    #[tokio::test]
    async fn test_streamed_body_is_not_parsed_incrementally() {
        let sse = "data: {\"id\":\"a\"}\n\ndata: [DONE]\n\n";
        let transport = RecordingTransport::replying(200, sse);
        let client = client_with(ClientOptions::new("tok"), &transport);

        let err = client
            .chat_completions(CompletionOptions::new("hi").stream(true))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse { .. }));
        assert_eq!(transport.requests()[0].body["stream"], true);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let transport = RecordingTransport::replying(200, SAMPLE_RESPONSE);
        let client = client_with(ClientOptions::new("tok"), &transport);

        let (a, b) = futures::future::join(
            client.chat_completions(CompletionOptions::new("prompt A").top_k(1)),
            client.chat_completions(CompletionOptions::new("prompt B")),
        )
        .await;
        a.unwrap();
        b.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        let a = requests
            .iter()
            .find(|r| r.body["messages"][0]["content"] == "prompt A")
            .unwrap();
        let b = requests
            .iter()
            .find(|r| r.body["messages"][0]["content"] == "prompt B")
            .unwrap();
        assert_eq!(a.body["top_k"], 1);
        assert_eq!(b.body["top_k"], 50);
        assert_eq!(a.body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(b.body["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_is_shareable_across_tasks() {
        let transport = RecordingTransport::replying(200, SAMPLE_RESPONSE);
        let client = client_with(ClientOptions::new("tok"), &transport);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move { client.chat_completions(format!("prompt {i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut prompts: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| r.body["messages"][0]["content"].as_str().unwrap().to_string())
            .collect();
        prompts.sort();
        assert_eq!(prompts, ["prompt 0", "prompt 1", "prompt 2", "prompt 3"]);
    }
}
