//! Request and response types for the MaLLaM chat completions endpoint.
//!
//! The request body mirrors the OpenAI Chat Completions shape with the
//! router's fixed stop list. The response types accept any JSON object and
//! keep whatever does not fit the expected shape, so re-serializing a
//! response yields exactly what the server sent.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::errors::InferenceError;

// ─── Defaults ────────────────────────────────────────────────────────────────

/// Maximum generated tokens when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 256;

/// Sampling temperature when the caller does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.9;

/// Nucleus sampling threshold when the caller does not set one.
pub const DEFAULT_TOP_P: f64 = 0.95;

/// Candidate-count cap when the caller does not set one.
pub const DEFAULT_TOP_K: u32 = 50;

/// Streaming flag when the caller does not set one.
pub const DEFAULT_STREAM: bool = false;

/// Stop sequences sent with every request (Mistral instruction markers).
pub const STOP_SEQUENCES: [&str; 3] = ["[/INST]", "[INST]", "<s>"];

// ─── Model ───────────────────────────────────────────────────────────────────

/// The models served by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    #[default]
    MallamSmall,
    MallamTiny,
}

impl Model {
    /// The wire name of the model.
    pub fn as_str(self) -> &'static str {
        match self {
            Model::MallamSmall => "mallam-small",
            Model::MallamTiny => "mallam-tiny",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mallam-small" => Ok(Model::MallamSmall),
            "mallam-tiny" => Ok(Model::MallamTiny),
            other => Err(InferenceError::ConfigError {
                reason: format!(
                    "unknown model '{other}' (expected 'mallam-small' or 'mallam-tiny')"
                ),
            }),
        }
    }
}

// ─── Request Types ───────────────────────────────────────────────────────────

/// Message role. Requests only ever carry the prompt as a `user` turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// A single message in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// A `user` message carrying `content` verbatim.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request body for `POST /chat/completions`.
///
/// Field order matches the order the router documents. `tools` is always
/// present and always `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: Model,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Option<serde_json::Value>,
    pub stream: bool,
}

/// Per-call options for [`MallamClient::chat_completions`](super::MallamClient::chat_completions).
///
/// Only `prompt` is required. Unset fields are replaced by the `DEFAULT_*`
/// constants when the request is built, so one call's overrides never leak
/// into another.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionOptions {
    /// The text to complete.
    pub prompt: String,
    /// Cap on generated tokens.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold in `[0, 1]`.
    pub top_p: Option<f64>,
    /// Number of highest-probability candidates kept.
    pub top_k: Option<u32>,
    /// Ask the server to stream. The body is still read as one JSON document.
    pub stream: Option<bool>,
}

impl CompletionOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Resolve defaults and build the request body for `model`.
    pub fn into_request(self, model: Model) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model,
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: self.top_p.unwrap_or(DEFAULT_TOP_P),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            messages: vec![ChatMessage::user(self.prompt)],
            tools: None,
            stream: self.stream.unwrap_or(DEFAULT_STREAM),
        }
    }
}

impl From<&str> for CompletionOptions {
    fn from(prompt: &str) -> Self {
        Self::new(prompt)
    }
}

impl From<String> for CompletionOptions {
    fn from(prompt: String) -> Self {
        Self::new(prompt)
    }
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// A JSON object as sent by the server.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Move `key` out of `fields` if it holds a non-null value of type `T`.
///
/// Nulls and values of another type stay in `fields`, so they are written
/// back out unchanged.
fn take_field<T: DeserializeOwned>(fields: &mut JsonObject, key: &str) -> Option<T> {
    let value = fields.get(key).filter(|v| !v.is_null())?;
    let parsed = T::deserialize(value).ok()?;
    fields.remove(key);
    Some(parsed)
}

/// Response body of a chat completion.
///
/// Parsing never rejects a JSON object. Each known field is filled only when
/// the server sent it with the expected type; everything else (unknown keys,
/// `null`s, mistyped values) is kept in `extra`. Serializing the value
/// reproduces the object the server sent, at every nesting level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JsonObject")]
pub struct ChatCompletionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Unix timestamp. Integer or float, whichever the server sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl From<JsonObject> for ChatCompletionResponse {
    fn from(mut fields: JsonObject) -> Self {
        Self {
            id: take_field(&mut fields, "id"),
            object: take_field(&mut fields, "object"),
            created: take_field(&mut fields, "created"),
            model: take_field(&mut fields, "model"),
            choices: take_field(&mut fields, "choices"),
            usage: take_field(&mut fields, "usage"),
            extra: fields,
        }
    }
}

impl ChatCompletionResponse {
    /// The completion candidates, empty if the server sent none.
    pub fn choices(&self) -> &[Choice] {
        self.choices.as_deref().unwrap_or_default()
    }

    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices().first()?.message.as_ref()?.content.as_deref()
    }
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JsonObject")]
pub struct Choice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ResponseMessage>,
    /// `null` from this endpoint, in which case it lives in `extra`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl From<JsonObject> for Choice {
    fn from(mut fields: JsonObject) -> Self {
        Self {
            index: take_field(&mut fields, "index"),
            message: take_field(&mut fields, "message"),
            logprobs: take_field(&mut fields, "logprobs"),
            finish_reason: take_field(&mut fields, "finish_reason"),
            extra: fields,
        }
    }
}

/// The generated message. `role` is kept as sent by the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JsonObject")]
pub struct ResponseMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl From<JsonObject> for ResponseMessage {
    fn from(mut fields: JsonObject) -> Self {
        Self {
            role: take_field(&mut fields, "role"),
            content: take_field(&mut fields, "content"),
            extra: fields,
        }
    }
}

/// Token accounting for the call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JsonObject")]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl From<JsonObject> for Usage {
    fn from(mut fields: JsonObject) -> Self {
        Self {
            prompt_tokens: take_field(&mut fields, "prompt_tokens"),
            total_tokens: take_field(&mut fields, "total_tokens"),
            completion_tokens: take_field(&mut fields, "completion_tokens"),
            extra: fields,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
