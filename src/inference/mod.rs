//! MaLLaM inference client.
//!
//! - `client`: [`MallamClient`], one chat completion per call
//! - `types`: request body, per-call options with defaults, response shape
//! - `transport`: the HTTP seam (`reqwest` by default, swappable in tests)
//! - `config`: YAML client configuration with env-var interpolation
//! - `errors`: [`InferenceError`]

pub mod client;
pub mod config;
pub mod errors;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{ClientOptions, MallamClient, CHAT_COMPLETIONS_URL};
pub use config::{load_client_config, parse_client_config, ClientConfig};
pub use errors::InferenceError;
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, CompletionOptions, JsonObject,
    Model, ResponseMessage, Role, Usage,
};
