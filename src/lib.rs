//! Client library for the Malaysia AI MaLLaM models served by the Mesolitica
//! LLM router.
//!
//! ```no_run
//! use malaysia_ai::{ClientOptions, CompletionOptions, MallamClient, Model};
//!
//! # async fn run() -> Result<(), malaysia_ai::InferenceError> {
//! let client = MallamClient::new(ClientOptions::new("my-token").model(Model::MallamTiny));
//! let resp = client
//!     .chat_completions(CompletionOptions::new("Apa khabar?").max_tokens(64))
//!     .await?;
//! println!("{}", resp.first_content().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! The library emits `tracing` events but never installs a subscriber.

pub mod inference;

pub use inference::{
    ChatCompletionResponse, ClientConfig, ClientOptions, CompletionOptions, InferenceError,
    MallamClient, Model,
};
