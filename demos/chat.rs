//! Send one prompt to MaLLaM and print the reply.
//!
//! ```text
//! MALLAM_TOKEN=... cargo run --example chat -- mallam.yaml "Apa itu rendang?"
//! ```
//!
//! The config file follows `malaysia_ai::inference::config`:
//!
//! ```yaml
//! token: ${MALLAM_TOKEN}
//! model: mallam-small
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use malaysia_ai::inference::load_client_config;
use malaysia_ai::{CompletionOptions, MallamClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("malaysia_ai=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(prompt)) = (args.next(), args.next()) else {
        bail!("usage: chat <config.yaml> <prompt>");
    };

    let config = load_client_config(&PathBuf::from(&config_path))
        .with_context(|| format!("loading {config_path}"))?;
    let client = MallamClient::from_config(config);

    tracing::info!(model = %client.model(), "=== MaLLaM chat ===");

    let resp = client
        .chat_completions(CompletionOptions::new(prompt))
        .await
        .context("chat completion failed")?;

    match resp.first_content() {
        Some(content) => println!("{content}"),
        None => println!("{}", serde_json::to_string_pretty(&resp)?),
    }

    Ok(())
}
