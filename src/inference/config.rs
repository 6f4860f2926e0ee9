//! Client configuration loading.
//!
//! Reads a small YAML file holding the API token and model choice, resolving
//! `${VAR}` / `${VAR:-default}` references from the environment so the token
//! does not have to live in the file itself:
//!
//! ```yaml
//! token: ${MALLAM_TOKEN}
//! model: mallam-tiny
//! ```
//!
//! The endpoint URL is fixed and cannot be configured here.

use std::path::Path;

use serde::Deserialize;

use super::errors::InferenceError;
use super::types::Model;

// ─── Public Types ────────────────────────────────────────────────────────────

/// Credentials and model selection for a [`MallamClient`](super::MallamClient).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub token: String,
    /// Defaults to `mallam-small` when absent.
    #[serde(default)]
    pub model: Option<Model>,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Load and parse a client configuration file.
pub fn load_client_config(path: &Path) -> Result<ClientConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_client_config(&raw)
}

/// Parse a client configuration from YAML text, interpolating env vars first.
pub fn parse_client_config(raw: &str) -> Result<ClientConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw)?;

    serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to parse config: {e}"),
    })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Expand every `${VAR}` / `${VAR:-default}` in `input`.
///
/// A `${` without a closing `}` is an error rather than silently eating the
/// rest of the file.
fn interpolate_env_vars(input: &str) -> Result<String, InferenceError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open.find('}').ok_or_else(|| {
            let name = after_open.lines().next().unwrap_or_default();
            InferenceError::ConfigError {
                reason: format!("unterminated variable reference '${{{name}'"),
            }
        })?;
        out.push_str(&lookup_var(&after_open[..close]));
        rest = &after_open[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// `VAR` or `VAR:-default`. Unset without a default expands to `""`.
fn lookup_var(expr: &str) -> String {
    let (name, default) = match expr.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (expr, None),
    };
    match std::env::var(name) {
        Ok(value) => value,
        Err(_) => default.unwrap_or_default().to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
