//! Provider‑agnostic LLM integration for partscout.
//!
//! This crate exposes a common [`traits::LlmClient`] interface and concrete
//! provider implementations for OpenAI-compatible chat completions and
//! Ollama. [`ensure_llm_ready`] builds a client from a
//! [`partscout_common::LlmConfig`].
//!
//! # Examples
//! ```no_run
//! use partscout_common::{LlmConfig, Result};
//! use partscout_llm::ensure_llm_ready;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::default();
//! let client = ensure_llm_ready(&cfg, Some("sk-...")).await?;
//! assert_eq!(client.model_name(), "gpt-3.5-turbo");
//! # Ok(())
//! # }
//! ```
pub mod ollama;
pub mod openai;
pub mod traits;

use ollama::OllamaClient;
use openai::OpenAiClient;
use partscout_common::{LlmConfig, ScoutError};
use std::sync::Arc;
use traits::LlmClient;

/// Build a ready-to-use client for `config`.
///
/// `api_key_override` (the key carried by a scrape job) takes precedence over
/// any key in the configuration. Ollama clients are checked and the model is
/// pulled if missing; OpenAI clients are constructed without a network call.
pub async fn ensure_llm_ready(
    config: &LlmConfig,
    api_key_override: Option<&str>,
) -> partscout_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        LlmConfig::Openai {
            api_key,
            model,
            endpoint,
            max_tokens,
        } => {
            let key = api_key_override
                .map(str::to_string)
                .or_else(|| api_key.clone())
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ScoutError::Config("OpenAI API key is required".to_string()))?;
            let client = OpenAiClient::new(key, model.clone(), endpoint)?
                .with_default_max_tokens(*max_tokens);
            Ok(Arc::new(client))
        }
        LlmConfig::Ollama { model, endpoint } => {
            let client = OllamaClient::connect(endpoint, model.clone()).await?;
            Ok(Arc::new(client))
        }
    }
}
