use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use partscout_common::{Result, ScoutError};
use partscout_http::HttpClient;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use std::time::Duration;

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

/// Ollama client for local model inference.
///
/// Expects a running Ollama server (see https://github.com/ollama/ollama).
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaClient {
    /// Create a client without touching the network.
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        let client = HttpClient::new(base_url)
            .map_err(|e| ScoutError::Config(format!("HttpClient init failed: {e}")))?
            .with_retries(1);
        Ok(Self { client, model })
    }

    /// Create a client, verify the server is reachable, and pull the model
    /// when it is not available locally.
    pub async fn connect(base_url: &str, model: String) -> Result<Self> {
        let client = Self::new(base_url, model)?;
        client.ensure_model_available().await?;
        Ok(client)
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let tags: TagsResponse = self
            .client
            .get_json("api/tags", None)
            .await
            .map_err(|_| ScoutError::Llm(OLLAMA_CONNECTION_ERROR.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn ensure_model_available(&self) -> Result<()> {
        let models = self.fetch_available_models().await?;
        if !models.contains(&self.model) {
            tracing::info!(model = %self.model, "Model not found locally, pulling");
            self.pull_model().await?;
        }
        Ok(())
    }

    async fn pull_model(&self) -> Result<()> {
        let payload = json!({ "model": self.model, "stream": false });
        let client = self.client.clone().with_timeout(Duration::from_secs(600));
        let _: JsonValue = client
            .post_json("api/pull", None, &payload)
            .await
            .map_err(|e| ScoutError::Llm(format!("Failed to pull model: {e}")))?;
        tracing::info!(model = %self.model, "Successfully pulled model");
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let mut options = Map::new();
        if let Some(temp) = temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tok) = max_tokens {
            options.insert("num_predict".to_string(), json!(max_tok));
        }

        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": options,
        });
        if let Some(system) = system_prompt {
            payload["system"] = json!(system);
        }

        let resp: GenerateResponse = self
            .client
            .post_json("api/generate", None, &payload)
            .await
            .map_err(|e| ScoutError::Llm(format!("Generate request failed: {e}")))?;

        Ok(LlmResponse {
            text: resp.response,
            model: Some(self.model.clone()),
            tokens_used: resp.eval_count,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.fetch_available_models().await {
            Ok(models) => Ok(models.contains(&self.model)),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
