//! Ollama inference engine implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{InferenceEngine, RunningModel};
use crate::error::{Error, Result};

/// Ollama inference engine.
///
/// Communicates with an Ollama server over its HTTP API.
pub struct OllamaEngine {
    http_client: Client,
    base_url: String,
    list_path: String,
}

impl OllamaEngine {
    pub fn new(base_url: &str) -> Self {
        Self::with_list_path(base_url, "/api/list")
    }

    pub fn with_list_path(base_url: &str, list_path: &str) -> Self {
        let list_path = if list_path.starts_with('/') {
            list_path.to_string()
        } else {
            format!("/{}", list_path)
        };

        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            list_path,
        }
    }
}

// ============================================================================
// Ollama API types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Listing replies come either as a bare array or wrapped in `models`
/// (the shape of Ollama's `/api/ps` and `/api/tags`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OllamaListResponse {
    Bare(Vec<OllamaListItem>),
    Wrapped { models: Vec<OllamaListItem> },
}

#[derive(Debug, Deserialize)]
struct OllamaListItem {
    name: String,
}

impl OllamaListResponse {
    fn into_items(self) -> Vec<OllamaListItem> {
        match self {
            OllamaListResponse::Bare(items) => items,
            OllamaListResponse::Wrapped { models } => models,
        }
    }
}

// ============================================================================
// InferenceEngine implementation
// ============================================================================

#[async_trait]
impl InferenceEngine for OllamaEngine {
    fn engine_type(&self) -> &'static str {
        "ollama"
    }

    async fn list_running(&self) -> Result<Vec<RunningModel>> {
        let url = format!("{}{}", self.base_url, self.list_path);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Engine list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "Engine list API returned {}",
                response.status()
            )));
        }

        let listing: OllamaListResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Malformed engine list reply: {}", e)))?;

        Ok(listing
            .into_items()
            .into_iter()
            .map(|item| RunningModel { name: item.name })
            .collect())
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
        };

        tracing::debug!("Sending generate request to Ollama: {} model={}", url, model);

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Engine request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "Engine returned {}",
                response.status()
            )));
        }

        let generated: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Malformed engine reply: {}", e)))?;

        Ok(generated.response)
    }
}
