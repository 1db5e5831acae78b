//! Inference engine abstraction layer.
//!
//! The gateway never runs a model itself. It asks an external engine which
//! models are running and forwards prompts to its generation API.

mod ollama;

pub use ollama::OllamaEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A model the engine reports as active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningModel {
    pub name: String,
}

/// Primary trait for inference engines.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Unique identifier for this engine type (e.g., "ollama").
    fn engine_type(&self) -> &'static str;

    /// List the models the engine currently has active.
    async fn list_running(&self) -> Result<Vec<RunningModel>>;

    /// Whether a runtime for `model` is already active.
    async fn is_running(&self, model: &str) -> Result<bool> {
        let running = self.list_running().await?;
        Ok(running.iter().any(|m| m.name == model))
    }

    /// Run a single, non-streamed completion and return the raw output text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}
