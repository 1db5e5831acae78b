//! Per-model proxy endpoints.
//!
//! Every configured model gets its own listener exposing
//! `POST /api/<model>`, which forwards the prompt to the engine and returns
//! the trimmed output.

mod client;

pub use client::{ModelClient, ProxyClient};

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_common::{ProxyRequest, ProxyResponse};
use serde_json::{json, Value};

use crate::config::ModelConfig;
use crate::engine::InferenceEngine;
use crate::error::{Error, Result};

/// State of one proxy listener.
pub struct ProxyState {
    pub model: ModelConfig,
    pub engine: Arc<dyn InferenceEngine>,
}

/// Build the router for one model's proxy listener.
pub fn router(model: ModelConfig, engine: Arc<dyn InferenceEngine>) -> Router {
    let route = format!("/api/{}", model.name);
    let state = Arc::new(ProxyState { model, engine });

    Router::new()
        .route(&route, post(generate))
        .route("/health", get(health))
        .with_state(state)
}

/// POST /api/<model> - forward a prompt to the engine.
async fn generate(
    State(state): State<Arc<ProxyState>>,
    payload: std::result::Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ProxyResponse>> {
    let Json(request) = payload?;

    let prompt = request
        .prompt
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::InvalidRequest("Missing prompt".to_string()))?;

    let engine_model = state.model.engine_model();
    tracing::debug!(
        "Proxy {} forwarding {} chars to engine model {}",
        state.model.name,
        prompt.len(),
        engine_model
    );

    let output = state
        .engine
        .generate(engine_model, &prompt)
        .await
        .map_err(|e| {
            tracing::error!("Engine call for {} failed: {}", state.model.name, e);
            e
        })?;

    Ok(Json(ProxyResponse {
        response: output.trim().to_string(),
    }))
}

/// GET /health - liveness of this proxy listener.
async fn health(State(state): State<Arc<ProxyState>>) -> Json<Value> {
    Json(json!({ "status": "ok", "model": state.model.name }))
}
