//! Front-door router.
//!
//! `POST /api/generate` validates the request, turns the prompt into a
//! [`Command`] and runs one of the interaction modes:
//! - single: one model answers the user, with the transcript as context;
//! - relay (`2ai`): a second model answers the first model's reply;
//! - looped exchange (`chatBot N ...`): the first two models talk to each
//!   other for N rounds;
//! - shutdown: acknowledge, then stop the gateway.
//!
//! Once a shutdown has been requested every route answers 503.
//!
//! Calls to models are strictly sequential. Transcript appends are not
//! rolled back when a later step fails.

pub mod cleaner;
pub mod command;

pub use command::Command;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_common::{ExchangeRecord, RouterRequest, RouterResponse};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::state::AppState;
use crate::supervisor::WorkerStatus;

/// Build the router listener's routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/models", get(list_models))
        .route("/api/workers", get(list_workers))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            refuse_after_shutdown,
        ))
        .with_state(state)
}

/// Refuse all work once a shutdown has been requested.
async fn refuse_after_shutdown(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.shutdown.is_requested() {
        tracing::info!("Refusing {} during shutdown", request.uri().path());
        return Error::ShuttingDown.into_response();
    }
    next.run(request).await
}

/// POST /api/generate - route a prompt to one or more models.
async fn generate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RouterRequest>, JsonRejection>,
) -> Result<Json<RouterResponse>> {
    let Json(request) = payload?;

    let span = tracing::info_span!(
        "route",
        request_id = %Uuid::new_v4(),
        model = request.model.as_deref().unwrap_or("-")
    );

    let result = route_request(&state, request).instrument(span).await;
    if let Err(ref e) = result {
        tracing::error!("[Router] Error: {}", e);
    }
    result.map(Json)
}

async fn route_request(state: &AppState, request: RouterRequest) -> Result<RouterResponse> {
    let non_empty = |s: &String| !s.is_empty();
    let (model_name, prompt) = match (
        request.model.filter(non_empty),
        request.prompt.filter(non_empty),
    ) {
        (Some(model), Some(prompt)) => (model, prompt),
        _ => {
            return Err(Error::InvalidRequest(
                "Missing model or prompt".to_string(),
            ))
        }
    };

    let model = state
        .config
        .find_model(&model_name)
        .ok_or(Error::UnknownModel(model_name))?;

    match Command::parse(&prompt, state.config.router.max_loop_rounds)? {
        Command::Shutdown => {
            tracing::info!("Shutdown command received. Closing servers...");
            state
                .shutdown
                .trigger_after(Duration::from_millis(state.config.router.shutdown_grace_ms));
            Ok(RouterResponse::shutdown())
        }
        Command::Loop { rounds, message } => looped_exchange(state, rounds, message).await,
        Command::Relay { prompt } => {
            let partner = state
                .config
                .models
                .iter()
                .find(|m| m.name != model.name)
                .ok_or_else(|| {
                    Error::InvalidRequest(
                        "2ai needs a second configured model".to_string(),
                    )
                })?;
            standard(state, model, &prompt, Some(partner)).await
        }
        Command::Single { prompt } => standard(state, model, &prompt, None).await,
    }
}

/// Answer the user with transcript context, optionally relaying to `partner`.
async fn standard(
    state: &AppState,
    model: &ModelConfig,
    prompt: &str,
    partner: Option<&ModelConfig>,
) -> Result<RouterResponse> {
    let context = match state.transcript.read_all().await {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(
                "Could not read transcript, continuing with empty context: {}",
                e
            );
            String::new()
        }
    };

    let first_prompt = format!("{}\nUser: {}\nAI:", context, prompt);
    tracing::debug!("[Router] Full prompt sent to {}:\n{}", model.name, first_prompt);

    let response1 = ask(state, model, &first_prompt).await?;
    tracing::info!("[Router] Response from {}: {}", model.name, response1);

    record(state, &format!("User: {}\nAI: {}", prompt, response1)).await;

    let Some(partner) = partner else {
        return Ok(RouterResponse::Single {
            response: response1,
        });
    };

    let second_prompt = format!("AI: {}\nAI:", response1);
    let response2 = ask(state, partner, &second_prompt).await?;
    tracing::info!("[Router] Response from {}: {}", partner.name, response2);

    record(state, &format!("AI: {}", response2)).await;

    Ok(RouterResponse::Relay {
        response1,
        response2,
    })
}

/// Let the first two configured models talk to each other for `rounds` rounds.
async fn looped_exchange(state: &AppState, rounds: u32, mut message: String) -> Result<RouterResponse> {
    let partners = match state.config.models.as_slice() {
        [first, second, ..] => [first, second],
        _ => {
            return Err(Error::InvalidRequest(
                "chatBot needs two configured models".to_string(),
            ))
        }
    };

    let mut exchange_log = Vec::with_capacity(rounds as usize);
    for round in 0..rounds as usize {
        let model = partners[round % 2];
        tracing::info!("[ChatBot Loop] Sending to {} ({}): {}", model.name, model.port, message);

        message = ask(state, model, &format!("AI: {}\nAI:", message)).await?;
        tracing::info!("[ChatBot Loop] Response from {}: {}", model.name, message);

        record(state, &format!("AI: {}", message)).await;
        exchange_log.push(ExchangeRecord {
            model_name: model.name.clone(),
            port: model.port,
            message: message.clone(),
        });
    }

    Ok(RouterResponse::Loop {
        final_response: message,
        exchange_log,
    })
}

/// Query one model, stripping its reasoning trace if it emits one.
async fn ask(state: &AppState, model: &ModelConfig, prompt: &str) -> Result<String> {
    let output = state.models.generate(model, prompt).await?;
    if model.has_reasoning_trace {
        Ok(cleaner::clean(&output))
    } else {
        Ok(output)
    }
}

/// Append to the transcript. Failures are logged, never surfaced.
async fn record(state: &AppState, entry: &str) {
    if let Err(e) = state.transcript.append(entry).await {
        tracing::error!("Failed to append to transcript: {}", e);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelSummary {
    name: String,
    port: u16,
    engine_model: String,
    has_reasoning_trace: bool,
}

/// GET /api/models - configured models and their proxy ports.
async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelSummary>> {
    let models = state
        .config
        .models
        .iter()
        .map(|m| ModelSummary {
            name: m.name.clone(),
            port: m.port,
            engine_model: m.engine_model().to_string(),
            has_reasoning_trace: m.has_reasoning_trace,
        })
        .collect();
    Json(models)
}

/// GET /api/workers - supervised worker status.
async fn list_workers(State(state): State<Arc<AppState>>) -> Json<Vec<WorkerStatus>> {
    Json(state.supervisor.status().await)
}

/// GET /health - health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
