//! Relay gateway - supervises local inference workers, exposes one proxy
//! endpoint per model, and routes user prompts between models.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod router;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod transcript;

pub use config::{Config, ModelConfig};
pub use engine::{InferenceEngine, OllamaEngine};
pub use error::{Error, Result};
pub use proxy::{ModelClient, ProxyClient};
pub use shutdown::ShutdownHandle;
pub use state::AppState;
pub use supervisor::Supervisor;
pub use transcript::{FileTranscript, MemoryTranscript, TranscriptStore};

use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use logging::ListenerTag;

/// Router listener with logging and CORS layers applied.
pub fn router_app(state: Arc<AppState>) -> Router {
    with_layers(router::router(state), ListenerTag::router())
}

/// Proxy listener for `model` with logging and CORS layers applied.
pub fn proxy_app(model: ModelConfig, engine: Arc<dyn InferenceEngine>) -> Router {
    let tag = ListenerTag::proxy(&model.name);
    with_layers(proxy::router(model, engine), tag)
}

fn with_layers(app: Router, tag: ListenerTag) -> Router {
    app.layer(middleware::from_fn_with_state(tag, logging::request_logger))
        .layer(CorsLayer::permissive())
}

/// Serve `app` until `shutdown` triggers, then stop accepting connections
/// and let in-flight requests finish.
pub async fn serve(listener: TcpListener, app: Router, shutdown: ShutdownHandle) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}
