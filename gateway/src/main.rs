//! Relay gateway - supervises inference workers and routes prompts between models.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay_gateway::config::Config;
use relay_gateway::supervisor::{spawn_event_logger, Supervisor};
use relay_gateway::{
    proxy_app, router_app, AppState, FileTranscript, InferenceEngine, OllamaEngine, ProxyClient,
    ShutdownHandle,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("relay-gateway {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Check config.toml or the RELAY__SECTION__KEY environment variables.",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting relay-gateway with {} models", config.models.len());

    let engine: Arc<dyn InferenceEngine> = Arc::new(OllamaEngine::with_list_path(
        config.engine_base_url(),
        &config.engine.list_path,
    ));
    tracing::info!(
        "Using {} engine at {}",
        engine.engine_type(),
        config.engine_base_url()
    );

    // Workers must be up (or at least spawned) before traffic is accepted.
    let supervisor = Arc::new(Supervisor::new(engine.clone(), &config.engine));
    let _event_logger = spawn_event_logger(supervisor.subscribe());
    for model in config.engine_models() {
        if let Err(e) = supervisor.ensure_running(model).await {
            tracing::error!("Could not start worker for {}: {}", model, e);
        }
    }

    let shutdown = ShutdownHandle::new();
    let mut servers = JoinSet::new();

    // One proxy listener per model
    for model in &config.models {
        let addr = format!("{}:{}", config.proxy.host, model.port);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("{} proxy listening at http://{}", model.name, addr);
        spawn_server(
            &mut servers,
            listener,
            proxy_app(model.clone(), engine.clone()),
            &shutdown,
        );
    }

    // Front-door router
    let transcript = FileTranscript::new(&config.transcript.path);
    tracing::info!("Transcript at {}", transcript.path().display());
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(ProxyClient::new(&config.proxy.host)),
        Arc::new(transcript),
        supervisor.clone(),
        shutdown.clone(),
    ));

    let addr = format!("{}:{}", config.router.host, config.router.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Main API router listening at http://{}", addr);
    spawn_server(&mut servers, listener, router_app(state), &shutdown);

    tokio::select! {
        _ = shutdown.wait() => {}
        _ = interrupted() => shutdown.trigger(),
    }

    // Listeners first, so nothing is served while workers go down.
    let drain = Duration::from_millis(config.router.shutdown_grace_ms);
    let drained = tokio::time::timeout(drain, async {
        while servers.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Listeners did not drain within {:?}, aborting them", drain);
        servers.shutdown().await;
    }

    supervisor.shutdown().await;
    tracing::info!("Gateway stopped");

    Ok(())
}

/// Resolve on Ctrl-C. Never resolves if the signal cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupt received, shutting down");
}

fn spawn_server(
    servers: &mut JoinSet<()>,
    listener: TcpListener,
    app: Router,
    shutdown: &ShutdownHandle,
) {
    let shutdown = shutdown.clone();
    servers.spawn(async move {
        if let Err(e) = relay_gateway::serve(listener, app, shutdown).await {
            tracing::error!("Server error: {}", e);
        }
    });
}
