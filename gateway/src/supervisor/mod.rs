//! Model process supervisor.
//!
//! Makes sure a worker is active for every configured model before traffic
//! is accepted. Workers the supervisor spawns are owned here: nothing else
//! may terminate them, and their exits are published as events rather than
//! treated as gateway failures.

mod events;
mod worker;

pub use events::{spawn_event_logger, WorkerEvent, WorkerEventKind, WorkerState, WorkerStatus};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::engine::InferenceEngine;
use crate::error::Result;
use worker::Worker;

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct Supervisor {
    engine: Arc<dyn InferenceEngine>,
    run_command: Vec<String>,
    supervise: bool,
    stop_timeout: Duration,
    workers: RwLock<HashMap<String, Arc<Worker>>>,
    events: broadcast::Sender<WorkerEvent>,
}

impl Supervisor {
    pub fn new(engine: Arc<dyn InferenceEngine>, config: &EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine,
            run_command: config.run_command.clone(),
            supervise: config.supervise,
            stop_timeout: Duration::from_secs(config.stop_timeout_secs),
            workers: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to worker lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Start a worker for `model` unless one is already active.
    ///
    /// Returns `Ok(None)` when nothing was started. A failed listing check is
    /// treated as "not running".
    pub async fn ensure_running(&self, model: &str) -> Result<Option<WorkerStatus>> {
        if let Some(worker) = self.workers.read().await.get(model) {
            if worker.is_running().await {
                tracing::info!("Model \"{}\" is already running (supervised)", model);
                return Ok(None);
            }
        }

        let running = match self.engine.is_running(model).await {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!("Failed to check running models: {}", e);
                false
            }
        };

        if running {
            tracing::info!("Model \"{}\" is already running.", model);
            return Ok(None);
        }

        if !self.supervise {
            tracing::info!(
                "Model \"{}\" is not running and supervision is disabled",
                model
            );
            return Ok(None);
        }

        tracing::info!(
            "Starting worker with: {} {}",
            self.run_command.join(" "),
            model
        );

        match Worker::spawn(model, &self.run_command, self.stop_timeout, self.events.clone()) {
            Ok(worker) => {
                let worker = Arc::new(worker);
                let status = worker.status().await;
                self.workers
                    .write()
                    .await
                    .insert(model.to_string(), worker);
                Ok(Some(status))
            }
            Err(e) => {
                let _ = self.events.send(WorkerEvent::new(
                    model,
                    WorkerEventKind::Failed {
                        reason: e.to_string(),
                    },
                ));
                self.workers
                    .write()
                    .await
                    .insert(model.to_string(), Arc::new(Worker::failed(model, e.to_string())));
                Err(e)
            }
        }
    }

    /// Status of every worker the supervisor knows about, sorted by model.
    pub async fn status(&self) -> Vec<WorkerStatus> {
        let workers: Vec<Arc<Worker>> = self.workers.read().await.values().cloned().collect();

        let mut statuses = Vec::with_capacity(workers.len());
        for worker in workers {
            statuses.push(worker.status().await);
        }
        statuses.sort_by(|a, b| a.model.cmp(&b.model));
        statuses
    }

    /// Stop the worker for `model`. Returns false if none is supervised.
    pub async fn stop(&self, model: &str) -> bool {
        let worker = self.workers.read().await.get(model).cloned();
        match worker {
            Some(worker) => {
                worker.stop().await;
                true
            }
            None => false,
        }
    }

    /// Stop every supervised worker concurrently.
    pub async fn shutdown(&self) {
        let mut stops = JoinSet::new();
        for worker in self.workers.read().await.values().cloned() {
            stops.spawn(async move { worker.stop().await });
        }
        while let Some(result) = stops.join_next().await {
            if let Err(e) = result {
                tracing::warn!("Worker stop task failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunningModel;
    use crate::error::Error;
    use async_trait::async_trait;

    struct FakeEngine {
        running: Vec<&'static str>,
        listing_fails: bool,
    }

    #[async_trait]
    impl InferenceEngine for FakeEngine {
        fn engine_type(&self) -> &'static str {
            "fake"
        }

        async fn list_running(&self) -> Result<Vec<RunningModel>> {
            if self.listing_fails {
                return Err(Error::Upstream("connection refused".to_string()));
            }
            Ok(self
                .running
                .iter()
                .map(|name| RunningModel {
                    name: name.to_string(),
                })
                .collect())
        }

        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    fn engine_config(run_command: &[&str]) -> EngineConfig {
        EngineConfig {
            run_command: run_command.iter().map(|s| s.to_string()).collect(),
            stop_timeout_secs: 2,
            ..EngineConfig::default()
        }
    }

    fn supervisor(running: Vec<&'static str>, listing_fails: bool, cmd: &[&str]) -> Supervisor {
        Supervisor::new(
            Arc::new(FakeEngine {
                running,
                listing_fails,
            }),
            &engine_config(cmd),
        )
    }

    #[tokio::test]
    async fn test_already_running_starts_nothing() {
        let supervisor = supervisor(vec!["gemma3"], false, &["does-not-exist-binary"]);
        let result = supervisor.ensure_running("gemma3").await.unwrap();
        assert!(result.is_none());
        assert!(supervisor.status().await.is_empty());
    }

    #[tokio::test]
    async fn test_supervise_disabled_starts_nothing() {
        let mut config = engine_config(&["does-not-exist-binary"]);
        config.supervise = false;
        let supervisor = Supervisor::new(
            Arc::new(FakeEngine {
                running: vec![],
                listing_fails: false,
            }),
            &config,
        );
        assert!(supervisor.ensure_running("gemma3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported_not_fatal() {
        let supervisor = supervisor(vec![], false, &["relay-gateway-missing-binary", "run"]);
        let mut events = supervisor.subscribe();

        let result = supervisor.ensure_running("gemma3").await;
        assert!(matches!(result, Err(Error::Spawn(_))));

        let event = events.recv().await.unwrap();
        assert!(matches!(event.kind, WorkerEventKind::Failed { .. }));

        let statuses = supervisor.status().await;
        assert_eq!(statuses.len(), 1);
        assert!(matches!(statuses[0].state, WorkerState::Failed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_exit_is_observed() {
        // `sh -c 'exit 3' gemma3`: the model name becomes $0.
        let supervisor = supervisor(vec![], true, &["sh", "-c", "exit 3"]);
        let mut events = supervisor.subscribe();

        let status = supervisor.ensure_running("gemma3").await.unwrap().unwrap();
        assert_eq!(status.state, WorkerState::Running);

        let started = events.recv().await.unwrap();
        assert!(matches!(started.kind, WorkerEventKind::Started { .. }));

        let exited = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            exited.kind,
            WorkerEventKind::Exited {
                code: Some(3),
                signal: None
            }
        );

        let statuses = supervisor.status().await;
        assert_eq!(
            statuses[0].state,
            WorkerState::Exited {
                code: Some(3),
                signal: None
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_terminates_worker() {
        let supervisor = supervisor(vec![], false, &["sh", "-c", "sleep 30"]);
        let mut events = supervisor.subscribe();

        supervisor.ensure_running("qwen3").await.unwrap().unwrap();
        // A second call sees the supervised worker and starts nothing.
        assert!(supervisor.ensure_running("qwen3").await.unwrap().is_none());

        assert!(supervisor.stop("qwen3").await);
        assert!(!supervisor.stop("gemma3").await);

        let statuses = supervisor.status().await;
        assert_eq!(statuses[0].state, WorkerState::Stopped);

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind);
        }
        assert_eq!(kinds.last(), Some(&WorkerEventKind::Stopped));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_stops_workers_concurrently() {
        // Both workers ignore SIGTERM, so each stop runs into the 2s timeout.
        let supervisor = supervisor(
            vec![],
            false,
            &["sh", "-c", "trap '' TERM; while true; do sleep 1; done"],
        );
        supervisor.ensure_running("gemma3").await.unwrap().unwrap();
        supervisor.ensure_running("qwen3").await.unwrap().unwrap();

        let started = std::time::Instant::now();
        supervisor.shutdown().await;
        assert!(started.elapsed() < Duration::from_millis(3500));

        for status in supervisor.status().await {
            assert_eq!(status.state, WorkerState::Stopped);
        }
    }
}
