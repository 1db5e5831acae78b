//! Worker lifecycle events and state snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Lifecycle state of a supervised worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkerState {
    Running,
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    Stopped,
    Failed {
        reason: String,
    },
}

impl WorkerState {
    pub fn is_running(&self) -> bool {
        matches!(self, WorkerState::Running)
    }
}

/// Point-in-time view of a worker, as served by `/api/workers`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub model: String,
    pub pid: Option<u32>,
    #[serde(flatten)]
    pub state: WorkerState,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEventKind {
    Started { pid: Option<u32> },
    Exited { code: Option<i32>, signal: Option<i32> },
    Failed { reason: String },
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerEvent {
    pub model: String,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: WorkerEventKind,
}

impl WorkerEvent {
    pub fn new(model: &str, kind: WorkerEventKind) -> Self {
        Self {
            model: model.to_string(),
            at: Utc::now(),
            kind,
        }
    }
}

/// Log every event published by the supervisor until the channel closes.
pub fn spawn_event_logger(mut events: broadcast::Receiver<WorkerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Worker event logger lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &WorkerEvent) {
    match &event.kind {
        WorkerEventKind::Started { pid } => {
            tracing::info!(model = %event.model, pid = ?pid, "Worker started");
        }
        WorkerEventKind::Exited { code, signal } => {
            tracing::warn!(
                model = %event.model,
                code = ?code,
                signal = ?signal,
                "Worker process exited"
            );
        }
        WorkerEventKind::Failed { reason } => {
            tracing::error!(model = %event.model, "Worker failed: {}", reason);
        }
        WorkerEventKind::Stopped => {
            tracing::info!(model = %event.model, "Worker stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_status_serialization() {
        let status = WorkerStatus {
            model: "gemma3".to_string(),
            pid: Some(42),
            state: WorkerState::Exited {
                code: Some(1),
                signal: None,
            },
            started_at: Utc::now(),
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["model"], "gemma3");
        assert_eq!(value["state"], "exited");
        assert_eq!(value["code"], 1);
        assert!(value["signal"].is_null());
    }

    #[test]
    fn test_event_serialization() {
        let event = WorkerEvent::new(
            "qwen3",
            WorkerEventKind::Failed {
                reason: "not found".to_string(),
            },
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "failed");
        assert_eq!(value["reason"], "not found");
    }
}
