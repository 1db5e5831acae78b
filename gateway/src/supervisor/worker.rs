//! A single supervised worker process and its monitor task.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;

use super::events::{WorkerEvent, WorkerEventKind, WorkerState, WorkerStatus};
use crate::error::{Error, Result};

/// A worker spawned by the supervisor.
///
/// The child process itself is owned by the monitor task. The worker keeps
/// the shared state and the channel used to ask the monitor to stop it.
pub(super) struct Worker {
    model: String,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    state: Arc<RwLock<WorkerState>>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    StopRequested,
}

impl Worker {
    /// Start `command + [model]` with the gateway's standard streams.
    pub(super) fn spawn(
        model: &str,
        command: &[String],
        stop_timeout: Duration,
        events: broadcast::Sender<WorkerEvent>,
    ) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Spawn("empty run command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(model)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::Spawn(format!("{} {}: {}", command.join(" "), model, e)))?;

        let pid = child.id();
        let state = Arc::new(RwLock::new(WorkerState::Running));
        let (stop_tx, stop_rx) = oneshot::channel();

        let _ = events.send(WorkerEvent::new(model, WorkerEventKind::Started { pid }));

        let monitor = tokio::spawn(monitor(
            model.to_string(),
            child,
            stop_rx,
            state.clone(),
            events,
            stop_timeout,
        ));

        Ok(Self {
            model: model.to_string(),
            pid,
            started_at: Utc::now(),
            state,
            stop_tx: Mutex::new(Some(stop_tx)),
            monitor: Mutex::new(Some(monitor)),
        })
    }

    /// Record a worker that never got a process.
    pub(super) fn failed(model: &str, reason: String) -> Self {
        Self {
            model: model.to_string(),
            pid: None,
            started_at: Utc::now(),
            state: Arc::new(RwLock::new(WorkerState::Failed { reason })),
            stop_tx: Mutex::new(None),
            monitor: Mutex::new(None),
        }
    }

    pub(super) async fn is_running(&self) -> bool {
        self.state.read().await.is_running()
    }

    pub(super) async fn status(&self) -> WorkerStatus {
        WorkerStatus {
            model: self.model.clone(),
            pid: self.pid,
            state: self.state.read().await.clone(),
            started_at: self.started_at,
        }
    }

    /// Ask the monitor to terminate the process and wait until it has.
    pub(super) async fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().await.take() {
            // The monitor may already be gone if the process exited.
            let _ = tx.send(());
        }
        if let Some(handle) = self.monitor.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Monitor task for {} ended abnormally: {}", self.model, e);
            }
        }
    }
}

async fn monitor(
    model: String,
    mut child: Child,
    stop_rx: oneshot::Receiver<()>,
    state: Arc<RwLock<WorkerState>>,
    events: broadcast::Sender<WorkerEvent>,
    stop_timeout: Duration,
) {
    let outcome = tokio::select! {
        result = child.wait() => Outcome::Exited(result),
        _ = stop_rx => Outcome::StopRequested,
    };

    let kind = match outcome {
        Outcome::Exited(Ok(status)) => {
            let (code, signal) = exit_parts(&status);
            *state.write().await = WorkerState::Exited { code, signal };
            WorkerEventKind::Exited { code, signal }
        }
        Outcome::Exited(Err(e)) => {
            let reason = format!("failed to wait for process: {}", e);
            *state.write().await = WorkerState::Failed {
                reason: reason.clone(),
            };
            WorkerEventKind::Failed { reason }
        }
        Outcome::StopRequested => {
            terminate(&model, &mut child, stop_timeout).await;
            *state.write().await = WorkerState::Stopped;
            WorkerEventKind::Stopped
        }
    };

    let _ = events.send(WorkerEvent::new(&model, kind));
}

/// Terminate a child gracefully: SIGTERM, then kill after `timeout`.
async fn terminate(model: &str, child: &mut Child, timeout: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!("Worker for {} exited with {}", model, status);
        }
        Ok(Err(e)) => {
            tracing::warn!("Error waiting for worker {}: {}", model, e);
        }
        Err(_timeout) => {
            tracing::warn!("Worker {} didn't stop gracefully, killing", model);
            let _ = child.kill().await;
        }
    }
}

fn exit_parts(status: &ExitStatus) -> (Option<i32>, Option<i32>) {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        (status.code(), status.signal())
    }
    #[cfg(not(unix))]
    {
        (status.code(), None)
    }
}
