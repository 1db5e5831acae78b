//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::proxy::ModelClient;
use crate::shutdown::ShutdownHandle;
use crate::supervisor::Supervisor;
use crate::transcript::TranscriptStore;

/// State passed to the router's handlers.
///
/// Everything a request touches is reachable from here; there are no
/// process-wide globals.
pub struct AppState {
    pub config: Config,
    pub models: Arc<dyn ModelClient>,
    pub transcript: Arc<dyn TranscriptStore>,
    pub supervisor: Arc<Supervisor>,
    pub shutdown: ShutdownHandle,
}

impl AppState {
    pub fn new(
        config: Config,
        models: Arc<dyn ModelClient>,
        transcript: Arc<dyn TranscriptStore>,
        supervisor: Arc<Supervisor>,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            config,
            models,
            transcript,
            supervisor,
            shutdown,
        }
    }
}
