//! Configuration for the relay gateway.

use std::collections::HashSet;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Models served by the gateway, in routing order.
    ///
    /// The first two entries are the partners of a looped exchange.
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
}

/// A single model and the port its proxy endpoint listens on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub port: u16,
    /// Model name sent to the engine. Defaults to `name`.
    /// Example: two proxies `gemma3-a` and `gemma3-b` both backed by `gemma3`.
    #[serde(default)]
    pub engine_model: Option<String>,
    /// The model prefixes its answers with a `<think>...</think>` block.
    #[serde(default)]
    pub has_reasoning_trace: bool,
}

impl ModelConfig {
    pub fn new(name: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            port,
            engine_model: None,
            has_reasoning_trace: false,
        }
    }

    pub fn with_reasoning_trace(mut self) -> Self {
        self.has_reasoning_trace = true;
        self
    }

    pub fn with_engine_model(mut self, engine_model: &str) -> Self {
        self.engine_model = Some(engine_model.to_string());
        self
    }

    /// Name the engine knows this model by.
    pub fn engine_model(&self) -> &str {
        self.engine_model.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_router_port")]
    pub port: u16,
    /// Delay between acknowledging a shutdown command and exiting.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Upper bound on the round count of a looped exchange.
    #[serde(default = "default_max_loop_rounds")]
    pub max_loop_rounds: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_router_port(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            max_loop_rounds: default_max_loop_rounds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Address proxy listeners bind to, and the router dials.
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub base_url: String,
    /// Path of the listing API used to detect running models.
    #[serde(default = "default_list_path")]
    pub list_path: String,
    /// Command that starts a worker. The model name is appended as the last argument.
    #[serde(default = "default_run_command")]
    pub run_command: Vec<String>,
    /// Spawn workers for models that are not running yet.
    #[serde(default = "default_true")]
    pub supervise: bool,
    /// Time a worker gets to exit after SIGTERM before it is killed.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_url(),
            list_path: default_list_path(),
            run_command: default_run_command(),
            supervise: true,
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptConfig {
    #[serde(default = "default_transcript_path")]
    pub path: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            path: default_transcript_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_router_port() -> u16 {
    2500
}
fn default_shutdown_grace_ms() -> u64 {
    1000
}
fn default_max_loop_rounds() -> u32 {
    50
}
fn default_engine_url() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_list_path() -> String {
    "/api/list".to_string()
}
fn default_run_command() -> Vec<String> {
    vec!["ollama".to_string(), "run".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_stop_timeout() -> u64 {
    10
}
fn default_transcript_path() -> String {
    "context.txt".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_models() -> Vec<ModelConfig> {
    vec![
        ModelConfig::new("gemma3", 3500),
        ModelConfig::new("qwen3", 3501).with_reasoning_trace(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            proxy: ProxyConfig::default(),
            engine: EngineConfig::default(),
            transcript: TranscriptConfig::default(),
            logging: LoggingConfig::default(),
            models: default_models(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (RELAY__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("router.host", default_host())?
            .set_default("router.port", default_router_port() as i64)?
            .set_default("engine.base_url", default_engine_url())?
            .set_default("transcript.path", default_transcript_path())?
            // Load from config.toml if exists
            .add_source(File::with_name("config").required(false))
            // Override with environment variables (RELAY__SECTION__KEY format)
            .add_source(
                Environment::with_prefix("RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the gateway relies on: unique names, unique ports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::Message(
                "at least one model must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut ports = HashSet::new();
        for model in &self.models {
            // A leading `:` or `*` would make the proxy route a capture.
            if model.name.is_empty()
                || model.name.contains('/')
                || model.name.starts_with([':', '*'])
                || model.name.chars().any(char::is_whitespace)
            {
                return Err(ConfigError::Message(format!(
                    "invalid model name {:?}: must be a non-empty literal path segment",
                    model.name
                )));
            }
            if !names.insert(model.name.as_str()) {
                return Err(ConfigError::Message(format!(
                    "duplicate model name: {}",
                    model.name
                )));
            }
            if !ports.insert(model.port) {
                return Err(ConfigError::Message(format!(
                    "duplicate model port: {}",
                    model.port
                )));
            }
            if model.port == self.router.port {
                return Err(ConfigError::Message(format!(
                    "model {} uses the router port {}",
                    model.name, model.port
                )));
            }
        }

        if self.engine.supervise && self.engine.run_command.is_empty() {
            return Err(ConfigError::Message(
                "engine.run_command must not be empty when supervise is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL of the engine without a trailing slash.
    pub fn engine_base_url(&self) -> &str {
        self.engine.base_url.trim_end_matches('/')
    }

    pub fn find_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Distinct engine model names, in configuration order.
    pub fn engine_models(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.models
            .iter()
            .map(ModelConfig::engine_model)
            .filter(|name| seen.insert(*name))
            .collect()
    }
}
