//! Front-door router types.

use serde::{Deserialize, Serialize};

/// Acknowledgement sent before the gateway shuts itself down.
pub const SHUTDOWN_MESSAGE: &str = "Server is shutting down...";

/// Body of `POST /api/generate`.
///
/// Both fields are optional on the wire so that missing values can be
/// reported as a 400 with a JSON body instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// One round of a looped exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    pub model_name: String,
    pub port: u16,
    pub message: String,
}

/// Mode-dependent router reply.
///
/// Serialized untagged: clients tell the shapes apart by their keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouterResponse {
    Relay {
        response1: String,
        response2: String,
    },
    Loop {
        #[serde(rename = "finalResponse")]
        final_response: String,
        #[serde(rename = "exchangeLog")]
        exchange_log: Vec<ExchangeRecord>,
    },
    Single {
        response: String,
    },
    Shutdown {
        message: String,
    },
}

impl RouterResponse {
    pub fn shutdown() -> Self {
        RouterResponse::Shutdown {
            message: SHUTDOWN_MESSAGE.to_string(),
        }
    }
}
