//! Client the router uses to reach the proxy endpoints.

use async_trait::async_trait;
use reqwest::Client;
use relay_common::{ErrorBody, ProxyRequest, ProxyResponse};

use crate::config::ModelConfig;
use crate::error::{Error, Result};

/// Sends a prompt to one model and returns its (trimmed) reply.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, model: &ModelConfig, prompt: &str) -> Result<String>;
}

/// Reaches models through their proxy listeners over HTTP.
pub struct ProxyClient {
    http_client: Client,
    host: String,
}

impl ProxyClient {
    pub fn new(host: &str) -> Self {
        Self {
            http_client: Client::new(),
            host: host.to_string(),
        }
    }

    fn url_for(&self, model: &ModelConfig) -> String {
        format!("http://{}:{}/api/{}", self.host, model.port, model.name)
    }
}

#[async_trait]
impl ModelClient for ProxyClient {
    async fn generate(&self, model: &ModelConfig, prompt: &str) -> Result<String> {
        let url = self.url_for(model);

        let response = self
            .http_client
            .post(&url)
            .json(&ProxyRequest::new(prompt))
            .send()
            .await
            .map_err(|e| {
                Error::Upstream(format!(
                    "Model {} on port {} unreachable: {}",
                    model.name, model.port, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "no details".to_string());
            return Err(Error::Upstream(format!(
                "Model {} on port {} returned {}: {}",
                model.name, model.port, status, detail
            )));
        }

        let body: ProxyResponse = response.json().await.map_err(|e| {
            Error::Upstream(format!(
                "Malformed reply from model {}: {}",
                model.name, e
            ))
        })?;

        Ok(body.response)
    }
}
