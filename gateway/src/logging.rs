//! Request logging shared by every listener.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// Name of the listener a request arrived on, e.g. `router` or `proxy:gemma3`.
///
/// The router and all proxies log into one stream; the tag tells them apart.
#[derive(Clone, Debug)]
pub struct ListenerTag(Arc<str>);

impl ListenerTag {
    pub fn router() -> Self {
        Self(Arc::from("router"))
    }

    pub fn proxy(model: &str) -> Self {
        Self(Arc::from(format!("proxy:{}", model)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware that logs HTTP requests at INFO level.
pub async fn request_logger(
    State(listener): State<ListenerTag>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        listener = listener.as_str(),
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "HTTP request"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_tags() {
        assert_eq!(ListenerTag::router().as_str(), "router");
        assert_eq!(ListenerTag::proxy("qwen3").as_str(), "proxy:qwen3");
    }
}
