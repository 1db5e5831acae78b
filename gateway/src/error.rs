//! Error types for the gateway.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_common::ErrorBody;

/// Error types for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Transcript error: {0}")]
    Transcript(String),

    #[error("Failed to start worker: {0}")]
    Spawn(String),

    #[error("{}", relay_common::SHUTDOWN_MESSAGE)]
    ShuttingDown,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_) | Error::UnknownModel(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) | Error::Transcript(_) | Error::Spawn(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        (self.status(), body).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::InvalidRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::UnknownModel("frogmodel".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Upstream("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::ShuttingDown.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_unknown_model_message() {
        let err = Error::UnknownModel("frogmodel".into());
        assert_eq!(err.to_string(), "unknown model: frogmodel");
    }
}
