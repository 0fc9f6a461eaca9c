//! Error types
//!
//! `ApiError` covers bad client input and always renders as a 400.
//! `ServerError` covers failures that stop the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid delay value: {0:?}")]
    InvalidDelay(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Message returned to the client (details stay in the logs)
    fn public_message(&self) -> &'static str {
        match self {
            ApiError::InvalidDelay(_) => "Invalid delay value",
            ApiError::InvalidJson(_) => "Invalid JSON",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Listener failed: {0}")]
    Listener(#[source] std::io::Error),

    #[error("Failed to register signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_are_bad_request() {
        assert_eq!(
            ApiError::InvalidDelay("abc".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidJson("eof".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_api_error_display_keeps_detail() {
        let err = ApiError::InvalidDelay("-5".to_string());
        assert_eq!(err.to_string(), r#"Invalid delay value: "-5""#);
    }
}
