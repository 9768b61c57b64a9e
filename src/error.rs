use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed or missing request fields. The message is the client-facing error text.
    #[error("{0}")]
    Validation(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Missing {0}")]
    MissingCredential(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::MissingCredential(_) | RelayError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            RelayError::Validation(message) => json!({ "error": message }),
            RelayError::MissingCredential(_) | RelayError::Config(_) => {
                json!({ "error": self.to_string() })
            }
            RelayError::Upstream(detail) => json!({ "error": "Upstream error", "detail": detail }),
            other => json!({ "error": "Upstream error", "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelayError::Validation("Missing q[]".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::MissingCredential("HF_TOKEN").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::Upstream("boom".to_string()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_missing_credential_message() {
        assert_eq!(
            RelayError::MissingCredential("HF_TOKEN").to_string(),
            "Missing HF_TOKEN"
        );
    }
}
