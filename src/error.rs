use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::telemetry::FetchError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Telemetry query failed; the next poll retries
    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: FetchError,
    },
    /// Bad query parameters
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// Internal server error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn fetch(what: &'static str, source: FetchError) -> Self {
        Self::Fetch { what, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Fetch { what, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": format!("Failed to fetch {}", what),
                    "details": source.to_string(),
                    "code": source.code(),
                    "hasDatabaseUrl": !matches!(source, FetchError::NotConfigured),
                }),
            ),
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "type": error_type_name(&self) }),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": msg, "type": error_type_name(&self) }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::Fetch { .. } => "fetch_error",
        AppError::BadRequest(_) => "bad_request",
        AppError::InternalError(_) => "internal_error",
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::fetch("metrics", FetchError::TableNotFound("relation missing".into()));
        assert_eq!(
            error.to_string(),
            "Failed to fetch metrics: Table or schema not found: relation missing"
        );
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(error_type_name(&AppError::BadRequest("x".into())), "bad_request");
        assert_eq!(
            error_type_name(&AppError::fetch("errors", FetchError::NotConfigured)),
            "fetch_error"
        );
    }

    #[tokio::test]
    async fn test_fetch_error_response() {
        let error = AppError::fetch("metrics", FetchError::Connection("refused".into()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Failed to fetch metrics");
        assert_eq!(json["code"], "connection");
        assert_eq!(json["hasDatabaseUrl"], true);
    }

    #[tokio::test]
    async fn test_bad_request_response() {
        let response = AppError::BadRequest("limit must be positive".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
