//! Error-to-status mapping for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use clashcast_engine::EngineError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("server error: {0}")]
    Internal(String),
}

impl RpcError {
    /// Machine-readable code plus HTTP status for each outcome class.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            RpcError::Engine(EngineError::BattleNotActive) => {
                (StatusCode::CONFLICT, "battle_not_active")
            }
            RpcError::Engine(EngineError::BattleNotFound(_)) => {
                (StatusCode::NOT_FOUND, "battle_not_found")
            }
            RpcError::Engine(EngineError::InvalidContent(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_content")
            }
            RpcError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            RpcError::Engine(EngineError::Store(clashcast_store::StoreError::NotFound(_))) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({
            "error": code,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_validation_map_to_distinct_statuses() {
        let (status, code) = RpcError::Engine(EngineError::BattleNotActive).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "battle_not_active");

        let (status, code) =
            RpcError::Engine(EngineError::InvalidContent("too short".into())).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "invalid_content");

        let (status, _) =
            RpcError::Engine(EngineError::Moderation("down".into())).status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
