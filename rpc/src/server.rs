//! Axum-based API server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use clashcast_engine::BattleManager;

use crate::error::RpcError;
use crate::handlers;

/// Shared state for all routes.
#[derive(Clone)]
pub struct RpcState {
    pub manager: Arc<BattleManager>,
}

/// Build the API router.
pub fn api_router(manager: Arc<BattleManager>) -> Router {
    Router::new()
        .route("/v1/battle/current", get(handlers::current_battle))
        .route("/v1/battle/:id/join", post(handlers::join))
        .route("/v1/battle/:id/cast", post(handlers::submit_cast))
        .route("/v1/battle/:id/casts", get(handlers::get_casts))
        .route("/v1/cast/:id/like", post(handlers::toggle_like))
        .route("/v1/history", get(handlers::history))
        .route("/metrics", get(handlers::metrics))
        .layer(CorsLayer::permissive())
        .with_state(RpcState { manager })
}

/// The API server, configured with a port and the engine it fronts.
pub struct RpcServer {
    pub port: u16,
    pub manager: Arc<BattleManager>,
}

impl RpcServer {
    pub fn new(port: u16, manager: Arc<BattleManager>) -> Self {
        Self { port, manager }
    }

    /// Bind and serve until the process shuts down.
    pub async fn start(&self) -> Result<(), RpcError> {
        let app = api_router(self.manager.clone());
        let addr = format!("0.0.0.0:{}", self.port);
        info!("API server listening on {addr}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Internal(format!("bind {addr}: {e}")))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| RpcError::Internal(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers;
    use axum::extract::{Path, Query, State};
    use axum::Json;
    use clashcast_broadcast::Broadcaster;
    use clashcast_engine::EngineConfig;
    use clashcast_nullables::NullTopicSource;
    use clashcast_store::MemoryStore;

    fn state() -> RpcState {
        let manager = BattleManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NullTopicSource::default()),
            Arc::new(Broadcaster::new()),
            EngineConfig::default(),
        );
        RpcState {
            manager: Arc::new(manager),
        }
    }

    #[tokio::test]
    async fn current_battle_absence_is_null_not_error() {
        let Json(body) = handlers::current_battle(State(state())).await.unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn history_is_empty_not_error() {
        let Json(body) = handlers::history(
            State(state()),
            Query(handlers::HistoryQuery { limit: Some(5) }),
        )
        .await
        .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn join_unknown_battle_is_not_found() {
        let result = handlers::join(
            State(state()),
            Path(42),
            Json(handlers::JoinRequest {
                user_id: "alice".into(),
                address: "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef".into(),
            }),
        )
        .await;
        assert!(matches!(
            result.err().unwrap(),
            RpcError::Engine(clashcast_engine::EngineError::BattleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn bad_address_is_rejected_at_the_boundary() {
        let result = handlers::join(
            State(state()),
            Path(1),
            Json(handlers::JoinRequest {
                user_id: "alice".into(),
                address: "not-an-address".into(),
            }),
        )
        .await;
        assert!(matches!(result.err().unwrap(), RpcError::BadRequest(_)));
    }
}
