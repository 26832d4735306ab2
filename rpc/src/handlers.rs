//! Request handlers and their DTOs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use clashcast_engine::JoinOutcome;
use clashcast_store::{Battle, BattleHistory, Cast};
use clashcast_types::{Address, BattleId, CastId, Side, UserId};

use crate::error::RpcError;
use crate::server::RpcState;

// ── Battle ───────────────────────────────────────────────────────────────

/// `GET /v1/battle/current`: the active battle or `null`.
pub async fn current_battle(
    State(state): State<RpcState>,
) -> Result<Json<Option<Battle>>, RpcError> {
    Ok(Json(state.manager.current_battle()?))
}

// ── Join ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct JoinRequest {
    pub user_id: String,
    pub address: String,
}

#[derive(Serialize)]
pub struct JoinResponse {
    pub status: &'static str,
}

/// `POST /v1/battle/:id/join`
pub async fn join(
    State(state): State<RpcState>,
    Path(battle_id): Path<u64>,
    Json(req): Json<JoinRequest>,
) -> Result<impl IntoResponse, RpcError> {
    let address = Address::parse(&req.address)
        .map_err(|e| RpcError::BadRequest(e.to_string()))?;
    let outcome = state
        .manager
        .join(BattleId(battle_id), UserId::new(req.user_id), address)?;
    match outcome {
        JoinOutcome::Joined => Ok((StatusCode::OK, Json(JoinResponse { status: "joined" }))),
        JoinOutcome::AlreadyJoined => Ok((
            StatusCode::CONFLICT,
            Json(JoinResponse {
                status: "already_joined",
            }),
        )),
    }
}

// ── Casts ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CastRequest {
    pub user_id: String,
    pub side: String,
    pub content: String,
    /// Settlement address, used when the cast auto-joins its author.
    pub address: Option<String>,
}

/// `POST /v1/battle/:id/cast`
pub async fn submit_cast(
    State(state): State<RpcState>,
    Path(battle_id): Path<u64>,
    Json(req): Json<CastRequest>,
) -> Result<Json<Cast>, RpcError> {
    let side: Side = req
        .side
        .parse()
        .map_err(|_| RpcError::BadRequest(format!("invalid side: {}", req.side)))?;
    let address = match req.address {
        Some(raw) => {
            Some(Address::parse(&raw).map_err(|e| RpcError::BadRequest(e.to_string()))?)
        }
        None => None,
    };
    let cast = state.manager.submit_cast(
        BattleId(battle_id),
        UserId::new(req.user_id),
        side,
        req.content,
        address,
    )?;
    Ok(Json(cast))
}

/// `GET /v1/battle/:id/casts`
pub async fn get_casts(
    State(state): State<RpcState>,
    Path(battle_id): Path<u64>,
) -> Result<Json<Vec<Cast>>, RpcError> {
    Ok(Json(state.manager.get_casts(BattleId(battle_id))?))
}

// ── Likes ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LikeRequest {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub liked: bool,
}

/// `POST /v1/cast/:id/like`: toggle; the response is the new state.
pub async fn toggle_like(
    State(state): State<RpcState>,
    Path(cast_id): Path<u64>,
    Json(req): Json<LikeRequest>,
) -> Result<Json<LikeResponse>, RpcError> {
    let liked = state
        .manager
        .toggle_like(UserId::new(req.user_id), CastId(cast_id))?;
    Ok(Json(LikeResponse { liked }))
}

// ── History ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

/// `GET /v1/history?limit=N`
pub async fn history(
    State(state): State<RpcState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<BattleHistory>>, RpcError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    Ok(Json(state.manager.get_history(limit)?))
}

// ── Metrics ──────────────────────────────────────────────────────────────

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<RpcState>) -> Result<String, RpcError> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&state.manager.metrics().registry.gather(), &mut buf)
        .map_err(|e| RpcError::Internal(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| RpcError::Internal(e.to_string()))
}
