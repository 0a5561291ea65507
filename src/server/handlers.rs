//! HTTP handlers

use super::error::{ApiError, ApiResult};
use super::ServerState;
use crate::lens::observe::{validate_token, PingOutcome, PingRow, PingStats};
use crate::lens::whois::{ResolutionResult, WhoisTransport};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

pub const DEFAULT_STATS_TOP: usize = 5;
pub const DEFAULT_LAST_LIMIT: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PingRequest {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsParams {
    pub top: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub deleted: u64,
}

/// Client address: first `X-Forwarded-For` entry, else the TCP peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(ip) => Some(ip.to_string()),
        None => peer.map(|p| p.ip().to_string()),
    }
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn ping<T: WhoisTransport + 'static>(
    State(state): State<ServerState<T>>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<PingRequest>,
) -> ApiResult<Json<PingOutcome>> {
    validate_token(&request.token).map_err(|e| ApiError::invalid_params(e.to_string()))?;

    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let ip = client_ip(&headers, peer)
        .ok_or_else(|| ApiError::invalid_params("unable to determine client address"))?;
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .observe
        .observe(&request.token, &ip, user_agent)
        .await?;
    Ok(Json(outcome))
}

pub async fn ping_stats<T: WhoisTransport + 'static>(
    State(state): State<ServerState<T>>,
    Query(params): Query<StatsParams>,
) -> ApiResult<Json<PingStats>> {
    let top = params.top.unwrap_or(DEFAULT_STATS_TOP);
    Ok(Json(state.observe.stats(top).await?))
}

pub async fn ping_last<T: WhoisTransport + 'static>(
    State(state): State<ServerState<T>>,
    Query(params): Query<LastParams>,
) -> ApiResult<Json<Vec<PingRow>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LAST_LIMIT);
    Ok(Json(state.observe.last(limit).await?))
}

pub async fn ping_clear<T: WhoisTransport + 'static>(
    State(state): State<ServerState<T>>,
) -> ApiResult<Json<ClearResponse>> {
    let deleted = state.observe.clear().await?;
    Ok(Json(ClearResponse { deleted }))
}

/// Full per-source resolution, for diagnostics
pub async fn resolve<T: WhoisTransport + 'static>(
    State(state): State<ServerState<T>>,
    Path(ip): Path<String>,
) -> ApiResult<Json<ResolutionResult>> {
    let result = state.observe.whois().resolve(&ip).await?;
    Ok(Json(result))
}
