// Survey endpoints: submission, duplicate check, stats, results.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::error::ApiError;
use crate::server::AppState;
use crate::survey::aggregate::PositionStats;
use crate::survey::ballot::{Ballot, Rankings, Role};

#[derive(Debug, Deserialize)]
pub struct SubmitSurveyRequest {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
    rankings: Option<Rankings>,
    feedback: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckVotedRequest {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    success: bool,
    total_participants: i64,
    today_participants: i64,
    position_participation: BTreeMap<Role, i64>,
}

#[derive(Serialize)]
pub struct ResultsResponse {
    success: bool,
    total_participants: i64,
    surveys: Vec<Ballot>,
    position_stats: PositionStats,
}

/// Resolve the identity a ballot is recorded under. An explicit non-empty
/// `clientId` wins; otherwise one is synthesized from the first
/// X-Forwarded-For entry, falling back to the peer address.
fn client_identity(provided: Option<&str>, headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(id) = provided {
        if !id.is_empty() {
            return id.to_string();
        }
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match forwarded {
        Some(addr) => format!("ip_{addr}"),
        None => format!("ip_{}", peer.ip()),
    }
}

pub async fn submit_survey(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<SubmitSurveyRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) =
        body.map_err(|rejection| ApiError::InvalidBallot(rejection.body_text()))?;
    let rankings: Rankings = request
        .rankings
        .ok_or_else(|| ApiError::InvalidBallot("rankings are required".to_string()))?;

    let client_id = client_identity(request.client_id.as_deref(), &headers, peer);
    state
        .survey
        .submit(&client_id, &rankings, request.feedback.as_deref())?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn check_voted(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<CheckVotedRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // A missing or malformed body is treated as an empty request; the
    // identity then comes from the connection.
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let client_id = client_identity(request.client_id.as_deref(), &headers, peer);
    let has_voted = state.survey.check_voted(&client_id)?;

    Ok(Json(
        serde_json::json!({ "success": true, "hasVoted": has_voted }),
    ))
}

pub async fn survey_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.survey.stats()?;
    Ok(Json(StatsResponse {
        success: true,
        total_participants: stats.total_participants,
        today_participants: stats.today_participants,
        position_participation: stats.position_participation,
    }))
}

pub async fn survey_results(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let results = state.survey.results()?;
    Ok(Json(ResultsResponse {
        success: true,
        total_participants: results.total_participants,
        surveys: results.surveys,
        position_stats: results.position_stats,
    }))
}
