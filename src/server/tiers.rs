// Tier board endpoints: computed boards for ALL/C, stored snapshots for PF/PG.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::server::error::ApiError;
use crate::server::AppState;
use crate::survey::Role;
use crate::tier::compute_tier;

#[derive(Debug, Default, Deserialize)]
pub struct RankingQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PutRankingRequest {
    category: Option<String>,
    items_json: Option<String>,
}

/// A board category is the ALL keyword or one of the roles that carries a
/// board: C, PF, PG. Other role tags are rejected along with everything else.
fn parse_category(raw: Option<&str>) -> Result<String, ApiError> {
    let trimmed = raw.unwrap_or("").trim();
    if trimmed.eq_ignore_ascii_case("ALL") {
        return Ok("ALL".to_string());
    }
    match Role::from_tag(trimmed) {
        Some(role @ (Role::Center | Role::PowerForward | Role::PointGuard)) => {
            Ok(role.tag().to_string())
        }
        _ => Err(ApiError::BadRequest(
            "category must be one of C/PF/PG/ALL".to_string(),
        )),
    }
}

/// ALL and C are computed from the character catalog on every call; PF and
/// PG return the newest stored snapshot for the category.
pub async fn get_rankings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let category = parse_category(query.category.as_deref())?;

    match category.as_str() {
        "ALL" | "C" => {
            let position = if category == "C" { Some("C") } else { None };
            let characters = state.db.list_characters(None, position)?;
            let tier = compute_tier(&characters, &state.config.tiers);
            Ok(Json(serde_json::json!(tier)))
        }
        _ => match state.db.latest_snapshot(&category)? {
            Some((items_json, updated_at)) => {
                // Stored items are JSON text; if an old row does not parse,
                // hand the raw string through instead of failing the read.
                let items: serde_json::Value = serde_json::from_str(&items_json)
                    .unwrap_or(serde_json::Value::String(items_json));
                Ok(Json(serde_json::json!({
                    "category": category,
                    "items": items,
                    "updated_at": updated_at,
                })))
            }
            None => Ok(Json(serde_json::json!({
                "category": category,
                "items": [],
                "updated_at": null,
            }))),
        },
    }
}

pub async fn put_ranking(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PutRankingRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) =
        body.map_err(|_| ApiError::BadRequest("invalid request data".to_string()))?;
    let category = parse_category(request.category.as_deref())?;
    let Some(items_json) = request.items_json else {
        return Err(ApiError::BadRequest("items_json is required".to_string()));
    };

    state.db.insert_snapshot(&category, &items_json)?;
    Ok(Json(serde_json::json!({ "success": true })))
}
