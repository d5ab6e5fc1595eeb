// Catalog endpoints: characters, teams, tips, events.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::content::{
    parse_gen_filter, Character, CharacterPatch, Event, EventPatch, Team, Tip, TipPatch,
};
use crate::server::error::ApiError;
use crate::server::AppState;

fn invalid_body(_: JsonRejection) -> ApiError {
    ApiError::BadRequest("invalid request data".to_string())
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CharacterListQuery {
    gen: Option<String>,
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    name: Option<String>,
    gen: Option<f64>,
    position: Option<String>,
    avatar_url: Option<String>,
    description: Option<String>,
    stats_json: Option<String>,
}

pub async fn list_characters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CharacterListQuery>,
) -> Result<Json<Vec<Character>>, ApiError> {
    // A gen filter that does not parse as a number is ignored.
    let gen = query.gen.as_deref().and_then(parse_gen_filter);
    let position = query.position.as_deref().filter(|p| !p.is_empty());
    let characters = state.db.list_characters(gen, position)?;
    Ok(Json(characters))
}

pub async fn create_character(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateCharacterRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;
    let (Some(name), Some(gen)) = (request.name.as_deref(), request.gen) else {
        return Err(ApiError::BadRequest("name and gen are required".to_string()));
    };
    if name.is_empty() {
        return Err(ApiError::BadRequest("name and gen are required".to_string()));
    }

    let position = request.position.as_deref().unwrap_or("C");
    let id = state.db.insert_character(
        name,
        position,
        gen,
        request.avatar_url.as_deref(),
        request.description.as_deref(),
        request.stats_json.as_deref(),
    )?;
    Ok(Json(serde_json::json!({ "success": true, "id": id })))
}

pub async fn get_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Character>, ApiError> {
    match state.db.get_character(id)? {
        Some(character) => Ok(Json(character)),
        None => Err(ApiError::NotFound("character not found".to_string())),
    }
}

pub async fn update_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<CharacterPatch>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(patch) = body.map_err(invalid_body)?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".to_string()));
    }
    state.db.update_character(id, &patch)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn delete_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.delete_character(id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TeamListQuery {
    gen: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeamRequest {
    gen: Option<f64>,
    name: Option<String>,
    description: Option<String>,
    logo_url: Option<String>,
}

pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TeamListQuery>,
) -> Result<Json<Vec<Team>>, ApiError> {
    // Unlike the character list, a non-numeric gen filter yields an empty
    // list here.
    let teams = match query.gen.as_deref() {
        Some(raw) => match parse_gen_filter(raw) {
            Some(gen) => state.db.list_teams(Some(gen))?,
            None => Vec::new(),
        },
        None => state.db.list_teams(None)?,
    };
    Ok(Json(teams))
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TeamRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;
    let (Some(gen), Some(name)) = (request.gen, request.name.as_deref()) else {
        return Err(ApiError::BadRequest("gen and name are required".to_string()));
    };
    if name.is_empty() {
        return Err(ApiError::BadRequest("gen and name are required".to_string()));
    }

    let id = state.db.insert_team(
        gen,
        name,
        request.description.as_deref(),
        request.logo_url.as_deref(),
    )?;
    Ok(Json(serde_json::json!({ "success": true, "id": id })))
}

pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Team>, ApiError> {
    match state.db.get_team(id)? {
        Some(team) => Ok(Json(team)),
        None => Err(ApiError::NotFound("team not found".to_string())),
    }
}

pub async fn update_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<TeamRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;
    let (Some(gen), Some(name)) = (request.gen, request.name.as_deref()) else {
        return Err(ApiError::BadRequest("gen and name are required".to_string()));
    };
    if name.is_empty() {
        return Err(ApiError::BadRequest("gen and name are required".to_string()));
    }

    state.db.update_team(
        id,
        gen,
        name,
        request.description.as_deref(),
        request.logo_url.as_deref(),
    )?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn delete_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.delete_team(id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Tips
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TipListQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTipRequest {
    title: Option<String>,
    category: Option<String>,
    cover_url: Option<String>,
    summary: Option<String>,
    content_md: Option<String>,
}

pub async fn list_tips(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TipListQuery>,
) -> Result<Json<Vec<Tip>>, ApiError> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let tips = state.db.list_tips(category)?;
    Ok(Json(tips))
}

pub async fn create_tip(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTipRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;
    let (Some(title), Some(category)) = (request.title.as_deref(), request.category.as_deref())
    else {
        return Err(ApiError::BadRequest(
            "title and category are required".to_string(),
        ));
    };
    if title.is_empty() || category.is_empty() {
        return Err(ApiError::BadRequest(
            "title and category are required".to_string(),
        ));
    }

    let id = state.db.insert_tip(
        title,
        category,
        request.cover_url.as_deref(),
        request.summary.as_deref(),
        Some(request.content_md.as_deref().unwrap_or("")),
    )?;
    Ok(Json(serde_json::json!({ "success": true, "id": id })))
}

pub async fn update_tip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<TipPatch>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(patch) = body.map_err(invalid_body)?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".to_string()));
    }
    state.db.update_tip(id, &patch)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn delete_tip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.delete_tip(id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    title: Option<String>,
    cover_url: Option<String>,
    time_range: Option<String>,
    body_md: Option<String>,
    link: Option<String>,
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.db.list_events()?;
    Ok(Json(events))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;
    let Some(title) = request.title.as_deref().filter(|t| !t.is_empty()) else {
        return Err(ApiError::BadRequest("title is required".to_string()));
    };

    let id = state.db.insert_event(
        title,
        request.cover_url.as_deref(),
        request.time_range.as_deref(),
        Some(request.body_md.as_deref().unwrap_or("")),
        request.link.as_deref(),
    )?;
    Ok(Json(serde_json::json!({ "success": true, "id": id })))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<EventPatch>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(patch) = body.map_err(invalid_body)?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".to_string()));
    }
    state.db.update_event(id, &patch)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.delete_event(id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}
