// src/handlers/teams.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        access::{RequireScreen, ScreenEquipes},
        auth::CurrentSession,
    },
    models::team::{CreateTeamPayload, Team, UpdateTeamPayload},
};

// GET /api/teams
pub async fn list_teams(
    State(app_state): State<AppState>,
    _screen: RequireScreen<ScreenEquipes>,
    session: CurrentSession,
) -> Result<Json<Vec<Team>>, AppError> {
    let teams = app_state.team_service.list_teams(&session.access).await?;
    Ok(Json(teams))
}

// POST /api/teams
pub async fn create_team(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Json(payload): Json<CreateTeamPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let team = app_state.team_service
        .create_team(&session.access, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(team)))
}

// PATCH /api/teams/{id}
pub async fn update_team(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<UpdateTeamPayload>,
) -> Result<Json<Team>, AppError> {
    payload.validate()?;

    let team = app_state.team_service
        .update_team(&session.access, team_id, &payload)
        .await?;
    Ok(Json(team))
}

// DELETE /api/teams/{id}
pub async fn delete_team(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path(team_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detached = app_state.team_service
        .delete_team(&session.access, team_id)
        .await?;
    Ok(Json(json!({ "detachedMembers": detached })))
}

// PUT /api/teams/{id}/members/{profile_id}
pub async fn add_member(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path((team_id, profile_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    app_state.team_service
        .add_member(&session.access, team_id, profile_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/teams/{id}/members/{profile_id}
pub async fn remove_member(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path((team_id, profile_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    app_state.team_service
        .remove_member(&session.access, team_id, profile_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
