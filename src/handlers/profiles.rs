// src/handlers/profiles.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentSession,
    models::{
        profile::{Profile, UpdateAvatarPayload, UpdateProfilePayload, UpdateScreensPayload},
        role::{AssignRolePayload, RoleHistory},
    },
};

// GET /api/profiles/{id}
pub async fn get_profile(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    let profile = app_state.profile_service
        .get_profile(&session.access, profile_id)
        .await?;
    Ok(Json(profile))
}

// PATCH /api/profiles/{id}
pub async fn update_profile(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path(profile_id): Path<Uuid>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<Profile>, AppError> {
    payload.validate()?;

    let profile = app_state.profile_service
        .update_profile(&session.access, profile_id, &payload)
        .await?;
    Ok(Json(profile))
}

// PUT /api/profiles/{id}/screens
pub async fn replace_screens(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path(profile_id): Path<Uuid>,
    Json(payload): Json<UpdateScreensPayload>,
) -> Result<Json<Profile>, AppError> {
    payload.validate()?;

    let profile = app_state.profile_service
        .replace_screens(&session.access, profile_id, payload)
        .await?;
    Ok(Json(profile))
}

// PATCH /api/me/avatar
pub async fn update_avatar(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Json(payload): Json<UpdateAvatarPayload>,
) -> Result<Json<Profile>, AppError> {
    payload.validate()?;

    let profile = app_state.profile_service
        .update_avatar(&session.access, &payload.avatar_url)
        .await?;
    Ok(Json(profile))
}

// GET /api/profiles/{id}/roles
pub async fn list_roles(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<RoleHistory>, AppError> {
    let history = app_state.role_service
        .history(&session.access, profile_id)
        .await?;
    Ok(Json(history))
}

// POST /api/profiles/{id}/roles
pub async fn assign_role(
    State(app_state): State<AppState>,
    session: CurrentSession,
    Path(profile_id): Path<Uuid>,
    Json(payload): Json<AssignRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let assignment = app_state.role_service
        .assign_role(&session.access, profile_id, &payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}
