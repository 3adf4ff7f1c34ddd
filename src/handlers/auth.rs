// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentSession,
    models::auth::{
        AuthResponse, LoginUserPayload, PasswordResetPayload, PasswordResetRequestPayload,
        RegisterUserPayload,
    },
};

// POST /api/auth/register
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = app_state.auth_service
        .register_user(&payload.full_name, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

// POST /api/auth/login
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let token = app_state.auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    Ok(Json(AuthResponse { token }))
}

// POST /api/auth/refresh
pub async fn refresh(
    State(app_state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<AuthResponse>, AppError> {
    let token = app_state.auth_service.refresh_token(&session.claims).await?;
    Ok(Json(AuthResponse { token }))
}

// POST /api/auth/logout
pub async fn logout(
    State(app_state): State<AppState>,
    session: CurrentSession,
) -> Result<StatusCode, AppError> {
    app_state.auth_service.sign_out(&session.claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/auth/password-reset/request
pub async fn request_password_reset(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;
    app_state.auth_service.request_password_reset(&payload.email).await?;
    Ok(StatusCode::ACCEPTED)
}

// POST /api/auth/password-reset/confirm
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;
    app_state.auth_service
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
