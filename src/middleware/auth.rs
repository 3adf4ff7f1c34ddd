// src/middleware/auth.rs

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::Claims,
    services::access::AccessSnapshot,
};

// O guardião das rotas protegidas: token válido + contexto de acesso pronto.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;

    let (claims, resolver) = app_state.auth_service.current_session(bearer.token()).await?;

    // Segura a requisição enquanto o contexto carrega.
    let access = resolver.settled().await;
    if access.is_failed() {
        return Err(AppError::ProfileNotFound);
    }
    if access.principal_id() != Some(claims.sub) {
        tracing::debug!("Sessão {} sem contexto pronto", claims.sid);
        return Err(AppError::Unauthenticated);
    }

    request.extensions_mut().insert(CurrentSession { claims, access });
    Ok(next.run(request).await)
}

// Extrator para obter a sessão (e o snapshot de acesso) nos handlers
#[derive(Clone)]
pub struct CurrentSession {
    pub claims: Claims,
    pub access: Arc<AccessSnapshot>,
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
