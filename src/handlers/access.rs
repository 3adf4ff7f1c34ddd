// src/handlers/access.rs

use axum::{extract::Path, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::auth::CurrentSession,
    models::{role::Role, team::TeamHierarchy},
    services::access::AccessSnapshot,
};

// O que o frontend precisa para montar a navegação
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessSummary {
    pub principal_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub approved: bool,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_admin: bool,
    pub is_director: bool,
    pub is_manager: bool,
    pub is_broker: bool,
    pub allowed_screens: Vec<String>,
    pub screens_revision: i64,
    pub team: Option<TeamHierarchy>,
}

impl AccessSummary {
    pub fn from_snapshot(access: &AccessSnapshot) -> Result<Self, AppError> {
        let ctx = access.require_ready()?;
        Ok(Self {
            principal_id: ctx.principal_id(),
            full_name: ctx.profile.full_name.clone(),
            email: ctx.profile.email.clone(),
            approved: ctx.profile.approved,
            avatar_url: ctx.profile.avatar_url.clone(),
            role: ctx.role,
            is_admin: ctx.is_admin(),
            is_director: ctx.is_director(),
            is_manager: ctx.is_manager(),
            is_broker: ctx.is_broker(),
            allowed_screens: ctx.profile.allowed_screens.clone(),
            screens_revision: ctx.profile.screens_revision,
            team: ctx.hierarchy.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheck {
    pub allowed: bool,
}

// GET /api/me
pub async fn get_me(session: CurrentSession) -> Result<Json<AccessSummary>, AppError> {
    Ok(Json(AccessSummary::from_snapshot(&session.access)?))
}

// GET /api/me/access/{screen}
pub async fn check_screen(session: CurrentSession, Path(screen): Path<String>) -> Json<AccessCheck> {
    Json(AccessCheck {
        allowed: session.access.has_access(&screen),
    })
}

// GET /api/me/principals/{id}/access
pub async fn check_principal(session: CurrentSession, Path(target_id): Path<Uuid>) -> Json<AccessCheck> {
    Json(AccessCheck {
        allowed: session.access.can_access_principal_data(target_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{access::AccessResolver, testing::InMemoryDirectory};

    #[tokio::test]
    async fn summary_reflects_the_ready_context() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Zélia");
        dir.set_screens(p, &["dashboard", "vendas"]);
        dir.push_role(p, Role::Admin, 1);
        let resolver = AccessResolver::new(dir.stores());
        resolver.sign_in(p).await;

        let summary = AccessSummary::from_snapshot(&resolver.snapshot()).unwrap();
        assert_eq!(summary.principal_id, p);
        assert_eq!(summary.role, Role::Admin);
        assert!(summary.is_admin && summary.is_director);
        assert!(!summary.is_manager && !summary.is_broker);
        assert_eq!(summary.allowed_screens, vec!["dashboard", "vendas"]);
        assert!(summary.team.is_none());
    }

    #[tokio::test]
    async fn summary_is_refused_without_a_context() {
        let resolver = AccessResolver::new(InMemoryDirectory::new().stores());
        assert!(matches!(
            AccessSummary::from_snapshot(&resolver.snapshot()),
            Err(AppError::Unauthenticated)
        ));
    }
}
