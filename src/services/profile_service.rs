// src/services/profile_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProfileRepository,
    models::{
        profile::{normalize_screens, Profile, UpdateProfilePayload, UpdateScreensPayload},
        role::Capability,
    },
    services::access::AccessSnapshot,
};

#[derive(Clone)]
pub struct ProfileService {
    repo: ProfileRepository,
}

impl ProfileService {
    pub fn new(repo: ProfileRepository) -> Self {
        Self { repo }
    }

    pub async fn get_profile(&self, access: &AccessSnapshot, target_id: Uuid) -> Result<Profile, AppError> {
        access.require_principal_data(target_id)?;
        self.repo
            .find_by_id(target_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Aprovação e nome: só administradores.
    pub async fn update_profile(
        &self,
        access: &AccessSnapshot,
        target_id: Uuid,
        payload: &UpdateProfilePayload,
    ) -> Result<Profile, AppError> {
        let admin = access.require(Capability::AdministerSystem)?;
        let profile = self.repo.update_fields(target_id, payload).await?;

        if let Some(approved) = payload.approved {
            tracing::info!(
                "✅ Perfil {} {} por {}",
                target_id,
                if approved { "aprovado" } else { "reprovado" },
                admin.principal_id()
            );
        }
        Ok(profile)
    }

    /// Troca o conjunto inteiro de telas liberadas. Quem quiser "adicionar
    /// uma tela" lê, altera e grava o array completo.
    pub async fn replace_screens(
        &self,
        access: &AccessSnapshot,
        target_id: Uuid,
        payload: UpdateScreensPayload,
    ) -> Result<Profile, AppError> {
        let admin = access.require(Capability::AdministerSystem)?;
        let screens = normalize_screens(payload.screens)?;

        let profile = self.repo
            .replace_screens(target_id, &screens, payload.expected_revision)
            .await?;

        tracing::info!(
            "🖥️ Telas de {} atualizadas por {} (revisão {}): {:?}",
            target_id,
            admin.principal_id(),
            profile.screens_revision,
            profile.allowed_screens
        );
        Ok(profile)
    }

    /// O avatar é do próprio usuário.
    pub async fn update_avatar(&self, access: &AccessSnapshot, avatar_url: &str) -> Result<Profile, AppError> {
        let ctx = access.require_ready()?;
        self.repo.update_avatar(ctx.principal_id(), avatar_url).await
    }
}
