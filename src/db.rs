// src/db.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{profile::Profile, role::RoleAssignment, team::TeamHierarchy};

pub mod user_repo;
pub use user_repo::UserRepository;
pub mod profile_repo;
pub use profile_repo::ProfileRepository;
pub mod role_repo;
pub use role_repo::RoleRepository;
pub mod team_repo;
pub use team_repo::TeamRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;

// ---
// As três leituras que o controle de acesso faz por sessão.
// ---

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, principal_id: Uuid) -> Result<Option<Profile>, AppError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// A linha de cargo mais recente do usuário, se houver.
    async fn latest_role(&self, principal_id: Uuid) -> Result<Option<RoleAssignment>, AppError>;
}

#[async_trait]
pub trait HierarchyStore: Send + Sync {
    /// `None` quando o usuário não pertence nem gerencia nenhuma equipe.
    async fn team_hierarchy(&self, principal_id: Uuid) -> Result<Option<TeamHierarchy>, AppError>;
}

// ---
// Registro persistente de sessões.
// ---

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn open_session(
        &self,
        session_id: Uuid,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// `false` se a sessão não existe, expirou ou foi encerrada.
    async fn extend_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool, AppError>;

    async fn revoke_session(&self, session_id: Uuid) -> Result<(), AppError>;

    /// Aberta pelo usuário informado, não encerrada e dentro da validade.
    async fn is_session_active(&self, session_id: Uuid, principal_id: Uuid) -> Result<bool, AppError>;
}
