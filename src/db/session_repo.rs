// src/db/session_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::SessionStore};

// Sessões persistidas: sobrevivem a um reinício do processo.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apaga sessões vencidas (encerradas ou não).
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn open_session(
        &self,
        session_id: Uuid,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(session_id)
        .bind(principal_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        // Aproveita o login para limpar o que já venceu.
        let purged = self.purge_expired().await?;
        if purged > 0 {
            tracing::debug!("🧹 {} sessões vencidas removidas", purged);
        }
        Ok(())
    }

    async fn extend_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET expires_at = $2
            WHERE id = $1
              AND revoked_at IS NULL
              AND expires_at > now()
            "#,
        )
        .bind(session_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET revoked_at = now() WHERE id = $1 AND revoked_at IS NULL")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_session_active(&self, session_id: Uuid, principal_id: Uuid) -> Result<bool, AppError> {
        let active = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE id = $1
                  AND user_id = $2
                  AND revoked_at IS NULL
                  AND expires_at > now()
            )
            "#,
        )
        .bind(session_id)
        .bind(principal_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(active)
    }
}
