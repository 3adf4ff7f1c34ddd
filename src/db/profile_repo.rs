// src/db/profile_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProfileStore,
    models::profile::{Profile, UpdateProfilePayload},
};

const PROFILE_COLUMNS: &str = r#"
    id, full_name, email, approved, team_id, manager_id,
    allowed_screens, screens_revision, avatar_url, created_at, updated_at
"#;

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    // Perfil nasce junto com as credenciais: sem aprovação e sem telas.
    pub async fn create_profile<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (id, full_name, email)
            VALUES ($1, $2, $3)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_one(executor)
        .await?;
        Ok(profile)
    }

    /// Atualização parcial: campos `None` ficam como estão.
    pub async fn update_fields(
        &self,
        id: Uuid,
        payload: &UpdateProfilePayload,
    ) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET full_name  = COALESCE($2, full_name),
                approved   = COALESCE($3, approved),
                updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.full_name.as_deref())
        .bind(payload.approved)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::UserNotFound)
    }

    pub async fn update_avatar(&self, id: Uuid, avatar_url: &str) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET avatar_url = $2, updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::UserNotFound)
    }

    /// Substitui o array inteiro de telas. Com `expected_revision`, a escrita
    /// só acontece se ninguém mexeu no array desde a leitura.
    pub async fn replace_screens(
        &self,
        id: Uuid,
        screens: &[String],
        expected_revision: Option<i64>,
    ) -> Result<Profile, AppError> {
        let updated = sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET allowed_screens  = $2,
                screens_revision = screens_revision + 1,
                updated_at       = now()
            WHERE id = $1
              AND ($3::BIGINT IS NULL OR screens_revision = $3)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(screens)
        .bind(expected_revision)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(profile) => Ok(profile),
            None => match self.find_by_id(id).await? {
                Some(current) => Err(AppError::StaleRevision {
                    current: current.screens_revision,
                }),
                None => Err(AppError::UserNotFound),
            },
        }
    }

    pub async fn set_team<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE profiles SET team_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(team_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    /// Sai da equipe só se ainda estiver nela. `false` quando o perfil não
    /// existe ou já está em outra equipe (ou em nenhuma).
    pub async fn leave_team(&self, id: Uuid, team_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE profiles SET team_id = NULL, updated_at = now() WHERE id = $1 AND team_id = $2",
        )
        .bind(id)
        .bind(team_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Desvincula todos os membros de uma equipe (sem apagar ninguém).
    pub async fn detach_team_members<'e, E>(&self, executor: E, team_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE profiles SET team_id = NULL, updated_at = now() WHERE team_id = $1",
        )
        .bind(team_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn find_profile(&self, principal_id: Uuid) -> Result<Option<Profile>, AppError> {
        self.find_by_id(principal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{TeamRepository, UserRepository};

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn leaving_an_old_team_keeps_the_new_membership(pool: PgPool) {
        let user = UserRepository::new(pool.clone())
            .create_user(&pool, "lia@imobiliaria.test", "hash")
            .await
            .unwrap();
        let profiles = ProfileRepository::new(pool.clone());
        profiles
            .create_profile(&pool, user.id, "Lia", "lia@imobiliaria.test")
            .await
            .unwrap();

        let teams = TeamRepository::new(pool.clone());
        let centro = teams.create_team("Centro", None, None).await.unwrap();
        let sul = teams.create_team("Zona Sul", None, None).await.unwrap();
        profiles.set_team(&pool, user.id, Some(sul.id)).await.unwrap();

        assert!(!profiles.leave_team(user.id, centro.id).await.unwrap());
        let current = profiles.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(current.team_id, Some(sul.id));

        assert!(profiles.leave_team(user.id, sul.id).await.unwrap());
        let current = profiles.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(current.team_id, None);
    }
}
