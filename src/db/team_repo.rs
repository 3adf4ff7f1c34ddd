// src/db/team_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::HierarchyStore,
    models::team::{Team, TeamHierarchy},
};

#[derive(Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

fn map_team_error(e: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(format!("Já existe uma equipe chamada '{}'.", name));
        }
        if db_err.is_foreign_key_violation() {
            return AppError::UserNotFound;
        }
    }
    e.into()
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        let teams = sqlx::query_as::<_, Team>(
            "SELECT id, name, description, manager_id, created_at, updated_at FROM teams ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(teams)
    }

    pub async fn create_team(
        &self,
        name: &str,
        description: Option<&str>,
        manager_id: Option<Uuid>,
    ) -> Result<Team, AppError> {
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, description, manager_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, manager_id, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(manager_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_team_error(e, name))
    }

    pub async fn update_team(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        manager_id: Option<Uuid>,
    ) -> Result<Team, AppError> {
        sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET name        = COALESCE($2, name),
                description = COALESCE($3, description),
                manager_id  = COALESCE($4, manager_id),
                updated_at  = now()
            WHERE id = $1
            RETURNING id, name, description, manager_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(manager_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_team_error(e, name.unwrap_or_default()))?
        .ok_or(AppError::TeamNotFound)
    }

    pub async fn exists<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM teams WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn delete_team<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::TeamNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl HierarchyStore for TeamRepository {
    async fn team_hierarchy(&self, principal_id: Uuid) -> Result<Option<TeamHierarchy>, AppError> {
        // Equipe gerenciada tem prioridade sobre a equipe da qual é membro.
        let hierarchy = sqlx::query_as::<_, TeamHierarchy>(
            r#"
            SELECT
                t.id   AS team_id,
                t.name AS team_name,
                (t.manager_id IS NOT DISTINCT FROM p.id) AS is_manager,
                ARRAY(
                    SELECT m.id FROM profiles m
                    WHERE m.team_id = t.id
                    ORDER BY m.full_name
                ) AS member_ids
            FROM profiles p
            JOIN teams t ON t.id = p.team_id OR t.manager_id = p.id
            WHERE p.id = $1
            ORDER BY (t.manager_id IS NOT DISTINCT FROM p.id) DESC, t.name
            LIMIT 1
            "#,
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hierarchy)
    }
}
