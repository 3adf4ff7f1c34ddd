// src/db/role_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RoleStore,
    models::role::{Role, RoleAssignment},
};

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // O histórico é só de inserção: promover ou rebaixar = nova linha.
    pub async fn insert_role(&self, principal_id: Uuid, role: Role) -> Result<RoleAssignment, AppError> {
        let assignment = sqlx::query_as::<_, RoleAssignment>(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            RETURNING id, user_id AS principal_id, role, created_at
            "#,
        )
        .bind(principal_id)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::UserNotFound;
                }
            }
            e.into()
        })?;

        Ok(assignment)
    }

    pub async fn list_history(&self, principal_id: Uuid) -> Result<Vec<RoleAssignment>, AppError> {
        let rows = sqlx::query_as::<_, RoleAssignment>(
            r#"
            SELECT id, user_id AS principal_id, role, created_at
            FROM user_roles
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl RoleStore for RoleRepository {
    async fn latest_role(&self, principal_id: Uuid) -> Result<Option<RoleAssignment>, AppError> {
        let row = sqlx::query_as::<_, RoleAssignment>(
            r#"
            SELECT id, user_id AS principal_id, role, created_at
            FROM user_roles
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
