// src/models/team.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Team (a "Equipe")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. TeamHierarchy (derivada, nunca gravada)
// ---
// A equipe do usuário (ou a que ele gerencia) e quem faz parte dela.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamHierarchy {
    pub team_id: Uuid,
    pub team_name: String,
    pub is_manager: bool,
    pub member_ids: Vec<Uuid>,
}

impl TeamHierarchy {
    pub fn has_member(&self, principal_id: Uuid) -> bool {
        self.member_ids.contains(&principal_id)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamPayload {
    #[validate(length(min = 2, max = 80, message = "O nome da equipe deve ter entre 2 e 80 caracteres."))]
    pub name: String,

    pub description: Option<String>,

    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamPayload {
    #[validate(length(min = 2, max = 80, message = "O nome da equipe deve ter entre 2 e 80 caracteres."))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub manager_id: Option<Uuid>,
}
