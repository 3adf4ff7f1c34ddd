// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

/// Catálogo fixo de telas do back-office.
pub const SCREEN_CATALOG: &[&str] = &[
    "dashboard",
    "vendas",
    "metas",
    "corretores",
    "equipes",
    "negociacoes",
    "follow-ups",
    "ranking",
    "relatorios",
    "configuracoes",
];

pub fn is_known_screen(screen: &str) -> bool {
    SCREEN_CATALOG.contains(&screen)
}

/// Valida contra o catálogo e remove duplicatas mantendo a ordem.
pub fn normalize_screens(screens: Vec<String>) -> Result<Vec<String>, AppError> {
    let mut normalized: Vec<String> = Vec::with_capacity(screens.len());
    for screen in screens {
        let screen = screen.trim().to_string();
        if !is_known_screen(&screen) {
            return Err(AppError::UnknownScreen(screen));
        }
        if !normalized.contains(&screen) {
            normalized.push(screen);
        }
    }
    Ok(normalized)
}

// ---
// Profile (o "Perfil" do usuário, 1:1 com users.id)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub approved: bool,
    pub team_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub allowed_screens: Vec<String>,
    // Incrementado a cada troca de telas (controle otimista)
    pub screens_revision: i64,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn allows_screen(&self, screen: &str) -> bool {
        self.allowed_screens.iter().any(|s| s == screen)
    }
}

// Substitui o conjunto inteiro de telas (nada de merge parcial)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScreensPayload {
    pub screens: Vec<String>,

    // Sem revisão: última escrita vence.
    #[validate(range(min = 0, message = "A revisão não pode ser negativa."))]
    pub expected_revision: Option<i64>,
}

// Campos administrativos do perfil
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    pub full_name: Option<String>,

    pub approved: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvatarPayload {
    #[validate(url(message = "A URL do avatar é inválida."))]
    pub avatar_url: String,
}
