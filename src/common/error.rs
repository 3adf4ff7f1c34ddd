// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Sessão não autenticada")]
    Unauthenticated,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // Sem perfil não existe autorização possível
    #[error("Perfil não encontrado")]
    ProfileNotFound,

    #[error("Equipe não encontrada")]
    TeamNotFound,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Tela desconhecida: {0}")]
    UnknownScreen(String),

    #[error("Cargo desconhecido: {0}")]
    UnknownRole(String),

    #[error("Revisão desatualizada (atual: {current})")]
    StaleRevision { current: i64 },

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::UnknownScreen(_)
            | AppError::UnknownRole(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists
            | AppError::StaleRevision { .. }
            | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::Unauthenticated
            | AppError::ProfileNotFound => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::TeamNotFound => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::StaleRevision { current } => {
                let body = Json(json!({
                    "error": "As permissões foram alteradas por outra pessoa. Recarregue e tente novamente.",
                    "currentRevision": current,
                }));
                return (status, body).into_response();
            }
            AppError::EmailAlreadyExists => "Este e-mail já está em uso.".to_string(),
            AppError::InvalidCredentials => "E-mail ou senha inválidos.".to_string(),
            AppError::InvalidToken => "Token de autenticação inválido ou ausente.".to_string(),
            AppError::Unauthenticated => "Sessão não autenticada.".to_string(),
            AppError::UserNotFound => "Usuário não encontrado.".to_string(),
            AppError::ProfileNotFound => "Perfil não encontrado para este usuário.".to_string(),
            AppError::TeamNotFound => "Equipe não encontrada.".to_string(),
            AppError::Forbidden(reason) => format!("Acesso negado: {}", reason),
            AppError::UnknownScreen(screen) => format!("Tela desconhecida: '{}'.", screen),
            AppError::UnknownRole(role) => format!("Cargo desconhecido: '{}'.", role),
            AppError::UniqueConstraintViolation(what) => what,

            // O resto vira 500; o detalhe fica só no log.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                "Ocorreu um erro inesperado.".to_string()
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
