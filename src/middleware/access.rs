// src/middleware/access.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{common::error::AppError, middleware::auth::CurrentSession};

/// 1. O Trait que define uma Tela do catálogo
pub trait ScreenDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião da tela)
///
/// Diretores e administradores passam direto; os demais precisam da tela no
/// perfil. O resolver em si nunca faz esse desvio.
pub struct RequireScreen<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireScreen<T>
where
    T: ScreenDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state).await?;
        let access = &session.access;
        let screen = T::slug();

        if access.is_director() || access.has_access(screen) {
            return Ok(RequireScreen(PhantomData));
        }

        Err(AppError::Forbidden(format!(
            "a tela '{}' não está liberada para você",
            screen
        )))
    }
}

// ---
// DEFINIÇÃO DAS TELAS (TIPOS)
// ---

pub struct ScreenEquipes;
impl ScreenDef for ScreenEquipes {
    fn slug() -> &'static str { "equipes" }
}
