// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProfileRepository, UserRepository},
    models::auth::{AuthEvent, Claims, IssuedToken, TokenPurpose},
    services::{access::AccessResolver, session::SessionRegistry},
};

// ---
// Tokens (JWT HS256)
// ---
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: String, session_ttl: Duration, reset_ttl: Duration) -> Self {
        Self { secret, session_ttl, reset_ttl }
    }

    pub fn issue(&self, principal_id: Uuid, session_id: Uuid, purpose: TokenPurpose) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let ttl = match purpose {
            TokenPurpose::Session => self.session_ttl,
            TokenPurpose::PasswordReset => self.reset_ttl,
        };
        let expires_at = now + ttl;

        let claims = Claims {
            sub: principal_id,
            sid: session_id,
            purpose,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Valida assinatura, expiração e finalidade do token.
    pub fn decode(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        if token_data.claims.purpose != purpose {
            return Err(AppError::InvalidToken);
        }
        Ok(token_data.claims)
    }
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

// ---
// Provedor de identidade
// ---
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    profile_repo: ProfileRepository,
    tokens: TokenService,
    sessions: Arc<SessionRegistry>,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        profile_repo: ProfileRepository,
        tokens: TokenService,
        sessions: Arc<SessionRegistry>,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, profile_repo, tokens, sessions, pool }
    }

    /// Cria credenciais + perfil na mesma transação e já abre a sessão.
    pub async fn register_user(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        let hashed_password = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        let new_user = self.user_repo
            .create_user(&mut *tx, email, &hashed_password)
            .await?;

        // Sem cargo gravado: o cargo efetivo é "corretor".
        self.profile_repo
            .create_profile(&mut *tx, new_user.id, full_name, email)
            .await?;

        tx.commit().await?;

        tracing::info!("🆕 Usuário {} cadastrado (aguardando aprovação)", new_user.id);
        self.start_session(new_user.id).await
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self.user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.start_session(user.id).await
    }

    /// "Sessão atual": o token é válido e a sessão continua aberta.
    pub async fn current_session(&self, token: &str) -> Result<(Claims, Arc<AccessResolver>), AppError> {
        let claims = self.tokens.decode(token, TokenPurpose::Session)?;
        let resolver = self.sessions
            .resolve(claims.sid, claims.sub, claims.expires_at())
            .await?;
        Ok((claims, resolver))
    }

    /// Emite um token novo para a mesma sessão. Sessão encerrada não renova.
    pub async fn refresh_token(&self, claims: &Claims) -> Result<String, AppError> {
        let issued = self.tokens.issue(claims.sub, claims.sid, TokenPurpose::Session)?;
        self.sessions
            .apply(AuthEvent::TokenRefreshed {
                session_id: claims.sid,
                principal_id: claims.sub,
                expires_at: issued.expires_at,
            })
            .await?;
        Ok(issued.token)
    }

    pub async fn sign_out(&self, claims: &Claims) -> Result<(), AppError> {
        self.sessions
            .apply(AuthEvent::SignedOut {
                session_id: claims.sid,
                expires_at: claims.expires_at(),
            })
            .await
    }

    /// Nunca revela se o e-mail existe. A entrega do link fica fora daqui.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        match self.user_repo.find_by_email(email).await? {
            Some(user) => {
                let issued = self.tokens.issue(user.id, Uuid::new_v4(), TokenPurpose::PasswordReset)?;
                tracing::info!("✉️ Redefinição de senha solicitada para {}", user.id);
                tracing::debug!("Token de redefinição para {}: {}", user.id, issued.token);
            }
            None => {
                tracing::debug!("Redefinição solicitada para e-mail desconhecido");
            }
        }
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let claims = self.tokens.decode(token, TokenPurpose::PasswordReset)?;
        let hashed_password = hash_password(new_password).await?;
        self.user_repo.update_password(claims.sub, &hashed_password).await?;
        tracing::info!("🔐 Senha redefinida para {}", claims.sub);
        Ok(())
    }

    async fn start_session(&self, principal_id: Uuid) -> Result<String, AppError> {
        let session_id = Uuid::new_v4();
        let issued = self.tokens.issue(principal_id, session_id, TokenPurpose::Session)?;
        self.sessions
            .apply(AuthEvent::SignedIn {
                session_id,
                principal_id,
                expires_at: issued.expires_at,
            })
            .await?;
        Ok(issued.token)
    }
}
