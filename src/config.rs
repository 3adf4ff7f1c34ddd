// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{ProfileRepository, RoleRepository, SessionRepository, TeamRepository, UserRepository},
    services::{
        access::AccessStores,
        auth::{AuthService, TokenService},
        profile_service::ProfileService,
        role_service::RoleService,
        session::SessionRegistry,
        team_service::TeamService,
    },
};

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub session_ttl: chrono::Duration,
    pub reset_ttl: chrono::Duration,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} tem um valor inválido: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5)?,
            session_ttl: chrono::Duration::hours(env_or("SESSION_TTL_HOURS", 168)?),
            reset_ttl: chrono::Duration::minutes(env_or("RESET_TTL_MINUTES", 30)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub role_service: RoleService,
    pub team_service: TeamService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let profile_repo = ProfileRepository::new(db_pool.clone());
        let role_repo = RoleRepository::new(db_pool.clone());
        let team_repo = TeamRepository::new(db_pool.clone());

        let stores = AccessStores {
            profiles: Arc::new(profile_repo.clone()),
            roles: Arc::new(role_repo.clone()),
            hierarchy: Arc::new(team_repo.clone()),
        };
        let session_repo = SessionRepository::new(db_pool.clone());
        let sessions = Arc::new(SessionRegistry::new(stores, Arc::new(session_repo)));

        let tokens = TokenService::new(config.jwt_secret.clone(), config.session_ttl, config.reset_ttl);
        let auth_service = AuthService::new(
            user_repo,
            profile_repo.clone(),
            tokens,
            sessions,
            db_pool.clone(),
        );

        Ok(Self {
            profile_service: ProfileService::new(profile_repo.clone()),
            role_service: RoleService::new(role_repo),
            team_service: TeamService::new(team_repo, profile_repo, db_pool.clone()),
            db_pool,
            auth_service,
        })
    }
}
