//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config)
        .await
        .context("Falha ao inicializar o estado da aplicação.")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/password-reset/request", post(handlers::auth::request_password_reset))
        .route("/password-reset/confirm", post(handlers::auth::reset_password));

    // Rotas de sessão (protegidas)
    let session_routes = Router::new()
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let me_routes = Router::new()
        .route("/", get(handlers::access::get_me))
        .route("/access/{screen}", get(handlers::access::check_screen))
        .route("/principals/{id}/access", get(handlers::access::check_principal))
        .route("/avatar", patch(handlers::profiles::update_avatar))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let profile_routes = Router::new()
        .route("/{id}"
               ,get(handlers::profiles::get_profile)
               .patch(handlers::profiles::update_profile)
        )
        .route("/{id}/screens", put(handlers::profiles::replace_screens))
        .route("/{id}/roles"
               ,get(handlers::profiles::list_roles)
               .post(handlers::profiles::assign_role)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let team_routes = Router::new()
        .route("/"
               ,get(handlers::teams::list_teams)
               .post(handlers::teams::create_team)
        )
        .route("/{id}"
               ,patch(handlers::teams::update_team)
               .delete(handlers::teams::delete_team)
        )
        .route("/{id}/members/{profile_id}"
               ,put(handlers::teams::add_member)
               .delete(handlers::teams::remove_member)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes.merge(session_routes))
        .nest("/api/me", me_routes)
        .nest("/api/profiles", profile_routes)
        .nest("/api/teams", team_routes)
        .with_state(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", config.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
