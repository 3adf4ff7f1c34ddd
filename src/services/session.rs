// src/services/session.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SessionStore,
    models::auth::AuthEvent,
    services::access::{AccessResolver, AccessStores},
};

struct LiveSession {
    resolver: Arc<AccessResolver>,
    expires_at: DateTime<Utc>,
}

// Sessões vivas e encerradas ficam sob a mesma trava.
#[derive(Default)]
struct SessionsState {
    live: HashMap<Uuid, LiveSession>,
    // Encerradas por este processo, até o token vencer.
    closed: HashMap<Uuid, DateTime<Utc>>,
}

impl SessionsState {
    fn prune(&mut self, now: DateTime<Utc>) {
        self.live.retain(|_, session| session.expires_at > now);
        self.closed.retain(|_, expires_at| *expires_at > now);
    }
}

/// Um `AccessResolver` por sessão (um por login).
pub struct SessionRegistry {
    stores: AccessStores,
    ledger: Arc<dyn SessionStore>,
    state: RwLock<SessionsState>,
}

impl SessionRegistry {
    pub fn new(stores: AccessStores, ledger: Arc<dyn SessionStore>) -> Self {
        Self {
            stores,
            ledger,
            state: RwLock::new(SessionsState::default()),
        }
    }

    /// Aplica um evento do provedor de identidade.
    ///
    /// O evento é gravado no banco antes de mexer na memória. Login e
    /// renovação buscam o contexto em segundo plano; logout limpa antes de
    /// retornar.
    pub async fn apply(&self, event: AuthEvent) -> Result<(), AppError> {
        match event {
            AuthEvent::SignedIn { session_id, principal_id, expires_at } => {
                self.ledger.open_session(session_id, principal_id, expires_at).await?;

                let resolver = Arc::new(AccessResolver::new(self.stores.clone()));
                {
                    let mut state = self.state.write().await;
                    state.prune(Utc::now());
                    state.live.insert(
                        session_id,
                        LiveSession { resolver: resolver.clone(), expires_at },
                    );
                }

                let ticket = resolver.begin(principal_id, true);
                tracing::info!("🔑 Sessão {} iniciada para {}", session_id, principal_id);
                tokio::spawn(async move {
                    resolver.complete(ticket).await;
                });
            }
            AuthEvent::TokenRefreshed { session_id, principal_id, expires_at } => {
                if !self.ledger.extend_session(session_id, expires_at).await? {
                    tracing::warn!("Renovação recusada: sessão {} encerrada ou vencida", session_id);
                    return Err(AppError::InvalidToken);
                }

                let resolver = {
                    let mut state = self.state.write().await;
                    state.prune(Utc::now());
                    if state.closed.contains_key(&session_id) {
                        return Err(AppError::InvalidToken);
                    }
                    let session = state.live.entry(session_id).or_insert_with(|| LiveSession {
                        resolver: Arc::new(AccessResolver::new(self.stores.clone())),
                        expires_at,
                    });
                    session.expires_at = expires_at;
                    session.resolver.clone()
                };

                let ticket = resolver.begin(principal_id, false);
                tracing::debug!("🔄 Token renovado na sessão {}", session_id);
                tokio::spawn(async move {
                    resolver.complete(ticket).await;
                });
            }
            AuthEvent::SignedOut { session_id, expires_at } => {
                self.ledger.revoke_session(session_id).await?;

                let removed = {
                    let mut state = self.state.write().await;
                    state.prune(Utc::now());
                    state.closed.insert(session_id, expires_at);
                    state.live.remove(&session_id)
                };
                if let Some(session) = removed {
                    session.resolver.sign_out();
                }
                tracing::info!("👋 Sessão {} encerrada", session_id);
            }
        }
        Ok(())
    }

    /// Resolver de uma sessão válida. Se o processo ainda não conhece a
    /// sessão (ex.: reinício), consulta o banco e faz a checagem inicial.
    pub async fn resolve(
        &self,
        session_id: Uuid,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Arc<AccessResolver>, AppError> {
        let resolver = match self.live_resolver(session_id).await {
            Some(resolver) => resolver,
            None => {
                if !self.ledger.is_session_active(session_id, principal_id).await? {
                    return Err(AppError::InvalidToken);
                }

                // "Encerrada?" e a inserção acontecem sob a mesma trava.
                let mut state = self.state.write().await;
                state.prune(Utc::now());
                if state.closed.contains_key(&session_id) {
                    return Err(AppError::InvalidToken);
                }
                let session = state.live.entry(session_id).or_insert_with(|| LiveSession {
                    resolver: Arc::new(AccessResolver::new(self.stores.clone())),
                    expires_at,
                });
                session.resolver.clone()
            }
        };

        if resolver.initialize(Some(principal_id)).await {
            tracing::debug!("Sessão existente {} carregada para {}", session_id, principal_id);
        }
        Ok(resolver)
    }

    pub async fn active_sessions(&self) -> usize {
        self.state.read().await.live.len()
    }

    pub async fn closed_sessions(&self) -> usize {
        self.state.read().await.closed.len()
    }

    async fn live_resolver(&self, session_id: Uuid) -> Option<Arc<AccessResolver>> {
        let state = self.state.read().await;
        let resolver = state
            .live
            .get(&session_id)
            .filter(|session| session.expires_at > Utc::now())
            .map(|session| session.resolver.clone());
        resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use crate::services::testing::InMemoryDirectory;
    use chrono::Duration;

    fn registry(dir: &Arc<InMemoryDirectory>) -> SessionRegistry {
        SessionRegistry::new(dir.stores(), dir.clone())
    }

    fn in_one_hour() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    #[tokio::test]
    async fn sign_in_event_produces_a_ready_session() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Tânia");
        dir.push_role(p, Role::Gerente, 1);
        let registry = registry(&dir);
        let (session_id, expires_at) = (Uuid::new_v4(), in_one_hour());

        registry
            .apply(AuthEvent::SignedIn { session_id, principal_id: p, expires_at })
            .await
            .unwrap();

        let resolver = registry.resolve(session_id, p, expires_at).await.unwrap();
        let snap = resolver.settled().await;
        assert!(snap.is_manager());
        assert_eq!(registry.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn known_session_is_initialized_lazily_after_restart() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Ulisses");
        dir.set_screens(p, &["dashboard"]);
        let (session_id, expires_at) = (Uuid::new_v4(), in_one_hour());
        dir.seed_session(session_id, p, expires_at);

        let resolver = registry(&dir).resolve(session_id, p, expires_at).await.unwrap();
        assert!(resolver.snapshot().has_access("dashboard"));
    }

    #[tokio::test]
    async fn session_unknown_to_the_database_is_rejected() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Valéria");
        let registry = registry(&dir);

        assert!(matches!(
            registry.resolve(Uuid::new_v4(), p, in_one_hour()).await,
            Err(AppError::InvalidToken)
        ));
        assert_eq!(registry.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn session_of_another_user_is_rejected() {
        let dir = InMemoryDirectory::new();
        let owner = dir.add_profile("Dono");
        let intruder = dir.add_profile("Intruso");
        let (session_id, expires_at) = (Uuid::new_v4(), in_one_hour());
        dir.seed_session(session_id, owner, expires_at);

        assert!(matches!(
            registry(&dir).resolve(session_id, intruder, expires_at).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn signed_out_session_is_rejected() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Vera");
        dir.push_role(p, Role::Admin, 1);
        let registry = registry(&dir);
        let (session_id, expires_at) = (Uuid::new_v4(), in_one_hour());
        dir.seed_session(session_id, p, expires_at);

        let resolver = registry.resolve(session_id, p, expires_at).await.unwrap();
        assert!(resolver.snapshot().is_admin());

        registry
            .apply(AuthEvent::SignedOut { session_id, expires_at })
            .await
            .unwrap();

        assert!(!resolver.snapshot().is_admin());
        assert!(matches!(
            registry.resolve(session_id, p, expires_at).await,
            Err(AppError::InvalidToken)
        ));
        assert_eq!(registry.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn signed_out_session_stays_closed_after_restart() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Wilma");
        let (session_id, expires_at) = (Uuid::new_v4(), in_one_hour());

        let before = registry(&dir);
        before
            .apply(AuthEvent::SignedIn { session_id, principal_id: p, expires_at })
            .await
            .unwrap();
        before
            .apply(AuthEvent::SignedOut { session_id, expires_at })
            .await
            .unwrap();

        let after = registry(&dir);
        assert!(matches!(
            after.resolve(session_id, p, expires_at).await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            after
                .apply(AuthEvent::TokenRefreshed { session_id, principal_id: p, expires_at })
                .await,
            Err(AppError::InvalidToken)
        ));
        assert_eq!(after.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn sign_out_during_a_database_check_wins() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Xênia");
        let registry = registry(&dir);
        let (session_id, expires_at) = (Uuid::new_v4(), in_one_hour());
        dir.seed_session(session_id, p, expires_at);
        let gate = dir.pause_session_checks();

        let (resolved, _) = tokio::join!(registry.resolve(session_id, p, expires_at), async {
            registry
                .apply(AuthEvent::SignedOut { session_id, expires_at })
                .await
                .unwrap();
            gate.notify_one();
        });

        assert!(matches!(resolved, Err(AppError::InvalidToken)));
        assert_eq!(registry.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Yolanda");
        let registry = registry(&dir);
        let expired = Utc::now() - Duration::minutes(1);

        for _ in 0..3 {
            let session_id = Uuid::new_v4();
            registry
                .apply(AuthEvent::SignedIn { session_id, principal_id: p, expires_at: expired })
                .await
                .unwrap();
            registry
                .apply(AuthEvent::SignedOut { session_id, expires_at: expired })
                .await
                .unwrap();
            registry
                .apply(AuthEvent::SignedIn { session_id: Uuid::new_v4(), principal_id: p, expires_at: expired })
                .await
                .unwrap();
        }

        registry
            .apply(AuthEvent::SignedIn { session_id: Uuid::new_v4(), principal_id: p, expires_at: in_one_hour() })
            .await
            .unwrap();

        assert_eq!(registry.active_sessions().await, 1);
        assert_eq!(registry.closed_sessions().await, 0);
    }

    #[tokio::test]
    async fn token_refresh_picks_up_new_grants() {
        let dir = InMemoryDirectory::new();
        let p = dir.add_profile("Wagner");
        let registry = registry(&dir);
        let (session_id, expires_at) = (Uuid::new_v4(), in_one_hour());
        dir.seed_session(session_id, p, expires_at);

        let resolver = registry.resolve(session_id, p, expires_at).await.unwrap();
        assert!(!resolver.snapshot().has_access("metas"));

        dir.set_screens(p, &["metas"]);
        let mut rx = resolver.subscribe();
        registry
            .apply(AuthEvent::TokenRefreshed { session_id, principal_id: p, expires_at: in_one_hour() })
            .await
            .unwrap();
        rx.wait_for(|snap| snap.has_access("metas")).await.unwrap();
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let dir = InMemoryDirectory::new();
        let admin = dir.add_profile("Xavier");
        dir.push_role(admin, Role::Admin, 1);
        let broker = dir.add_profile("Yara");
        let registry = registry(&dir);
        let (admin_sid, broker_sid, expires_at) = (Uuid::new_v4(), Uuid::new_v4(), in_one_hour());
        dir.seed_session(admin_sid, admin, expires_at);
        dir.seed_session(broker_sid, broker, expires_at);

        let admin_session = registry.resolve(admin_sid, admin, expires_at).await.unwrap();
        let broker_session = registry.resolve(broker_sid, broker, expires_at).await.unwrap();

        assert!(admin_session.snapshot().is_admin());
        assert!(broker_session.snapshot().is_broker());
        assert!(!broker_session.snapshot().can_access_principal_data(admin));
    }
}
