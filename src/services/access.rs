// src/services/access.rs

//! Controle de acesso por sessão.
//!
//! Junta perfil + cargo + hierarquia de equipe em um único contexto imutável
//! e expõe predicados puros sobre ele. O estado é publicado em um canal
//! `watch`: leitores recebem `Arc<AccessSnapshot>` e nunca veem um contexto
//! montado pela metade.
//!
//! ```text
//! Unauthenticated ──sign-in──▶ Loading ──perfil ok──▶ Ready
//!                                  └──perfil falhou──▶ Failed
//! Ready / Failed ──sign-out──▶ Unauthenticated
//! ```
//!
//! Cada busca recebe uma geração; só a geração mais recente pode gravar.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{HierarchyStore, ProfileStore, RoleStore},
    models::{
        auth::AuthEvent,
        profile::Profile,
        role::{Capability, DataScope, Role},
        team::TeamHierarchy,
    },
};

/// Os colaboradores externos de onde o contexto é lido.
#[derive(Clone)]
pub struct AccessStores {
    pub profiles: Arc<dyn ProfileStore>,
    pub roles: Arc<dyn RoleStore>,
    pub hierarchy: Arc<dyn HierarchyStore>,
}

// ---
// 1. AccessContext (o contexto "pronto")
// ---
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub profile: Profile,
    pub role: Role,
    pub hierarchy: Option<TeamHierarchy>,
}

impl AccessContext {
    pub fn principal_id(&self) -> Uuid {
        self.profile.id
    }

    /// Só olha o conjunto de telas liberadas. Diretor/admin não ganham nada
    /// aqui: quem decide pular a checagem é o chamador.
    pub fn has_access(&self, screen: &str) -> bool {
        self.profile.allows_screen(screen)
    }

    pub fn grants(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }

    pub fn is_admin(&self) -> bool {
        self.grants(Capability::AdministerSystem)
    }

    pub fn is_director(&self) -> bool {
        self.grants(Capability::DirectOrganization)
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Gerente
    }

    pub fn is_broker(&self) -> bool {
        self.role == Role::Corretor
    }

    pub fn can_access_principal_data(&self, target_id: Uuid) -> bool {
        if target_id == self.principal_id() {
            return true;
        }
        match self.role.data_scope() {
            DataScope::All => true,
            // Sem hierarquia, nega.
            DataScope::Team => self
                .hierarchy
                .as_ref()
                .is_some_and(|h| h.has_member(target_id)),
            DataScope::Own => false,
        }
    }
}

// ---
// 2. AccessState / AccessSnapshot
// ---
#[derive(Debug, Clone)]
pub enum AccessState {
    Unauthenticated,
    Loading,
    Ready(AccessContext),
    // Perfil ausente ou ilegível: equivale a não autenticado.
    Failed,
}

#[derive(Debug, Clone)]
pub struct AccessSnapshot {
    generation: u64,
    state: AccessState,
}

impl AccessSnapshot {
    fn new(generation: u64, state: AccessState) -> Self {
        Self { generation, state }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &AccessState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AccessState::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, AccessState::Failed)
    }

    pub fn is_ready(&self) -> bool {
        self.context().is_some()
    }

    pub fn context(&self) -> Option<&AccessContext> {
        match &self.state {
            AccessState::Ready(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn principal_id(&self) -> Option<Uuid> {
        self.context().map(AccessContext::principal_id)
    }

    pub fn has_access(&self, screen: &str) -> bool {
        self.context().is_some_and(|ctx| ctx.has_access(screen))
    }

    pub fn is_admin(&self) -> bool {
        self.context().is_some_and(AccessContext::is_admin)
    }

    pub fn is_director(&self) -> bool {
        self.context().is_some_and(AccessContext::is_director)
    }

    pub fn is_manager(&self) -> bool {
        self.context().is_some_and(AccessContext::is_manager)
    }

    pub fn is_broker(&self) -> bool {
        self.context().is_some_and(AccessContext::is_broker)
    }

    pub fn effective_role(&self) -> Role {
        self.context().map(|ctx| ctx.role).unwrap_or(Role::DEFAULT)
    }

    pub fn can_access_principal_data(&self, target_id: Uuid) -> bool {
        self.context()
            .is_some_and(|ctx| ctx.can_access_principal_data(target_id))
    }

    pub fn require_ready(&self) -> Result<&AccessContext, AppError> {
        self.context().ok_or(AppError::Unauthenticated)
    }

    pub fn require(&self, capability: Capability) -> Result<&AccessContext, AppError> {
        let ctx = self.require_ready()?;
        if !ctx.grants(capability) {
            return Err(AppError::Forbidden(format!(
                "o cargo '{}' não permite esta ação",
                ctx.role
            )));
        }
        Ok(ctx)
    }

    pub fn require_principal_data(&self, target_id: Uuid) -> Result<&AccessContext, AppError> {
        let ctx = self.require_ready()?;
        if !ctx.can_access_principal_data(target_id) {
            return Err(AppError::Forbidden(
                "sem acesso aos dados deste usuário".into(),
            ));
        }
        Ok(ctx)
    }
}

/// Uma busca em andamento, marcada com a geração em que começou.
#[derive(Debug, Clone, Copy)]
pub struct FetchTicket {
    generation: u64,
    principal_id: Uuid,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ---
// 3. AccessResolver
// ---
pub struct AccessResolver {
    stores: AccessStores,
    state: watch::Sender<Arc<AccessSnapshot>>,
    generation: AtomicU64,
    initialized: AtomicBool,
}

impl AccessResolver {
    pub fn new(stores: AccessStores) -> Self {
        let (state, _) = watch::channel(Arc::new(AccessSnapshot::new(0, AccessState::Unauthenticated)));
        Self {
            stores,
            state,
            generation: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Arc<AccessSnapshot> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AccessSnapshot>> {
        self.state.subscribe()
    }

    /// Espera sair de `Loading` e devolve o snapshot resultante.
    pub async fn settled(&self) -> Arc<AccessSnapshot> {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|snapshot| !snapshot.is_loading()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }

    /// Checagem da sessão existente na subida. Roda no máximo uma vez.
    ///
    /// A marca de inicializado e o `Loading` saem juntos: quem perde a
    /// disputa já enxerga `Loading` e espera em `settled`.
    pub async fn initialize(&self, current_principal: Option<Uuid>) -> bool {
        let mut first = false;
        let mut ticket = None;
        self.state.send_if_modified(|current| {
            if self.initialized.swap(true, Ordering::SeqCst) {
                return false;
            }
            first = true;
            let Some(principal_id) = current_principal else {
                return false;
            };
            let generation = self.next_generation();
            *current = Arc::new(AccessSnapshot::new(generation, AccessState::Loading));
            ticket = Some(FetchTicket { generation, principal_id });
            true
        });

        if let Some(ticket) = ticket {
            self.complete(ticket).await;
        }
        first
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub async fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn { principal_id, .. } => {
                self.sign_in(principal_id).await;
            }
            AuthEvent::TokenRefreshed { principal_id, .. } => {
                self.refresh(principal_id).await;
            }
            AuthEvent::SignedOut { .. } => self.sign_out(),
        }
    }

    pub async fn sign_in(&self, principal_id: Uuid) -> bool {
        let ticket = self.begin(principal_id, true);
        self.complete(ticket).await
    }

    /// Recarrega mantendo o snapshot atual visível até a troca.
    pub async fn refresh(&self, principal_id: Uuid) -> bool {
        let ticket = self.begin(principal_id, false);
        self.complete(ticket).await
    }

    /// Limpa tudo na hora e invalida qualquer busca em andamento.
    /// Depois disso a checagem inicial não roda mais.
    pub fn sign_out(&self) {
        let mut generation = 0;
        self.state.send_modify(|current| {
            self.initialized.store(true, Ordering::SeqCst);
            generation = self.next_generation();
            *current = Arc::new(AccessSnapshot::new(generation, AccessState::Unauthenticated));
        });
        tracing::debug!("🔒 Contexto de acesso limpo (geração {})", generation);
    }

    /// Abre uma nova geração. Com `show_loading`, publica `Loading` já.
    /// Qualquer busca iniciada dispensa a checagem inicial.
    pub fn begin(&self, principal_id: Uuid, show_loading: bool) -> FetchTicket {
        let mut generation = 0;
        self.state.send_if_modified(|current| {
            self.initialized.store(true, Ordering::SeqCst);
            generation = self.next_generation();
            if !show_loading {
                return false;
            }
            *current = Arc::new(AccessSnapshot::new(generation, AccessState::Loading));
            true
        });
        FetchTicket { generation, principal_id }
    }

    /// Busca e grava o contexto. Retorna `false` se a geração ficou velha.
    pub async fn complete(&self, ticket: FetchTicket) -> bool {
        let state = self.fetch(ticket.principal_id).await;
        let committed = self.commit(ticket.generation, state);
        if !committed {
            tracing::debug!(
                "Resultado da geração {} descartado para {}",
                ticket.generation,
                ticket.principal_id
            );
        }
        committed
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, generation: u64, state: AccessState) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = Arc::new(AccessSnapshot::new(generation, state));
            true
        })
    }

    async fn fetch(&self, principal_id: Uuid) -> AccessState {
        let profile = match self.stores.profiles.find_profile(principal_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::error!("🔥 Nenhum perfil para o usuário {}", principal_id);
                return AccessState::Failed;
            }
            Err(e) => {
                tracing::error!("🔥 Falha ao buscar o perfil de {}: {}", principal_id, e);
                return AccessState::Failed;
            }
        };

        let (role, hierarchy) = tokio::join!(
            self.stores.roles.latest_role(principal_id),
            self.stores.hierarchy.team_hierarchy(principal_id),
        );

        let role = match role {
            Ok(row) => row.map(|r| r.role()).unwrap_or(Role::DEFAULT),
            Err(e) => {
                tracing::warn!("⚠️ Falha ao buscar o cargo de {}: {}; usando '{}'", principal_id, e, Role::DEFAULT);
                Role::DEFAULT
            }
        };

        let hierarchy = match hierarchy {
            Ok(hierarchy) => hierarchy,
            Err(e) => {
                tracing::warn!("⚠️ Falha ao buscar a equipe de {}: {}; sem acesso de equipe", principal_id, e);
                None
            }
        };

        AccessState::Ready(AccessContext { profile, role, hierarchy })
    }
}
