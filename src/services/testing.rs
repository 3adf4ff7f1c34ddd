// src/services/testing.rs

//! Colaboradores em memória para os testes do controle de acesso.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{HierarchyStore, ProfileStore, RoleStore, SessionStore},
    models::{
        profile::Profile,
        role::{latest_assignment, Role, RoleAssignment},
        team::TeamHierarchy,
    },
    services::access::AccessStores,
};

struct TestTeam {
    name: String,
    manager_id: Option<Uuid>,
}

struct TestSession {
    principal_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl TestSession {
    fn is_open(&self) -> bool {
        !self.revoked && self.expires_at > Utc::now()
    }
}

#[derive(Default)]
struct Directory {
    profiles: HashMap<Uuid, Profile>,
    roles: Vec<RoleAssignment>,
    teams: HashMap<Uuid, TestTeam>,
    sessions: HashMap<Uuid, TestSession>,
    // Segura a próxima leitura até `notify_one`.
    profile_gate: Option<Arc<Notify>>,
    session_gate: Option<Arc<Notify>>,
    fail_profiles: bool,
    fail_roles: bool,
    fail_hierarchy: bool,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    inner: Mutex<Directory>,
}

fn unavailable() -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("serviço indisponível"))
}

impl InMemoryDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stores(self: &Arc<Self>) -> AccessStores {
        AccessStores {
            profiles: self.clone(),
            roles: self.clone(),
            hierarchy: self.clone(),
        }
    }

    pub fn add_profile(&self, full_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let profile = Profile {
            id,
            full_name: full_name.to_string(),
            email: format!("{}@imobiliaria.test", id.simple()),
            approved: true,
            team_id: None,
            manager_id: None,
            allowed_screens: Vec::new(),
            screens_revision: 0,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().profiles.insert(id, profile);
        id
    }

    pub fn set_screens(&self, principal_id: Uuid, screens: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        let profile = inner.profiles.get_mut(&principal_id).unwrap();
        profile.allowed_screens = screens.iter().map(|s| s.to_string()).collect();
        profile.screens_revision += 1;
    }

    /// Insere uma linha de cargo com `created_at` em segundos desde a época.
    pub fn push_role(&self, principal_id: Uuid, role: Role, created_at_secs: i64) {
        self.inner.lock().unwrap().roles.push(RoleAssignment {
            id: Uuid::new_v4(),
            principal_id,
            role: role.as_str().to_string(),
            created_at: Utc.timestamp_opt(created_at_secs, 0).unwrap(),
        });
    }

    pub fn create_team(&self, name: &str, manager_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().teams.insert(
            id,
            TestTeam {
                name: name.to_string(),
                manager_id,
            },
        );
        id
    }

    pub fn join_team(&self, principal_id: Uuid, team_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        inner.profiles.get_mut(&principal_id).unwrap().team_id = Some(team_id);
    }

    pub fn leave_team(&self, principal_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        inner.profiles.get_mut(&principal_id).unwrap().team_id = None;
    }

    /// Sessão gravada por um processo anterior.
    pub fn seed_session(&self, session_id: Uuid, principal_id: Uuid, expires_at: DateTime<Utc>) {
        self.inner.lock().unwrap().sessions.insert(
            session_id,
            TestSession {
                principal_id,
                expires_at,
                revoked: false,
            },
        );
    }

    /// A próxima leitura de perfil só termina depois de `notify_one`.
    pub fn pause_profiles(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().unwrap().profile_gate = Some(gate.clone());
        gate
    }

    /// A próxima checagem de sessão responde com o estado de agora, mas só
    /// devolve depois de `notify_one`.
    pub fn pause_session_checks(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().unwrap().session_gate = Some(gate.clone());
        gate
    }

    pub fn fail_profiles(&self, fail: bool) {
        self.inner.lock().unwrap().fail_profiles = fail;
    }

    pub fn fail_roles(&self, fail: bool) {
        self.inner.lock().unwrap().fail_roles = fail;
    }

    pub fn fail_hierarchy(&self, fail: bool) {
        self.inner.lock().unwrap().fail_hierarchy = fail;
    }
}

#[async_trait]
impl ProfileStore for InMemoryDirectory {
    async fn find_profile(&self, principal_id: Uuid) -> Result<Option<Profile>, AppError> {
        let gate = self.inner.lock().unwrap().profile_gate.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let inner = self.inner.lock().unwrap();
        if inner.fail_profiles {
            return Err(unavailable());
        }
        Ok(inner.profiles.get(&principal_id).cloned())
    }
}

#[async_trait]
impl RoleStore for InMemoryDirectory {
    async fn latest_role(&self, principal_id: Uuid) -> Result<Option<RoleAssignment>, AppError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_roles {
            return Err(unavailable());
        }
        let history: Vec<RoleAssignment> = inner
            .roles
            .iter()
            .filter(|row| row.principal_id == principal_id)
            .cloned()
            .collect();
        Ok(latest_assignment(&history).cloned())
    }
}

#[async_trait]
impl HierarchyStore for InMemoryDirectory {
    async fn team_hierarchy(&self, principal_id: Uuid) -> Result<Option<TeamHierarchy>, AppError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_hierarchy {
            return Err(unavailable());
        }
        let Some(profile) = inner.profiles.get(&principal_id) else {
            return Ok(None);
        };

        let managed = inner
            .teams
            .iter()
            .find(|(_, team)| team.manager_id == Some(principal_id))
            .map(|(id, _)| *id);
        let Some(team_id) = managed.or(profile.team_id) else {
            return Ok(None);
        };
        let Some(team) = inner.teams.get(&team_id) else {
            return Ok(None);
        };

        let mut members: Vec<&Profile> = inner
            .profiles
            .values()
            .filter(|p| p.team_id == Some(team_id))
            .collect();
        members.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        Ok(Some(TeamHierarchy {
            team_id,
            team_name: team.name.clone(),
            is_manager: team.manager_id == Some(principal_id),
            member_ids: members.into_iter().map(|p| p.id).collect(),
        }))
    }
}

#[async_trait]
impl SessionStore for InMemoryDirectory {
    async fn open_session(
        &self,
        session_id: Uuid,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.seed_session(session_id, principal_id, expires_at);
        Ok(())
    }

    async fn extend_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.sessions.get_mut(&session_id) {
            Some(session) if session.is_open() => {
                session.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<(), AppError> {
        if let Some(session) = self.inner.lock().unwrap().sessions.get_mut(&session_id) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn is_session_active(&self, session_id: Uuid, principal_id: Uuid) -> Result<bool, AppError> {
        let (active, gate) = {
            let mut inner = self.inner.lock().unwrap();
            let active = inner
                .sessions
                .get(&session_id)
                .is_some_and(|session| session.principal_id == principal_id && session.is_open());
            (active, inner.session_gate.take())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(active)
    }
}
