// src/models/role.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// ---
// 1. Role (o "Cargo")
// ---
// Ordem do reticulado: Corretor < Gerente < Diretor < Admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Corretor,
    Gerente,
    Diretor,
    Admin,
}

/// O que cada cargo pode fazer. As checagens de permissão testam capacidades,
/// nunca comparam nomes de cargo em cadeia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Administração do sistema (aprovações, telas, cargos).
    AdministerSystem,
    /// Direção da imobiliária: equipes e visão de todos os corretores.
    DirectOrganization,
    /// Leitura dos dados de qualquer usuário.
    ViewAllPrincipals,
    /// Leitura dos dados dos membros da própria equipe.
    ViewTeamPrincipals,
}

/// Até onde vai o acesso a dados de outros usuários.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataScope {
    All,
    Team,
    Own,
}

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::AdministerSystem,
    Capability::DirectOrganization,
    Capability::ViewAllPrincipals,
];

const DIRETOR_CAPABILITIES: &[Capability] = &[
    Capability::DirectOrganization,
    Capability::ViewAllPrincipals,
];

const GERENTE_CAPABILITIES: &[Capability] = &[Capability::ViewTeamPrincipals];

const CORRETOR_CAPABILITIES: &[Capability] = &[];

impl Role {
    /// Cargo efetivo quando não há histórico (ou a leitura falhou).
    pub const DEFAULT: Role = Role::Corretor;

    pub const ALL: [Role; 4] = [Role::Corretor, Role::Gerente, Role::Diretor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Corretor => "corretor",
            Role::Gerente => "gerente",
            Role::Diretor => "diretor",
            Role::Admin => "admin",
        }
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN_CAPABILITIES,
            Role::Diretor => DIRETOR_CAPABILITIES,
            Role::Gerente => GERENTE_CAPABILITIES,
            Role::Corretor => CORRETOR_CAPABILITIES,
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn data_scope(&self) -> DataScope {
        if self.grants(Capability::ViewAllPrincipals) {
            DataScope::All
        } else if self.grants(Capability::ViewTeamPrincipals) {
            DataScope::Team
        } else {
            DataScope::Own
        }
    }

    /// Converte o rótulo gravado no banco. Rótulos desconhecidos caem para o
    /// cargo de menor privilégio.
    pub fn from_label_lossy(label: &str) -> Role {
        label.parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ Cargo desconhecido '{}' no histórico; usando '{}'", label, Role::DEFAULT);
            Role::DEFAULT
        })
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::DEFAULT
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| AppError::UnknownRole(s.to_string()))
    }
}

// ---
// 2. RoleAssignment (linha do histórico de cargos)
// ---
// Apenas inserções; a linha mais recente define o cargo efetivo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn role(&self) -> Role {
        Role::from_label_lossy(&self.role)
    }
}

/// A linha com o `created_at` mais recente, independente da ordem em que
/// chegaram. Empate: vale a última da lista.
pub fn latest_assignment(rows: &[RoleAssignment]) -> Option<&RoleAssignment> {
    rows.iter().max_by_key(|row| row.created_at)
}

/// Cargo efetivo de um histórico. Sem linhas, `corretor`.
pub fn effective_role(rows: &[RoleAssignment]) -> Role {
    latest_assignment(rows)
        .map(RoleAssignment::role)
        .unwrap_or(Role::DEFAULT)
}

// Histórico de cargos com o cargo que vale hoje
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleHistory {
    pub effective_role: Role,
    pub entries: Vec<RoleAssignment>,
}

impl RoleHistory {
    pub fn new(entries: Vec<RoleAssignment>) -> Self {
        Self {
            effective_role: effective_role(&entries),
            entries,
        }
    }
}

// Payload para promover/rebaixar um usuário
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolePayload {
    #[validate(length(min = 1, message = "O cargo é obrigatório."))]
    pub role: String,
}
