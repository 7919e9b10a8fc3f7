// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Domain types that are safe
//! to expose as-is ([`Group`], [`ResourceGrant`], [`AuditEntry`],
//! [`SecretSummary`](crate::services::SecretSummary)) are returned directly;
//! everything here is either an input shape or a redacted view.
//!
//! ## Model Categories
//!
//! - **Auth**: login, password change
//! - **Secrets**: record creation, field update, reveal and copy
//! - **Admin**: principals, groups, grants, audit queries

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::access::{Action, GrantScope, Principal, PrincipalId, ResourceId, ResourceType};
use crate::auth::PrivilegeLevel;
use crate::storage::{AuditAction, AuditFilter, SecretField};

/// Default and maximum page size for audit queries.
pub const AUDIT_DEFAULT_LIMIT: usize = 100;
pub const AUDIT_MAX_LIMIT: usize = 1000;

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// A principal without its password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrincipalView {
    pub id: PrincipalId,
    pub username: String,
    pub level: PrivilegeLevel,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Principal> for PrincipalView {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id,
            username: p.username.clone(),
            level: p.level,
            active: p.active,
            created_at: p.created_at,
        }
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// New secret record. Field names depend on the resource type.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSecretRequest {
    pub name: String,
    /// Field name to plaintext value, e.g. `{"password": "..."}`
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateFieldRequest {
    pub value: String,
}

/// Which field to reveal or copy.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FieldRequest {
    pub field: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealResponse {
    pub field: SecretField,
    pub value: String,
    /// Clients should clear the value from view after this many seconds
    pub clear_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CopyResponse {
    pub field: SecretField,
    pub recorded: bool,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePrincipalRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "default_level")]
    pub level: PrivilegeLevel,
}

fn default_level() -> PrivilegeLevel {
    PrivilegeLevel::User
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PrivilegeRequest {
    pub level: PrivilegeLevel,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RetireRequest {
    /// Receives the retired principal's records; defaults to the caller
    #[serde(default)]
    pub successor_id: Option<PrincipalId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
}

/// Grant target: one resource when `resource_id` is present, otherwise
/// every resource of the type.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GrantTarget {
    pub resource_type: ResourceType,
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
}

impl GrantTarget {
    pub fn scope(&self) -> GrantScope {
        match self.resource_id {
            Some(id) => GrantScope::Resource(id),
            None => GrantScope::AllOfType,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetGrantRequest {
    #[serde(flatten)]
    pub target: GrantTarget,
    pub actions: Vec<Action>,
}

/// Audit trail query. Results are newest first.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQueryParams {
    pub actor_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<Uuid>,
    /// Page size (default 100, max 1000)
    pub limit: Option<usize>,
}

impl From<AuditQueryParams> for AuditFilter {
    fn from(q: AuditQueryParams) -> Self {
        AuditFilter {
            actor_id: q.actor_id.map(PrincipalId),
            action: q.action,
            resource_type: q.resource_type,
            resource_id: q.resource_id,
            limit: Some(q.limit.unwrap_or(AUDIT_DEFAULT_LIMIT).min(AUDIT_MAX_LIMIT)),
        }
    }
}
