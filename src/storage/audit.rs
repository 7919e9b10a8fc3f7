// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for security-sensitive operations.
//!
//! Every privileged action appends one immutable [`AuditEntry`]. Entries are
//! never updated or deleted; the single exception is the actor reference,
//! which is a weak link nulled when that principal is retired.
//!
//! Appending is best-effort: [`AuditLogger::append`] never fails the
//! operation it accompanies. Failures are reported through `tracing` and
//! swallowed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{AuditStore, StorageResult};
use crate::access::{PrincipalId, ResourceType};

/// Kinds of auditable actions.
///
/// This list is the single source of truth for what must be logged: a new
/// privileged operation needs a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    // Resource lifecycle
    Create,
    Update,
    Delete,

    // Access control
    PermissionGranted,
    PermissionRevoked,

    // Secret access
    SecretViewed,
    SecretCopied,

    // Sessions
    Login,
    LoginFailed,
    Logout,
    PasswordChanged,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::PermissionGranted => "PERMISSION_GRANTED",
            AuditAction::PermissionRevoked => "PERMISSION_REVOKED",
            AuditAction::SecretViewed => "SECRET_VIEWED",
            AuditAction::SecretCopied => "SECRET_COPIED",
            AuditAction::Login => "LOGIN",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::Logout => "LOGOUT",
            AuditAction::PasswordChanged => "PASSWORD_CHANGED",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_ascii_uppercase()))
            .map_err(|_| format!("unknown audit action: {s}"))
    }
}

/// An audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Principal who acted; `None` for system actions or retired actors.
    pub actor_id: Option<PrincipalId>,
    pub resource_type: ResourceType,
    pub resource_id: Option<Uuid>,
    /// Resource name at the time of the action.
    pub resource_name: Option<String>,
    /// Free-form context (field names, grant contents, ...).
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    /// Network origin of the request.
    pub origin: Option<String>,
}

impl AuditEntry {
    /// Create a new entry for `action` on a resource type.
    pub fn new(action: AuditAction, resource_type: ResourceType) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            actor_id: None,
            resource_type,
            resource_id: None,
            resource_name: None,
            metadata: None,
            origin: None,
        }
    }

    pub fn with_actor(mut self, actor: PrincipalId) -> Self {
        self.actor_id = Some(actor);
        self
    }

    /// Set the resource id and a snapshot of its name.
    pub fn with_resource(mut self, id: impl Into<Uuid>, name: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self.resource_name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }
}

impl From<PrincipalId> for Uuid {
    fn from(id: PrincipalId) -> Self {
        id.0
    }
}

impl From<crate::access::GroupId> for Uuid {
    fn from(id: crate::access::GroupId) -> Self {
        id.0
    }
}

impl From<crate::access::ResourceId> for Uuid {
    fn from(id: crate::access::ResourceId) -> Self {
        id.0
    }
}

/// Query over the audit trail. Results come back newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub actor_id: Option<PrincipalId>,
    pub action: Option<AuditAction>,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<Uuid>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.actor_id.is_none_or(|actor| entry.actor_id == Some(actor))
            && self.action.is_none_or(|action| entry.action == action)
            && self
                .resource_type
                .is_none_or(|resource_type| entry.resource_type == resource_type)
            && self.resource_id.is_none_or(|id| entry.resource_id == Some(id))
    }

    /// Apply the filter to entries stored oldest first.
    pub fn select<'a, I>(&self, entries: I) -> Vec<AuditEntry>
    where
        I: DoubleEndedIterator<Item = &'a AuditEntry>,
    {
        entries
            .rev()
            .filter(|entry| self.matches(entry))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Best-effort writer for the audit trail.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append an entry. Never fails the caller.
    pub fn append(&self, entry: AuditEntry) {
        if let Err(e) = self.store.insert_audit(&entry) {
            tracing::error!(
                error = %e,
                action = entry.action.as_str(),
                resource_type = %entry.resource_type,
                resource_id = ?entry.resource_id,
                actor_id = ?entry.actor_id,
                "Failed to append audit entry"
            );
        }
    }

    /// Query the trail.
    pub fn entries(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditEntry>> {
        self.store.audit_entries(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStore, StorageError};

    struct FailingAuditStore;

    impl AuditStore for FailingAuditStore {
        fn insert_audit(&self, _entry: &AuditEntry) -> StorageResult<()> {
            Err(StorageError::LockPoisoned)
        }

        fn audit_entries(&self, _filter: &AuditFilter) -> StorageResult<Vec<AuditEntry>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn create_audit_entry() {
        let actor = PrincipalId::generate();
        let resource = Uuid::new_v4();
        let entry = AuditEntry::new(AuditAction::SecretViewed, ResourceType::Credential)
            .with_actor(actor)
            .with_resource(resource, "prod-db")
            .with_metadata(serde_json::json!({ "field": "password" }))
            .with_origin(Some("10.0.0.1".to_string()));

        assert_eq!(entry.action, AuditAction::SecretViewed);
        assert_eq!(entry.actor_id, Some(actor));
        assert_eq!(entry.resource_id, Some(resource));
        assert_eq!(entry.resource_name.as_deref(), Some("prod-db"));
        assert_eq!(entry.metadata.unwrap()["field"], "password");
        assert_eq!(entry.origin.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn system_entries_have_no_actor() {
        let entry = AuditEntry::new(AuditAction::Update, ResourceType::User);
        assert!(entry.actor_id.is_none());
    }

    #[test]
    fn actions_serialize_screaming_snake_case() {
        let json = serde_json::to_string(&AuditAction::PermissionGranted).unwrap();
        assert_eq!(json, "\"PERMISSION_GRANTED\"");
        assert_eq!(AuditAction::SecretCopied.as_str(), "SECRET_COPIED");
        assert_eq!("login_failed".parse::<AuditAction>(), Ok(AuditAction::LoginFailed));
    }

    #[test]
    fn append_and_query() {
        let store = Arc::new(InMemoryStore::new());
        let logger = AuditLogger::new(store);
        let actor = PrincipalId::generate();

        logger.append(AuditEntry::new(AuditAction::Login, ResourceType::User).with_actor(actor));
        logger.append(AuditEntry::new(AuditAction::Create, ResourceType::Credential));
        logger.append(AuditEntry::new(AuditAction::Logout, ResourceType::User).with_actor(actor));

        let mine = logger
            .entries(&AuditFilter {
                actor_id: Some(actor),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].action, AuditAction::Logout);
        assert_eq!(mine[1].action, AuditAction::Login);

        let limited = logger
            .entries(&AuditFilter {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].action, AuditAction::Logout);
    }

    #[test]
    fn failed_append_is_swallowed() {
        let logger = AuditLogger::new(Arc::new(FailingAuditStore));
        logger.append(AuditEntry::new(AuditAction::Delete, ResourceType::Server));
    }
}
