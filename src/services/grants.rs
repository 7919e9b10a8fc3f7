// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Group administration. Every operation here is admin-only.

use std::sync::Arc;

use tracing::info;

use super::{validate_name, ServiceError, ServiceResult};
use crate::access::{Action, GrantScope, Group, GroupId, PrincipalId, ResourceGrant, ResourceType};
use crate::auth::AuthenticatedPrincipal;
use crate::storage::{AuditAction, AuditEntry, AuditLogger, DirectoryStore, GrantStore, VaultStore};

#[derive(Clone)]
pub struct GrantService {
    store: Arc<dyn VaultStore>,
    audit: AuditLogger,
}

impl GrantService {
    pub fn new(store: Arc<dyn VaultStore>, audit: AuditLogger) -> Self {
        Self { store, audit }
    }

    pub fn create_group(
        &self,
        caller: &AuthenticatedPrincipal,
        name: &str,
    ) -> ServiceResult<Group> {
        require_admin(caller)?;
        validate_name("group name", name)?;

        let group = Group::new(name.trim());
        self.store.insert_group(&group)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Create, ResourceType::Group)
                .with_actor(caller.principal.id)
                .with_resource(group.id, group.name.as_str())
                .with_origin(caller.origin.clone()),
        );
        Ok(group)
    }

    pub fn add_member(
        &self,
        caller: &AuthenticatedPrincipal,
        group_id: GroupId,
        principal_id: PrincipalId,
    ) -> ServiceResult<()> {
        require_admin(caller)?;
        let group = self.group(group_id)?;
        self.store.add_member(group_id, principal_id)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Update, ResourceType::Group)
                .with_actor(caller.principal.id)
                .with_resource(group.id, group.name.as_str())
                .with_metadata(serde_json::json!({ "member_added": principal_id }))
                .with_origin(caller.origin.clone()),
        );
        Ok(())
    }

    /// Write the grant for `(group, type, scope)`, replacing any previous
    /// action set.
    pub fn set_grant(
        &self,
        caller: &AuthenticatedPrincipal,
        group_id: GroupId,
        resource_type: ResourceType,
        scope: GrantScope,
        actions: Vec<Action>,
    ) -> ServiceResult<ResourceGrant> {
        require_admin(caller)?;
        if actions.is_empty() {
            return Err(ServiceError::Validation(
                "a grant needs at least one action".to_string(),
            ));
        }
        let group = self.group(group_id)?;

        let grant = ResourceGrant::new(group_id, resource_type, scope, actions);
        self.store.put_grant(&grant)?;

        self.audit.append(
            AuditEntry::new(AuditAction::PermissionGranted, ResourceType::Group)
                .with_actor(caller.principal.id)
                .with_resource(group.id, group.name.as_str())
                .with_metadata(serde_json::json!({
                    "resource_type": resource_type,
                    "scope": scope,
                    "actions": grant.actions,
                }))
                .with_origin(caller.origin.clone()),
        );
        info!(
            principal_id = %caller.principal.id,
            group_id = %group_id,
            resource_type = %resource_type,
            scope = %scope.key(),
            "Grant written"
        );
        Ok(grant)
    }

    pub fn revoke_grant(
        &self,
        caller: &AuthenticatedPrincipal,
        group_id: GroupId,
        resource_type: ResourceType,
        scope: GrantScope,
    ) -> ServiceResult<()> {
        require_admin(caller)?;
        let group = self.group(group_id)?;

        if !self.store.remove_grant(group_id, resource_type, &scope)? {
            return Err(ServiceError::NotFound(format!(
                "grant on {resource_type} ({}) for group {group_id}",
                scope.key()
            )));
        }

        self.audit.append(
            AuditEntry::new(AuditAction::PermissionRevoked, ResourceType::Group)
                .with_actor(caller.principal.id)
                .with_resource(group.id, group.name.as_str())
                .with_metadata(serde_json::json!({
                    "resource_type": resource_type,
                    "scope": scope,
                }))
                .with_origin(caller.origin.clone()),
        );
        Ok(())
    }

    fn group(&self, id: GroupId) -> ServiceResult<Group> {
        self.store
            .get_group(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Group {id}")))
    }
}

fn require_admin(caller: &AuthenticatedPrincipal) -> ServiceResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "group administration requires ADMIN".to_string(),
        ))
    }
}
