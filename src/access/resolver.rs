// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission resolution over ownership, privilege and group grants.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::{Action, GrantScope, Principal, ResourceId, ResourceType};
use crate::storage::{
    DirectoryStore, GrantStore, OwnedResource, RecordStore, StorageResult, VaultStore,
};

/// What a principal may reach for one `(resource_type, action)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ResourceAccess {
    pub is_admin: bool,
    /// Every resource of the type is reachable.
    pub has_global_access: bool,
    /// Owned resources plus resources named by a matching grant.
    pub resource_ids: Vec<ResourceId>,
}

impl ResourceAccess {
    pub fn allows(&self, id: ResourceId) -> bool {
        self.is_admin || self.has_global_access || self.resource_ids.contains(&id)
    }
}

/// Computes effective access from the store.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn VaultStore>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self { store }
    }

    /// Whether `principal` may perform `action` on a resource.
    ///
    /// With `resource_id = None` the check is type-level (e.g. CREATE) and
    /// only all-of-type grants can satisfy it.
    pub fn check_permission(
        &self,
        principal: &Principal,
        action: Action,
        resource_type: ResourceType,
        resource_id: Option<ResourceId>,
    ) -> StorageResult<bool> {
        if !principal.active {
            return Ok(false);
        }
        if principal.level.is_admin() {
            return Ok(true);
        }

        if let Some(id) = resource_id {
            if resource_type.holds_secrets() {
                if let Some(record) = self.store.get_record(resource_type, id)? {
                    if record.is_owned_by(principal) {
                        return Ok(true);
                    }
                }
            }
        }

        let groups = self.store.groups_of(principal.id)?;
        if groups.is_empty() {
            return Ok(false);
        }
        let granted = self
            .store
            .grants_for(&groups, resource_type)?
            .iter()
            .any(|grant| grant.permits(action, resource_id));
        Ok(granted)
    }

    /// Enumerate what `principal` may reach for `action` on `resource_type`.
    pub fn get_resource_access(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        action: Action,
    ) -> StorageResult<ResourceAccess> {
        if !principal.active {
            return Ok(ResourceAccess::default());
        }
        if principal.level.is_admin() {
            return Ok(ResourceAccess {
                is_admin: true,
                has_global_access: true,
                resource_ids: Vec::new(),
            });
        }

        let mut ids = BTreeSet::new();
        if resource_type.holds_secrets() {
            ids.extend(self.store.owned_record_ids(principal.id, resource_type)?);
        }

        let mut has_global_access = false;
        let groups = self.store.groups_of(principal.id)?;
        if !groups.is_empty() {
            for grant in self.store.grants_for(&groups, resource_type)? {
                if !grant.actions.contains(&action) {
                    continue;
                }
                match grant.scope {
                    GrantScope::AllOfType => has_global_access = true,
                    GrantScope::Resource(id) => {
                        ids.insert(id);
                    }
                }
            }
        }

        Ok(ResourceAccess {
            is_admin: false,
            has_global_access,
            resource_ids: ids.into_iter().collect(),
        })
    }
}
