// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local store.
//!
//! Everything lives behind one `RwLock`, so multi-entity operations such as
//! retirement are atomic by holding the write guard for their duration.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    reassign_owned, AuditEntry, AuditFilter, AuditStore, DirectoryStore, GrantStore,
    RecordStore, RetirementSummary, SecretRecord, StorageError, StorageResult, VaultStore,
};
use crate::access::{
    grant_key, Group, GroupId, GrantScope, Principal, PrincipalId, ResourceGrant, ResourceId,
    ResourceType,
};
use crate::storage::record_key;

#[derive(Default)]
struct Inner {
    principals: HashMap<PrincipalId, Principal>,
    groups: HashMap<GroupId, Group>,
    memberships: BTreeSet<(PrincipalId, GroupId)>,
    grants: BTreeMap<String, ResourceGrant>,
    records: BTreeMap<String, SecretRecord>,
    /// Oldest first
    audit: Vec<AuditEntry>,
}

/// In-memory [`VaultStore`].
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| StorageError::LockPoisoned)
    }
}

impl DirectoryStore for InMemoryStore {
    fn insert_principal(&self, principal: &Principal) -> StorageResult<()> {
        let mut inner = self.write()?;
        if inner
            .principals
            .values()
            .any(|p| p.username == principal.username)
        {
            return Err(StorageError::AlreadyExists(format!(
                "Principal {}",
                principal.username
            )));
        }
        inner.principals.insert(principal.id, principal.clone());
        Ok(())
    }

    fn update_principal(&self, principal: &Principal) -> StorageResult<()> {
        let mut inner = self.write()?;
        let slot = inner
            .principals
            .get_mut(&principal.id)
            .ok_or_else(|| StorageError::NotFound(format!("Principal {}", principal.id)))?;
        *slot = principal.clone();
        Ok(())
    }

    fn get_principal(&self, id: PrincipalId) -> StorageResult<Option<Principal>> {
        Ok(self.read()?.principals.get(&id).cloned())
    }

    fn find_principal_by_username(&self, username: &str) -> StorageResult<Option<Principal>> {
        Ok(self
            .read()?
            .principals
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    fn count_principals(&self) -> StorageResult<usize> {
        Ok(self.read()?.principals.len())
    }

    fn insert_group(&self, group: &Group) -> StorageResult<()> {
        let mut inner = self.write()?;
        if inner.groups.values().any(|g| g.name == group.name) {
            return Err(StorageError::AlreadyExists(format!("Group {}", group.name)));
        }
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    fn get_group(&self, id: GroupId) -> StorageResult<Option<Group>> {
        Ok(self.read()?.groups.get(&id).cloned())
    }

    fn add_member(&self, group_id: GroupId, principal_id: PrincipalId) -> StorageResult<()> {
        let mut inner = self.write()?;
        if !inner.groups.contains_key(&group_id) {
            return Err(StorageError::NotFound(format!("Group {group_id}")));
        }
        if !inner.principals.contains_key(&principal_id) {
            return Err(StorageError::NotFound(format!("Principal {principal_id}")));
        }
        inner.memberships.insert((principal_id, group_id));
        Ok(())
    }

    fn groups_of(&self, principal_id: PrincipalId) -> StorageResult<Vec<GroupId>> {
        Ok(self
            .read()?
            .memberships
            .iter()
            .filter(|(member, _)| *member == principal_id)
            .map(|(_, group)| *group)
            .collect())
    }
}

impl GrantStore for InMemoryStore {
    fn put_grant(&self, grant: &ResourceGrant) -> StorageResult<()> {
        let mut inner = self.write()?;
        if !inner.groups.contains_key(&grant.group_id) {
            return Err(StorageError::NotFound(format!("Group {}", grant.group_id)));
        }
        inner.grants.insert(grant.key(), grant.clone());
        Ok(())
    }

    fn remove_grant(
        &self,
        group_id: GroupId,
        resource_type: ResourceType,
        scope: &GrantScope,
    ) -> StorageResult<bool> {
        let key = grant_key(group_id, resource_type, scope);
        Ok(self.write()?.grants.remove(&key).is_some())
    }

    fn grants_for(
        &self,
        groups: &[GroupId],
        resource_type: ResourceType,
    ) -> StorageResult<Vec<ResourceGrant>> {
        Ok(self
            .read()?
            .grants
            .values()
            .filter(|g| g.resource_type == resource_type && groups.contains(&g.group_id))
            .cloned()
            .collect())
    }
}

impl RecordStore for InMemoryStore {
    fn insert_record(&self, record: &SecretRecord) -> StorageResult<()> {
        let mut inner = self.write()?;
        let key = record.key();
        if inner.records.contains_key(&key) {
            return Err(StorageError::AlreadyExists(format!("Record {key}")));
        }
        inner.records.insert(key, record.clone());
        Ok(())
    }

    fn update_record(&self, record: &SecretRecord) -> StorageResult<()> {
        let mut inner = self.write()?;
        let key = record.key();
        let slot = inner
            .records
            .get_mut(&key)
            .ok_or_else(|| StorageError::NotFound(format!("Record {key}")))?;
        *slot = record.clone();
        Ok(())
    }

    fn get_record(
        &self,
        resource_type: ResourceType,
        id: ResourceId,
    ) -> StorageResult<Option<SecretRecord>> {
        Ok(self
            .read()?
            .records
            .get(&record_key(resource_type, id))
            .cloned())
    }

    fn records_of_type(&self, resource_type: ResourceType) -> StorageResult<Vec<SecretRecord>> {
        Ok(self
            .read()?
            .records
            .values()
            .filter(|r| r.resource_type == resource_type)
            .cloned()
            .collect())
    }
}

impl AuditStore for InMemoryStore {
    fn insert_audit(&self, entry: &AuditEntry) -> StorageResult<()> {
        self.write()?.audit.push(entry.clone());
        Ok(())
    }

    fn audit_entries(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditEntry>> {
        Ok(filter.select(self.read()?.audit.iter()))
    }
}

impl VaultStore for InMemoryStore {
    fn retire_principal(
        &self,
        target: PrincipalId,
        successor: PrincipalId,
    ) -> StorageResult<RetirementSummary> {
        let mut inner = self.write()?;
        let inner = &mut *inner;

        if !inner.principals.contains_key(&successor) {
            return Err(StorageError::NotFound(format!("Principal {successor}")));
        }
        let principal = inner
            .principals
            .get_mut(&target)
            .ok_or_else(|| StorageError::NotFound(format!("Principal {target}")))?;
        principal.active = false;

        let records_reassigned = reassign_owned(inner.records.values_mut(), target, successor);

        let mut audit_entries_detached = 0;
        for entry in inner.audit.iter_mut() {
            if entry.actor_id == Some(target) {
                entry.actor_id = None;
                audit_entries_detached += 1;
            }
        }

        inner.memberships.retain(|(member, _)| *member != target);

        Ok(RetirementSummary {
            records_reassigned,
            audit_entries_detached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Action;
    use crate::auth::PrivilegeLevel;
    use crate::storage::AuditAction;

    fn principal(name: &str) -> Principal {
        Principal::new(name, PrivilegeLevel::User, "hash".into())
    }

    #[test]
    fn usernames_are_unique() {
        let store = InMemoryStore::new();
        store.insert_principal(&principal("alice")).unwrap();
        let err = store.insert_principal(&principal("alice")).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(store.count_principals().unwrap(), 1);
    }

    #[test]
    fn grant_upsert_replaces_action_set() {
        let store = InMemoryStore::new();
        let group = Group::new("ops");
        store.insert_group(&group).unwrap();

        let first = ResourceGrant::new(
            group.id,
            ResourceType::Server,
            GrantScope::AllOfType,
            [Action::Read],
        );
        store.put_grant(&first).unwrap();
        let second = ResourceGrant::new(
            group.id,
            ResourceType::Server,
            GrantScope::AllOfType,
            [Action::Update],
        );
        store.put_grant(&second).unwrap();

        let grants = store.grants_for(&[group.id], ResourceType::Server).unwrap();
        assert_eq!(grants, vec![second]);
        assert!(store
            .remove_grant(group.id, ResourceType::Server, &GrantScope::AllOfType)
            .unwrap());
        assert!(!store
            .remove_grant(group.id, ResourceType::Server, &GrantScope::AllOfType)
            .unwrap());
    }

    #[test]
    fn membership_requires_existing_entities() {
        let store = InMemoryStore::new();
        let group = Group::new("ops");
        store.insert_group(&group).unwrap();
        let err = store.add_member(group.id, PrincipalId::generate()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn retirement_is_complete() {
        let store = InMemoryStore::new();
        let leaver = principal("leaver");
        let heir = principal("heir");
        store.insert_principal(&leaver).unwrap();
        store.insert_principal(&heir).unwrap();

        let record = SecretRecord::new(ResourceType::Credential, "db", leaver.id);
        store.insert_record(&record).unwrap();
        store
            .insert_audit(
                &AuditEntry::new(AuditAction::Create, ResourceType::Credential)
                    .with_actor(leaver.id),
            )
            .unwrap();

        let summary = store.retire_principal(leaver.id, heir.id).unwrap();
        assert_eq!(summary.records_reassigned, 1);
        assert_eq!(summary.audit_entries_detached, 1);

        let moved = store
            .get_record(ResourceType::Credential, record.id)
            .unwrap()
            .unwrap();
        assert_eq!(moved.owner_id, heir.id);
        assert!(!store.get_principal(leaver.id).unwrap().unwrap().active);
        let entries = store.audit_entries(&AuditFilter::default()).unwrap();
        assert_eq!(entries[0].actor_id, None);
    }

    #[test]
    fn retirement_with_unknown_successor_changes_nothing() {
        let store = InMemoryStore::new();
        let leaver = principal("leaver");
        store.insert_principal(&leaver).unwrap();
        let record = SecretRecord::new(ResourceType::Server, "web", leaver.id);
        store.insert_record(&record).unwrap();

        assert!(store
            .retire_principal(leaver.id, PrincipalId::generate())
            .is_err());
        assert!(store.get_principal(leaver.id).unwrap().unwrap().active);
        assert_eq!(
            store
                .owned_record_ids(leaver.id, ResourceType::Server)
                .unwrap(),
            vec![record.id]
        );
    }
}
