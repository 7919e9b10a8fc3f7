// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded vault database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `principals`: principal_id → serialized Principal
//! - `usernames`: username → principal_id (uniqueness index)
//! - `groups`: group_id → serialized Group
//! - `memberships`: `principal_id|group_id` → 1
//! - `grants`: `group_id|type|scope` → serialized ResourceGrant
//! - `records`: `type|resource_id` → serialized SecretRecord
//! - `audit`: sequence number → serialized AuditEntry

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::de::DeserializeOwned;

use super::{
    record_key, AuditEntry, AuditFilter, AuditStore, DirectoryStore, GrantStore, OwnedResource,
    RecordStore, RetirementSummary, SecretRecord, StorageError, StorageResult, VaultStore,
};
use crate::access::{
    grant_key, Group, GroupId, GrantScope, Principal, PrincipalId, ResourceGrant, ResourceId,
    ResourceType,
};

// =============================================================================
// Table Definitions
// =============================================================================

const PRINCIPALS: TableDefinition<&str, &[u8]> = TableDefinition::new("principals");

/// Index: username → principal_id.
const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

const GROUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("groups");

/// Key format: `principal_id|group_id`, so a prefix scan yields one
/// principal's groups.
const MEMBERSHIPS: TableDefinition<&str, u8> = TableDefinition::new("memberships");

/// Key format: `group_id|type|scope` (`*` scope for all-of-type).
const GRANTS: TableDefinition<&str, &[u8]> = TableDefinition::new("grants");

/// Key format: `type|resource_id`.
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Monotonic sequence → entry; iteration order is append order.
const AUDIT: TableDefinition<u64, &[u8]> = TableDefinition::new("audit");

// =============================================================================
// Key Helpers
// =============================================================================

/// Exclusive upper bound for keys starting with `prefix|`.
///
/// `}` sorts directly after `|`, so `prefix}` bounds every `prefix|...` key.
fn prefix_bounds(prefix: &str) -> (String, String) {
    (format!("{prefix}|"), format!("{prefix}}}"))
}

fn membership_key(principal_id: PrincipalId, group_id: GroupId) -> String {
    format!("{principal_id}|{group_id}")
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

// =============================================================================
// VaultDatabase
// =============================================================================

/// Embedded ACID vault store.
pub struct VaultDatabase {
    db: Database,
}

impl VaultDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRINCIPALS)?;
            let _ = write_txn.open_table(USERNAMES)?;
            let _ = write_txn.open_table(GROUPS)?;
            let _ = write_txn.open_table(MEMBERSHIPS)?;
            let _ = write_txn.open_table(GRANTS)?;
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(AUDIT)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Vault database opened");
        Ok(Self { db })
    }
}

impl DirectoryStore for VaultDatabase {
    fn insert_principal(&self, principal: &Principal) -> StorageResult<()> {
        let id = principal.id.to_string();
        let json = serde_json::to_vec(principal)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut usernames = write_txn.open_table(USERNAMES)?;
            if usernames.get(principal.username.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "Principal {}",
                    principal.username
                )));
            }
            usernames.insert(principal.username.as_str(), id.as_str())?;

            let mut table = write_txn.open_table(PRINCIPALS)?;
            table.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn update_principal(&self, principal: &Principal) -> StorageResult<()> {
        let id = principal.id.to_string();
        let json = serde_json::to_vec(principal)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PRINCIPALS)?;

            // Read existing value and deserialize before mutating
            let existing: Principal = {
                let existing = table
                    .get(id.as_str())?
                    .ok_or_else(|| StorageError::NotFound(format!("Principal {id}")))?;
                decode(existing.value())?
            };
            table.insert(id.as_str(), json.as_slice())?;

            if existing.username != principal.username {
                let mut usernames = write_txn.open_table(USERNAMES)?;
                usernames.remove(existing.username.as_str())?;
                usernames.insert(principal.username.as_str(), id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_principal(&self, id: PrincipalId) -> StorageResult<Option<Principal>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINCIPALS)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_principal_by_username(&self, username: &str) -> StorageResult<Option<Principal>> {
        let read_txn = self.db.begin_read()?;
        let usernames = read_txn.open_table(USERNAMES)?;
        let Some(id) = usernames.get(username)? else {
            return Ok(None);
        };
        let table = read_txn.open_table(PRINCIPALS)?;
        match table.get(id.value())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn count_principals(&self) -> StorageResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINCIPALS)?;
        Ok(table.len()? as usize)
    }

    fn insert_group(&self, group: &Group) -> StorageResult<()> {
        let id = group.id.to_string();
        let json = serde_json::to_vec(group)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(GROUPS)?;
            for entry in table.iter()? {
                let (_, value) = entry?;
                let existing: Group = decode(value.value())?;
                if existing.name == group.name {
                    return Err(StorageError::AlreadyExists(format!("Group {}", group.name)));
                }
            }
            table.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_group(&self, id: GroupId) -> StorageResult<Option<Group>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GROUPS)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn add_member(&self, group_id: GroupId, principal_id: PrincipalId) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let groups = write_txn.open_table(GROUPS)?;
            if groups.get(group_id.to_string().as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("Group {group_id}")));
            }
            let principals = write_txn.open_table(PRINCIPALS)?;
            if principals.get(principal_id.to_string().as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("Principal {principal_id}")));
            }

            let mut table = write_txn.open_table(MEMBERSHIPS)?;
            table.insert(membership_key(principal_id, group_id).as_str(), 1u8)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn groups_of(&self, principal_id: PrincipalId) -> StorageResult<Vec<GroupId>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMBERSHIPS)?;
        let (start, end) = prefix_bounds(&principal_id.to_string());

        let mut groups = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let (key, _) = entry?;
            if let Some(group) = key.value().rsplit('|').next() {
                if let Ok(id) = group.parse::<GroupId>() {
                    groups.push(id);
                }
            }
        }
        Ok(groups)
    }
}

impl GrantStore for VaultDatabase {
    fn put_grant(&self, grant: &ResourceGrant) -> StorageResult<()> {
        let json = serde_json::to_vec(grant)?;

        let write_txn = self.db.begin_write()?;
        {
            let groups = write_txn.open_table(GROUPS)?;
            if groups.get(grant.group_id.to_string().as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("Group {}", grant.group_id)));
            }
            let mut table = write_txn.open_table(GRANTS)?;
            table.insert(grant.key().as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove_grant(
        &self,
        group_id: GroupId,
        resource_type: ResourceType,
        scope: &GrantScope,
    ) -> StorageResult<bool> {
        let key = grant_key(group_id, resource_type, scope);
        let write_txn = self.db.begin_write()?;
        let removed = write_txn
            .open_table(GRANTS)?
            .remove(key.as_str())?
            .is_some();
        write_txn.commit()?;
        Ok(removed)
    }

    fn grants_for(
        &self,
        groups: &[GroupId],
        resource_type: ResourceType,
    ) -> StorageResult<Vec<ResourceGrant>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GRANTS)?;

        let mut grants = Vec::new();
        for group in groups {
            let (start, end) = prefix_bounds(&format!("{group}|{resource_type}"));
            for entry in table.range(start.as_str()..end.as_str())? {
                let (_, value) = entry?;
                grants.push(decode(value.value())?);
            }
        }
        Ok(grants)
    }
}

impl RecordStore for VaultDatabase {
    fn insert_record(&self, record: &SecretRecord) -> StorageResult<()> {
        let key = record.key();
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            if table.get(key.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!("Record {key}")));
            }
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn update_record(&self, record: &SecretRecord) -> StorageResult<()> {
        let key = record.key();
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            if table.get(key.as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("Record {key}")));
            }
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_record(
        &self,
        resource_type: ResourceType,
        id: ResourceId,
    ) -> StorageResult<Option<SecretRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        match table.get(record_key(resource_type, id).as_str())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn records_of_type(&self, resource_type: ResourceType) -> StorageResult<Vec<SecretRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        let (start, end) = prefix_bounds(resource_type.as_str());

        let mut records = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let (_, value) = entry?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }
}

impl AuditStore for VaultDatabase {
    fn insert_audit(&self, entry: &AuditEntry) -> StorageResult<()> {
        let json = serde_json::to_vec(entry)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT)?;
            let next = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };
            table.insert(next, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn audit_entries(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT)?;
        let limit = filter.limit.unwrap_or(usize::MAX);

        let mut entries = Vec::new();
        for item in table.iter()?.rev() {
            if entries.len() >= limit {
                break;
            }
            let (_, value) = item?;
            let entry: AuditEntry = decode(value.value())?;
            if filter.matches(&entry) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

impl VaultStore for VaultDatabase {
    fn retire_principal(
        &self,
        target: PrincipalId,
        successor: PrincipalId,
    ) -> StorageResult<RetirementSummary> {
        let target_key = target.to_string();

        // Any early return drops the transaction, which aborts it.
        let write_txn = self.db.begin_write()?;
        let summary = {
            let mut principals = write_txn.open_table(PRINCIPALS)?;
            if principals.get(successor.to_string().as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("Principal {successor}")));
            }
            let mut principal: Principal = {
                let existing = principals
                    .get(target_key.as_str())?
                    .ok_or_else(|| StorageError::NotFound(format!("Principal {target}")))?;
                decode(existing.value())?
            };
            principal.active = false;
            principals.insert(target_key.as_str(), serde_json::to_vec(&principal)?.as_slice())?;

            let mut records = write_txn.open_table(RECORDS)?;
            let mut owned = Vec::new();
            for entry in records.iter()? {
                let (key, value) = entry?;
                let record: SecretRecord = decode(value.value())?;
                if record.owner_id == target {
                    owned.push((key.value().to_string(), record));
                }
            }
            for (key, record) in &mut owned {
                record.transfer_to(successor);
                records.insert(key.as_str(), serde_json::to_vec(record)?.as_slice())?;
            }

            let mut audit = write_txn.open_table(AUDIT)?;
            let mut detached = Vec::new();
            for item in audit.iter()? {
                let (seq, value) = item?;
                let entry: AuditEntry = decode(value.value())?;
                if entry.actor_id == Some(target) {
                    detached.push((seq.value(), entry));
                }
            }
            for (seq, entry) in &mut detached {
                entry.actor_id = None;
                audit.insert(*seq, serde_json::to_vec(entry)?.as_slice())?;
            }

            let mut memberships = write_txn.open_table(MEMBERSHIPS)?;
            let (start, end) = prefix_bounds(&target_key);
            let mut stale = Vec::new();
            for entry in memberships.range(start.as_str()..end.as_str())? {
                let (key, _) = entry?;
                stale.push(key.value().to_string());
            }
            for key in &stale {
                memberships.remove(key.as_str())?;
            }

            RetirementSummary {
                records_reassigned: owned.len(),
                audit_entries_detached: detached.len(),
            }
        };
        write_txn.commit()?;

        tracing::info!(
            principal_id = %target,
            successor_id = %successor,
            records = summary.records_reassigned,
            audit_entries = summary.audit_entries_detached,
            "Principal retired"
        );
        Ok(summary)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Action;
    use crate::auth::PrivilegeLevel;
    use crate::storage::AuditAction;

    fn temp_db() -> (VaultDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = VaultDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn principal(name: &str) -> Principal {
        Principal::new(name, PrivilegeLevel::User, "hash".into())
    }

    #[test]
    fn principal_round_trip_and_username_lookup() {
        let (db, _dir) = temp_db();
        let alice = principal("alice");
        db.insert_principal(&alice).unwrap();

        let found = db.find_principal_by_username("alice").unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(db.find_principal_by_username("bob").unwrap().is_none());
        assert!(matches!(
            db.insert_principal(&principal("alice")),
            Err(StorageError::AlreadyExists(_))
        ));
        assert_eq!(db.count_principals().unwrap(), 1);
    }

    #[test]
    fn update_principal_requires_existing() {
        let (db, _dir) = temp_db();
        assert!(matches!(
            db.update_principal(&principal("ghost")),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn memberships_and_grants_by_prefix() {
        let (db, _dir) = temp_db();
        let alice = principal("alice");
        let bob = principal("bob");
        db.insert_principal(&alice).unwrap();
        db.insert_principal(&bob).unwrap();
        let ops = Group::new("ops");
        let dev = Group::new("dev");
        db.insert_group(&ops).unwrap();
        db.insert_group(&dev).unwrap();

        db.add_member(ops.id, alice.id).unwrap();
        db.add_member(ops.id, alice.id).unwrap();
        db.add_member(dev.id, bob.id).unwrap();
        assert_eq!(db.groups_of(alice.id).unwrap(), vec![ops.id]);

        let server_grant = ResourceGrant::new(
            ops.id,
            ResourceType::Server,
            GrantScope::AllOfType,
            [Action::Read],
        );
        let cred_grant = ResourceGrant::new(
            ops.id,
            ResourceType::Credential,
            GrantScope::Resource(ResourceId::generate()),
            [Action::Read],
        );
        db.put_grant(&server_grant).unwrap();
        db.put_grant(&cred_grant).unwrap();

        assert_eq!(
            db.grants_for(&[ops.id], ResourceType::Server).unwrap(),
            vec![server_grant]
        );
        assert!(db.grants_for(&[dev.id], ResourceType::Server).unwrap().is_empty());

        assert!(db
            .remove_grant(ops.id, ResourceType::Server, &GrantScope::AllOfType)
            .unwrap());
        assert!(!db
            .remove_grant(ops.id, ResourceType::Server, &GrantScope::AllOfType)
            .unwrap());
        assert!(db.grants_for(&[ops.id], ResourceType::Server).unwrap().is_empty());
    }

    #[test]
    fn records_listed_by_type() {
        let (db, _dir) = temp_db();
        let owner = PrincipalId::generate();
        let cred = SecretRecord::new(ResourceType::Credential, "api", owner);
        let server = SecretRecord::new(ResourceType::Server, "web", owner);
        db.insert_record(&cred).unwrap();
        db.insert_record(&server).unwrap();

        let creds = db.records_of_type(ResourceType::Credential).unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].id, cred.id);
        assert_eq!(
            db.owned_record_ids(owner, ResourceType::Server).unwrap(),
            vec![server.id]
        );
    }

    #[test]
    fn audit_is_returned_newest_first() {
        let (db, _dir) = temp_db();
        for action in [AuditAction::Login, AuditAction::SecretViewed, AuditAction::Logout] {
            db.insert_audit(&AuditEntry::new(action, ResourceType::User))
                .unwrap();
        }

        let entries = db.audit_entries(&AuditFilter::default()).unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::Logout, AuditAction::SecretViewed, AuditAction::Login]
        );

        let viewed = db
            .audit_entries(&AuditFilter {
                action: Some(AuditAction::SecretViewed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(viewed.len(), 1);
    }

    #[test]
    fn retirement_applies_every_step() {
        let (db, _dir) = temp_db();
        let leaver = principal("leaver");
        let heir = principal("heir");
        db.insert_principal(&leaver).unwrap();
        db.insert_principal(&heir).unwrap();
        let group = Group::new("ops");
        db.insert_group(&group).unwrap();
        db.add_member(group.id, leaver.id).unwrap();

        let record = SecretRecord::new(ResourceType::Server, "web", leaver.id);
        db.insert_record(&record).unwrap();
        db.insert_audit(
            &AuditEntry::new(AuditAction::Create, ResourceType::Server).with_actor(leaver.id),
        )
        .unwrap();

        let summary = db.retire_principal(leaver.id, heir.id).unwrap();
        assert_eq!(summary.records_reassigned, 1);
        assert_eq!(summary.audit_entries_detached, 1);

        assert_eq!(
            db.get_record(ResourceType::Server, record.id)
                .unwrap()
                .unwrap()
                .owner_id,
            heir.id
        );
        assert!(!db.get_principal(leaver.id).unwrap().unwrap().active);
        assert!(db.groups_of(leaver.id).unwrap().is_empty());
        assert!(db.audit_entries(&AuditFilter::default()).unwrap()[0]
            .actor_id
            .is_none());
    }

    #[test]
    fn unknown_successor_is_rejected() {
        let (db, _dir) = temp_db();
        let leaver = principal("leaver");
        db.insert_principal(&leaver).unwrap();

        assert!(matches!(
            db.retire_principal(leaver.id, PrincipalId::generate()),
            Err(StorageError::NotFound(_))
        ));
        assert!(db.get_principal(leaver.id).unwrap().unwrap().active);
    }

    #[test]
    fn failed_retirement_rolls_back() {
        let (db, _dir) = temp_db();
        let leaver = principal("leaver");
        let heir = principal("heir");
        db.insert_principal(&leaver).unwrap();
        db.insert_principal(&heir).unwrap();
        let group = Group::new("ops");
        db.insert_group(&group).unwrap();
        db.add_member(group.id, leaver.id).unwrap();
        let record = SecretRecord::new(ResourceType::Server, "web", leaver.id);
        db.insert_record(&record).unwrap();

        // An unreadable audit row fails the retirement after the principal
        // and record tables have already been written.
        let write_txn = db.db.begin_write().unwrap();
        {
            let mut audit = write_txn.open_table(AUDIT).unwrap();
            audit.insert(0, b"not json".as_slice()).unwrap();
        }
        write_txn.commit().unwrap();

        assert!(matches!(
            db.retire_principal(leaver.id, heir.id),
            Err(StorageError::Serde(_))
        ));
        assert!(db.get_principal(leaver.id).unwrap().unwrap().active);
        assert_eq!(
            db.get_record(ResourceType::Server, record.id)
                .unwrap()
                .unwrap()
                .owner_id,
            leaver.id
        );
        assert_eq!(db.groups_of(leaver.id).unwrap(), vec![group.id]);
    }

    #[test]
    fn damaged_envelope_reads_back_and_reveal_is_unavailable() {
        use crate::access::PermissionResolver;
        use crate::auth::AuthenticatedPrincipal;
        use crate::crypto::{generate_key, EnvelopeCipher};
        use crate::ratelimit::RateLimiter;
        use crate::services::{RevealError, SecretRevealService};
        use crate::storage::{AuditLogger, SecretField};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(VaultDatabase::open(&dir.path().join("vault.redb")).unwrap());
        let cipher = Arc::new(EnvelopeCipher::new(&generate_key()));

        let owner = principal("owner");
        db.insert_principal(&owner).unwrap();
        let mut record = SecretRecord::new(ResourceType::Credential, "prod-db", owner.id);
        record.set_field(SecretField::Password, cipher.encrypt(b"hunter2!").unwrap());
        db.insert_record(&record).unwrap();

        // Overwrite the stored row with an envelope whose nonce is not base64.
        let mut json = serde_json::to_value(&record).unwrap();
        json["fields"]["password"]["iv"] = serde_json::json!("!!");
        let write_txn = db.db.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(RECORDS).unwrap();
            table
                .insert(record.key().as_str(), serde_json::to_vec(&json).unwrap().as_slice())
                .unwrap();
        }
        write_txn.commit().unwrap();

        assert!(db.get_record(ResourceType::Credential, record.id).unwrap().is_some());
        assert_eq!(db.records_of_type(ResourceType::Credential).unwrap().len(), 1);

        let reveal = SecretRevealService::new(
            db.clone(),
            PermissionResolver::new(db.clone()),
            Arc::new(RateLimiter::new()),
            cipher,
            AuditLogger::new(db.clone()),
        );
        let caller = AuthenticatedPrincipal::new(owner, None);
        assert!(matches!(
            reveal.reveal(&caller, ResourceType::Credential, record.id, "password"),
            Err(RevealError::Unavailable)
        ));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.redb");
        let alice = principal("alice");
        {
            let db = VaultDatabase::open(&path).unwrap();
            db.insert_principal(&alice).unwrap();
        }
        let db = VaultDatabase::open(&path).unwrap();
        assert!(db.get_principal(alice.id).unwrap().is_some());
    }
}
