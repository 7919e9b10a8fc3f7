// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Storage
//!
//! Persistence for principals, groups, grants, secret records and the audit
//! trail, expressed as a set of traits with two backends:
//!
//! - [`InMemoryStore`]: process-local maps, used by tests and ephemeral runs
//! - [`VaultDatabase`]: embedded redb database under `DATA_DIR`
//!
//! ## Storage Layout (redb)
//!
//! ```text
//! principals       principal_id          -> Principal (JSON)
//! usernames        username              -> principal_id
//! groups           group_id              -> Group (JSON)
//! memberships      principal_id|group_id -> ()
//! grants           group|type|scope      -> ResourceGrant (JSON)
//! records          type|resource_id      -> SecretRecord (JSON)
//! audit            sequence (u64)        -> AuditEntry (JSON)
//! ```
//!
//! ## Important Notes
//!
//! - Secret fields are stored as envelopes; nothing here sees plaintext
//! - The audit table is insert-only, apart from retirement nulling actors
//! - [`VaultStore::retire_principal`] must be atomic

pub mod audit;
pub mod database;
pub mod error;
pub mod memory;
pub mod ownership;
pub mod paths;
pub mod records;

pub use audit::{AuditAction, AuditEntry, AuditFilter, AuditLogger};
pub use database::VaultDatabase;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use ownership::{reassign_owned, OwnedResource};
pub use paths::StoragePaths;
pub use records::{record_key, SecretField, SecretRecord};

use serde::Serialize;
use utoipa::ToSchema;

use crate::access::{
    Group, GroupId, GrantScope, Principal, PrincipalId, ResourceGrant, ResourceId, ResourceType,
};

/// Principals, groups and memberships.
pub trait DirectoryStore: Send + Sync {
    /// Insert a new principal. Usernames are unique.
    fn insert_principal(&self, principal: &Principal) -> StorageResult<()>;

    /// Overwrite an existing principal.
    fn update_principal(&self, principal: &Principal) -> StorageResult<()>;

    fn get_principal(&self, id: PrincipalId) -> StorageResult<Option<Principal>>;

    fn find_principal_by_username(&self, username: &str) -> StorageResult<Option<Principal>>;

    fn count_principals(&self) -> StorageResult<usize>;

    fn insert_group(&self, group: &Group) -> StorageResult<()>;

    fn get_group(&self, id: GroupId) -> StorageResult<Option<Group>>;

    /// Add a principal to a group. Adding twice is a no-op.
    fn add_member(&self, group_id: GroupId, principal_id: PrincipalId) -> StorageResult<()>;

    /// Groups the principal belongs to.
    fn groups_of(&self, principal_id: PrincipalId) -> StorageResult<Vec<GroupId>>;
}

/// Group-scoped resource grants.
pub trait GrantStore: Send + Sync {
    /// Insert or replace the grant for its `(group, type, scope)` key.
    fn put_grant(&self, grant: &ResourceGrant) -> StorageResult<()>;

    /// Remove a grant. Returns `false` if none existed.
    fn remove_grant(
        &self,
        group_id: GroupId,
        resource_type: ResourceType,
        scope: &GrantScope,
    ) -> StorageResult<bool>;

    /// Every grant held by any of `groups` on `resource_type`.
    fn grants_for(
        &self,
        groups: &[GroupId],
        resource_type: ResourceType,
    ) -> StorageResult<Vec<ResourceGrant>>;
}

/// Secret records.
pub trait RecordStore: Send + Sync {
    fn insert_record(&self, record: &SecretRecord) -> StorageResult<()>;

    /// Overwrite an existing record.
    fn update_record(&self, record: &SecretRecord) -> StorageResult<()>;

    fn get_record(
        &self,
        resource_type: ResourceType,
        id: ResourceId,
    ) -> StorageResult<Option<SecretRecord>>;

    /// All records of a type, active or not.
    fn records_of_type(&self, resource_type: ResourceType) -> StorageResult<Vec<SecretRecord>>;

    /// Ids of records of `resource_type` owned by `owner`.
    fn owned_record_ids(
        &self,
        owner: PrincipalId,
        resource_type: ResourceType,
    ) -> StorageResult<Vec<ResourceId>> {
        Ok(self
            .records_of_type(resource_type)?
            .into_iter()
            .filter(|record| record.owner_id == owner)
            .map(|record| record.id)
            .collect())
    }
}

/// Insert-only audit table.
pub trait AuditStore: Send + Sync {
    fn insert_audit(&self, entry: &AuditEntry) -> StorageResult<()>;

    fn audit_entries(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditEntry>>;
}

/// Outcome of retiring a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RetirementSummary {
    pub records_reassigned: usize,
    pub audit_entries_detached: usize,
}

/// The full store a vault runs on.
pub trait VaultStore: DirectoryStore + GrantStore + RecordStore + AuditStore {
    /// Retire `target` in one transaction: move its records to `successor`,
    /// null its actor reference in the audit trail, and deactivate it.
    ///
    /// Either every step is applied or none is.
    fn retire_principal(
        &self,
        target: PrincipalId,
        successor: PrincipalId,
    ) -> StorageResult<RetirementSummary>;
}
