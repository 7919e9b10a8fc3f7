// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret record lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{validate_name, ServiceError, ServiceResult};
use crate::access::{Action, PermissionResolver, PrincipalId, ResourceId, ResourceType};
use crate::auth::AuthenticatedPrincipal;
use crate::crypto::EnvelopeCipher;
use crate::ratelimit::{RateLimitClass, RateLimiter};
use crate::storage::{
    AuditAction, AuditEntry, AuditLogger, RecordStore, SecretField, SecretRecord, VaultStore,
};

/// Public view of a record: never includes envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SecretSummary {
    pub id: ResourceId,
    pub resource_type: ResourceType,
    pub name: String,
    pub owner_id: PrincipalId,
    /// Names of the fields that hold a value
    pub fields: Vec<SecretField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SecretRecord> for SecretSummary {
    fn from(record: &SecretRecord) -> Self {
        Self {
            id: record.id,
            resource_type: record.resource_type,
            name: record.name.clone(),
            owner_id: record.owner_id,
            fields: record.fields.keys().copied().collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SecretService {
    store: Arc<dyn VaultStore>,
    resolver: PermissionResolver,
    limiter: Arc<RateLimiter>,
    cipher: Arc<EnvelopeCipher>,
    audit: AuditLogger,
}

impl SecretService {
    pub fn new(
        store: Arc<dyn VaultStore>,
        resolver: PermissionResolver,
        limiter: Arc<RateLimiter>,
        cipher: Arc<EnvelopeCipher>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            store,
            resolver,
            limiter,
            cipher,
            audit,
        }
    }

    /// Create a record owned by the caller, encrypting every field.
    pub fn create(
        &self,
        caller: &AuthenticatedPrincipal,
        resource_type: ResourceType,
        name: &str,
        fields: BTreeMap<String, String>,
    ) -> ServiceResult<SecretSummary> {
        let principal = &caller.principal;
        ensure_secret_type(resource_type)?;

        let decision = self
            .limiter
            .check_class(RateLimitClass::Create, &principal.id.to_string());
        if !decision.success {
            let retry_after = decision.retry_after.unwrap_or(1);
            warn!(principal_id = %principal.id, retry_after, "Create rate limit exceeded");
            return Err(ServiceError::RateLimited { retry_after });
        }

        validate_name("name", name)?;
        self.require(caller, Action::Create, resource_type, None)?;

        let mut record = SecretRecord::new(resource_type, name.trim(), principal.id);
        for (field_name, value) in &fields {
            let field = parse_field(resource_type, field_name)?;
            record.set_field(field, self.cipher.encrypt(value.as_bytes())?);
        }
        self.store.insert_record(&record)?;

        let field_names: Vec<_> = record.fields.keys().map(|f| f.as_str()).collect();
        self.audit.append(
            AuditEntry::new(AuditAction::Create, resource_type)
                .with_actor(principal.id)
                .with_resource(record.id, record.name.as_str())
                .with_metadata(serde_json::json!({ "fields": field_names }))
                .with_origin(caller.origin.clone()),
        );
        info!(
            principal_id = %principal.id,
            resource_type = %resource_type,
            resource_id = %record.id,
            "Secret record created"
        );

        Ok(SecretSummary::from(&record))
    }

    /// Replace one field with a freshly encrypted envelope.
    pub fn update_field(
        &self,
        caller: &AuthenticatedPrincipal,
        resource_type: ResourceType,
        id: ResourceId,
        field_name: &str,
        value: &str,
    ) -> ServiceResult<SecretSummary> {
        ensure_secret_type(resource_type)?;
        let field = parse_field(resource_type, field_name)?;
        self.require(caller, Action::Update, resource_type, Some(id))?;

        let mut record = self.active_record(resource_type, id)?;
        record.set_field(field, self.cipher.encrypt(value.as_bytes())?);
        self.store.update_record(&record)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Update, resource_type)
                .with_actor(caller.principal.id)
                .with_resource(record.id, record.name.as_str())
                .with_metadata(serde_json::json!({ "field": field.as_str() }))
                .with_origin(caller.origin.clone()),
        );

        Ok(SecretSummary::from(&record))
    }

    /// Soft-delete a record.
    pub fn delete(
        &self,
        caller: &AuthenticatedPrincipal,
        resource_type: ResourceType,
        id: ResourceId,
    ) -> ServiceResult<()> {
        ensure_secret_type(resource_type)?;
        self.require(caller, Action::Delete, resource_type, Some(id))?;

        let mut record = self.active_record(resource_type, id)?;
        record.deactivate();
        self.store.update_record(&record)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Delete, resource_type)
                .with_actor(caller.principal.id)
                .with_resource(record.id, record.name.as_str())
                .with_origin(caller.origin.clone()),
        );
        info!(
            principal_id = %caller.principal.id,
            resource_type = %resource_type,
            resource_id = %id,
            "Secret record deleted"
        );

        Ok(())
    }

    /// Active records the caller may read.
    pub fn list(
        &self,
        caller: &AuthenticatedPrincipal,
        resource_type: ResourceType,
    ) -> ServiceResult<Vec<SecretSummary>> {
        ensure_secret_type(resource_type)?;
        let access =
            self.resolver
                .get_resource_access(&caller.principal, resource_type, Action::Read)?;

        Ok(self
            .store
            .records_of_type(resource_type)?
            .iter()
            .filter(|record| record.active && access.allows(record.id))
            .map(SecretSummary::from)
            .collect())
    }

    fn require(
        &self,
        caller: &AuthenticatedPrincipal,
        action: Action,
        resource_type: ResourceType,
        id: Option<ResourceId>,
    ) -> ServiceResult<()> {
        if self
            .resolver
            .check_permission(&caller.principal, action, resource_type, id)?
        {
            return Ok(());
        }
        warn!(
            principal_id = %caller.principal.id,
            action = ?action,
            resource_type = %resource_type,
            resource_id = ?id,
            "Permission denied"
        );
        Err(ServiceError::Forbidden(format!(
            "{action:?} on {resource_type} not permitted"
        )))
    }

    fn active_record(
        &self,
        resource_type: ResourceType,
        id: ResourceId,
    ) -> ServiceResult<SecretRecord> {
        self.store
            .get_record(resource_type, id)?
            .filter(|record| record.active)
            .ok_or_else(|| ServiceError::NotFound(format!("{resource_type} {id}")))
    }
}

fn ensure_secret_type(resource_type: ResourceType) -> ServiceResult<()> {
    if resource_type.holds_secrets() {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "{resource_type} records do not hold secrets"
        )))
    }
}

fn parse_field(resource_type: ResourceType, name: &str) -> ServiceResult<SecretField> {
    SecretField::parse_for(resource_type, name).ok_or_else(|| {
        ServiceError::Validation(format!("unknown field '{name}' for {resource_type}"))
    })
}
