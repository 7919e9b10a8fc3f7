// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reveal and copy of protected fields.
//!
//! ## Pipeline
//!
//! 1. Rate limit (per principal, per operation class)
//! 2. READ permission on the record
//! 3. Envelope lookup
//! 4. Decrypt (reveal only)
//! 5. Best-effort audit entry
//!
//! Each step fails fast. A decryption failure is reported as
//! [`RevealError::Unavailable`], which callers must present exactly like
//! [`RevealError::NotFound`].

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use zeroize::Zeroizing;

use crate::access::{Action, PermissionResolver, ResourceId, ResourceType};
use crate::auth::AuthenticatedPrincipal;
use crate::crypto::EnvelopeCipher;
use crate::ratelimit::{RateLimitClass, RateLimiter};
use crate::storage::{
    AuditAction, AuditEntry, AuditLogger, RecordStore, SecretField, SecretRecord, StorageError,
    VaultStore,
};

/// How long clients should keep a revealed value before clearing it.
pub const CLEAR_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum RevealError {
    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimitExceeded { retry_after: u64 },

    #[error("not authorized to read this secret")]
    Forbidden,

    #[error("secret not found")]
    NotFound,

    /// Decryption failed. Never distinguished from `NotFound` to callers.
    #[error("secret not available")]
    Unavailable,

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A decrypted field.
pub struct RevealedSecret {
    pub field: SecretField,
    pub plaintext: Zeroizing<Vec<u8>>,
    /// Client-side auto-clear hint
    pub clear_after: Duration,
}

impl std::fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealedSecret")
            .field("field", &self.field)
            .field("clear_after", &self.clear_after)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct SecretRevealService {
    store: Arc<dyn VaultStore>,
    resolver: PermissionResolver,
    limiter: Arc<RateLimiter>,
    cipher: Arc<EnvelopeCipher>,
    audit: AuditLogger,
}

impl SecretRevealService {
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

    /// Decrypt one field and record a SECRET_VIEWED entry.
    pub fn reveal(
        &self,
        caller: &AuthenticatedPrincipal,
        resource_type: ResourceType,
        id: ResourceId,
        field: &str,
    ) -> Result<RevealedSecret, RevealError> {
        let (record, field) =
            self.authorize(caller, RateLimitClass::Reveal, resource_type, id, field)?;
        let envelope = record.envelope(field).ok_or(RevealError::NotFound)?;

        let plaintext = self.cipher.decrypt(envelope).map_err(|e| {
            warn!(
                resource_type = %resource_type,
                resource_id = %id,
                field = %field,
                error = %e,
                "Stored secret failed to decrypt"
            );
            RevealError::Unavailable
        })?;

        self.audit.append(
            AuditEntry::new(AuditAction::SecretViewed, resource_type)
                .with_actor(caller.principal.id)
                .with_resource(record.id, record.name.as_str())
                .with_metadata(serde_json::json!({ "field": field.as_str() }))
                .with_origin(caller.origin.clone()),
        );

        Ok(RevealedSecret {
            field,
            plaintext,
            clear_after: CLEAR_AFTER,
        })
    }

    /// Record a SECRET_COPIED entry without decrypting.
    pub fn copy(
        &self,
        caller: &AuthenticatedPrincipal,
        resource_type: ResourceType,
        id: ResourceId,
        field: &str,
    ) -> Result<SecretField, RevealError> {
        let (record, field) =
            self.authorize(caller, RateLimitClass::Copy, resource_type, id, field)?;
        if record.envelope(field).is_none() {
            return Err(RevealError::NotFound);
        }

        self.audit.append(
            AuditEntry::new(AuditAction::SecretCopied, resource_type)
                .with_actor(caller.principal.id)
                .with_resource(record.id, record.name.as_str())
                .with_metadata(serde_json::json!({ "field": field.as_str() }))
                .with_origin(caller.origin.clone()),
        );

        Ok(field)
    }

    /// Steps shared by reveal and copy: rate limit, permission, record lookup.
    fn authorize(
        &self,
        caller: &AuthenticatedPrincipal,
        class: RateLimitClass,
        resource_type: ResourceType,
        id: ResourceId,
        field: &str,
    ) -> Result<(SecretRecord, SecretField), RevealError> {
        let principal = &caller.principal;

        let decision = self.limiter.check_class(class, &principal.id.to_string());
        if !decision.success {
            let retry_after = decision.retry_after.unwrap_or(1);
            warn!(
                principal_id = %principal.id,
                class = class.as_str(),
                retry_after,
                "Rate limit exceeded"
            );
            return Err(RevealError::RateLimitExceeded { retry_after });
        }

        let field = SecretField::parse_for(resource_type, field).ok_or_else(|| {
            RevealError::Validation(format!("unknown field '{field}' for {resource_type}"))
        })?;

        if !self
            .resolver
            .check_permission(principal, Action::Read, resource_type, Some(id))?
        {
            warn!(
                principal_id = %principal.id,
                resource_type = %resource_type,
                resource_id = %id,
                "Secret access denied"
            );
            return Err(RevealError::Forbidden);
        }

        let record = self
            .store
            .get_record(resource_type, id)?
            .filter(|record| record.active)
            .ok_or(RevealError::NotFound)?;

        Ok((record, field))
    }
}
