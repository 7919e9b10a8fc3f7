// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Services
//!
//! Orchestration of the vault's privileged operations. Every service method
//! takes the calling [`AuthenticatedPrincipal`], checks authorization before
//! touching data, and appends an audit entry on success.
//!
//! - [`SecretRevealService`]: reveal and copy of protected fields
//! - [`SecretService`]: create, update, delete and list secret records
//! - [`AccountService`]: sessions, passwords, privilege and retirement
//! - [`GrantService`]: groups, memberships and grants
//!
//! [`AuthenticatedPrincipal`]: crate::auth::AuthenticatedPrincipal

pub mod accounts;
pub mod grants;
pub mod reveal;
pub mod secrets;

pub use accounts::{AccountService, LoginOutcome};
pub use grants::GrantService;
pub use reveal::{RevealError, RevealedSecret, SecretRevealService, CLEAR_AFTER};
pub use secrets::{SecretService, SecretSummary};

use crate::auth::AuthError;
use crate::crypto::CryptoError;
use crate::storage::StorageError;

/// Errors returned by the services other than reveal/copy.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad credentials. Deliberately uninformative.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("session error: {0}")]
    Session(#[from] AuthError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ServiceError::NotFound(what),
            StorageError::AlreadyExists(what) => {
                ServiceError::Conflict(format!("{what} already exists"))
            }
            other => ServiceError::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_name(kind: &str, name: &str) -> ServiceResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{kind} must not be empty")));
    }
    if trimmed.len() > 256 {
        return Err(ServiceError::Validation(format!(
            "{kind} must be at most 256 characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
