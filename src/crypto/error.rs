// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cryptographic errors.

/// Errors raised by the envelope cipher and the password vault.
///
/// `Authentication` deliberately carries no detail: a wrong key, a flipped
/// bit and a truncated envelope all look the same to the caller.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("envelope authentication failed")]
    Authentication,

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    #[error("encryption failed")]
    Encryption,

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("malformed password hash: {0}")]
    MalformedHash(String),

    #[error("invalid key derivation parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
