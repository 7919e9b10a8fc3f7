// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing and the password-derived key-wrapping hierarchy.
//!
//! Both use Argon2id. Cost parameters come from a single [`KdfParams`]
//! table rather than being spelled out at call sites:
//!
//! | Field | Recommended | Tests |
//! |-------|-------------|-------|
//! | `memory_kib` | 19456 | 1024 |
//! | `time_cost` | 2 | 1 |
//! | `parallelism` | 1 | 1 |
//! | `output_len` | 32 | 32 |
//!
//! Stored password hashes are PHC strings and carry their own parameters, so
//! retuning the table never invalidates existing hashes. Wrapped data keys
//! likewise record the parameters they were derived with.

use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use argon2::{
    password_hash::{
        rand_core::OsRng as PhcRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{b64, generate_key, CryptoError, CryptoResult, Envelope, EnvelopeCipher, KEY_SIZE};

/// Salt length for master-key derivation.
pub const SALT_SIZE: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl KdfParams {
    /// Production parameters (the Argon2 crate defaults for Argon2id).
    pub const RECOMMENDED: KdfParams = KdfParams {
        memory_kib: 19_456,
        time_cost: 2,
        parallelism: 1,
        output_len: KEY_SIZE,
    };

    /// Fast parameters for unit tests ONLY.
    pub const TESTING: KdfParams = KdfParams {
        memory_kib: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: KEY_SIZE,
    };

    fn to_argon2(self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.time_cost,
            self.parallelism,
            Some(self.output_len),
        )
        .map_err(|e| CryptoError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        #[cfg(test)]
        {
            Self::TESTING
        }

        #[cfg(not(test))]
        {
            Self::RECOMMENDED
        }
    }
}

/// A data-encryption key wrapped under a password-derived master key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedDataKey {
    pub kdf: KdfParams,
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    pub envelope: Envelope,
}

/// Password hashing, verification and key wrapping.
#[derive(Debug, Clone)]
pub struct PasswordVault {
    params: KdfParams,
    /// Hash of a random password under `params`; verified against when no
    /// real hash exists so that lookups cost the same either way.
    decoy_hash: Arc<str>,
    #[cfg(test)]
    verifications: Arc<AtomicUsize>,
}

impl PasswordVault {
    /// Create a vault, validating the parameter table up front.
    pub fn new(params: KdfParams) -> CryptoResult<Self> {
        let argon2 = params.to_argon2()?;

        let mut decoy = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng.fill_bytes(decoy.as_mut());
        let decoy_hash = argon2
            .hash_password(&decoy[..], &SaltString::generate(&mut PhcRng))
            .map_err(|e| CryptoError::Hashing(e.to_string()))?
            .to_string();

        Ok(Self {
            params,
            decoy_hash: decoy_hash.into(),
            #[cfg(test)]
            verifications: Arc::default(),
        })
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Hash a password into a PHC string (`$argon2id$v=19$...`).
    pub fn hash(&self, password: &str) -> CryptoResult<String> {
        let salt = SaltString::generate(&mut PhcRng);
        self.params
            .to_argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CryptoError::Hashing(e.to_string()))
    }

    /// Verify a password against a stored PHC string.
    ///
    /// A mismatch is `Ok(false)`. A stored hash that cannot be parsed is a
    /// configuration problem and comes back as `MalformedHash`.
    pub fn verify(&self, password: &str, stored_hash: &str) -> CryptoResult<bool> {
        #[cfg(test)]
        self.verifications.fetch_add(1, Ordering::Relaxed);

        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| CryptoError::MalformedHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CryptoError::MalformedHash(e.to_string())),
        }
    }

    /// Run a full verification against the decoy hash and discard the result.
    ///
    /// Call this on paths that reject before any stored hash is available.
    pub fn verify_decoy(&self, password: &str) {
        let _ = self.verify(password, &self.decoy_hash);
    }

    #[cfg(test)]
    pub(crate) fn verification_count(&self) -> usize {
        self.verifications.load(Ordering::Relaxed)
    }

    /// Derive a 256-bit master key from a password and salt.
    pub fn derive_master_key(
        &self,
        password: &[u8],
        salt: &[u8],
    ) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
        derive_with(self.params, password, salt)
    }

    /// Generate a random DEK and wrap it under a key derived from `password`.
    ///
    /// Returns the plaintext DEK for immediate use alongside its storable
    /// wrapped form.
    pub fn wrap_new_data_key(
        &self,
        password: &[u8],
    ) -> CryptoResult<(Zeroizing<[u8; KEY_SIZE]>, WrappedDataKey)> {
        let dek = generate_key();
        let wrapped = self.wrap_data_key(password, &dek)?;
        Ok((dek, wrapped))
    }

    /// Wrap an existing DEK under a key derived from `password`.
    pub fn wrap_data_key(
        &self,
        password: &[u8],
        dek: &[u8; KEY_SIZE],
    ) -> CryptoResult<WrappedDataKey> {
        let mut salt = vec![0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let master = self.derive_master_key(password, &salt)?;
        let envelope = EnvelopeCipher::new(&master).encrypt(dek)?;

        Ok(WrappedDataKey {
            kdf: self.params,
            salt,
            envelope,
        })
    }

    /// Recover a DEK. A wrong password fails as `Authentication`.
    pub fn unwrap_data_key(
        &self,
        password: &[u8],
        wrapped: &WrappedDataKey,
    ) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
        let master = derive_with(wrapped.kdf, password, &wrapped.salt)?;
        let plaintext = EnvelopeCipher::new(&master).decrypt(&wrapped.envelope)?;

        let bytes: &[u8; KEY_SIZE] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Authentication)?;
        Ok(Zeroizing::new(*bytes))
    }
}

fn derive_with(
    params: KdfParams,
    password: &[u8],
    salt: &[u8],
) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    if params.output_len != KEY_SIZE {
        return Err(CryptoError::InvalidParams(format!(
            "master key output length must be {KEY_SIZE}, got {}",
            params.output_len
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    params
        .to_argon2()?
        .hash_password_into(password, salt, key.as_mut())
        .map_err(|e| CryptoError::InvalidParams(e.to_string()))?;
    Ok(key)
}
