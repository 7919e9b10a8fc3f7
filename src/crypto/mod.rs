// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secret Cryptography
//!
//! Every protected field is stored as an [`Envelope`]: AES-256-GCM output
//! with a fresh 96-bit random nonce and a detached 128-bit tag.
//!
//! ## Key custody
//!
//! - Stored secrets are encrypted with one system-wide key
//!   (`VAULT_ENCRYPTION_KEY`), held by [`EnvelopeCipher`].
//! - [`PasswordVault`] can additionally derive a master key from a password
//!   (Argon2id) and wrap a random data-encryption key with it. This wrapping
//!   hierarchy is available to callers but is not on the default secret path.

pub mod envelope;
pub mod error;
pub mod password;

pub use envelope::{Envelope, EnvelopeCipher, ENVELOPE_V1, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use password::{KdfParams, PasswordVault, WrappedDataKey};

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

/// Generate a random 256-bit key.
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng.fill_bytes(key.as_mut());
    key
}

/// Base64 (standard alphabet, padded) serde adapter for byte fields.
pub(crate) mod b64 {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(serde::de::Error::custom)
    }

    /// Like [`deserialize`], but malformed input yields an empty buffer.
    ///
    /// Used for stored ciphertext, where a damaged value must surface as an
    /// authentication failure at decrypt time rather than a parse error.
    pub fn deserialize_lossy<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Other(serde::de::IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(encoded) => Base64::decode_vec(&encoded).unwrap_or_default(),
            Raw::Other(_) => Vec::new(),
        })
    }
}
