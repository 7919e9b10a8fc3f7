// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Versioned authenticated-encryption envelope.
//!
//! ## Stored representation
//!
//! ```text
//! {"version": 1, "iv": "<base64>", "ciphertext": "<base64>", "tag": "<base64>"}
//! ```
//!
//! Collaborators persisting a secret store exactly this shape and never
//! inspect or mutate its contents. Updating a field means encrypting again,
//! which always draws a new nonce.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Key, Nonce, Tag,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{b64, CryptoError, CryptoResult};

/// Size of the system key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Envelope format version 1: AES-256-GCM, random nonce, no associated data.
pub const ENVELOPE_V1: u32 = 1;

/// Version written by [`EnvelopeCipher::encrypt`].
const CURRENT_VERSION: u32 = ENVELOPE_V1;

/// An encrypted secret field.
///
/// Deserialization never fails on damaged contents: missing or malformed
/// parts decode as empty (version 0), and [`EnvelopeCipher::decrypt`]
/// rejects the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    #[serde(deserialize_with = "lossy_version")]
    pub version: u32,
    #[serde(serialize_with = "b64::serialize", deserialize_with = "b64::deserialize_lossy")]
    pub iv: Vec<u8>,
    #[serde(serialize_with = "b64::serialize", deserialize_with = "b64::deserialize_lossy")]
    pub ciphertext: Vec<u8>,
    #[serde(serialize_with = "b64::serialize", deserialize_with = "b64::deserialize_lossy")]
    pub tag: Vec<u8>,
}

fn lossy_version<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(version) => version,
        Raw::Other(_) => 0,
    })
}

type DecodeFn = fn(&Aes256Gcm, &Envelope) -> CryptoResult<Zeroizing<Vec<u8>>>;

/// Version number -> decode routine. New formats get a new row.
const DECODERS: &[(u32, DecodeFn)] = &[(ENVELOPE_V1, decode_v1)];

fn decoder_for(version: u32) -> Option<DecodeFn> {
    DECODERS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, decode)| *decode)
}

fn decode_v1(cipher: &Aes256Gcm, envelope: &Envelope) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if envelope.iv.len() != NONCE_SIZE || envelope.tag.len() != TAG_SIZE {
        return Err(CryptoError::Authentication);
    }

    let mut buffer = Zeroizing::new(envelope.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&envelope.iv),
            b"",
            buffer.as_mut_slice(),
            Tag::from_slice(&envelope.tag),
        )
        .map_err(|_| CryptoError::Authentication)?;

    Ok(buffer)
}

/// Encrypts and decrypts envelopes under a single 256-bit key.
///
/// Holds no mutable state; share it freely behind an `Arc`.
#[derive(Clone)]
pub struct EnvelopeCipher {
    cipher: Aes256Gcm,
}

impl EnvelopeCipher {
    /// Create a cipher from a 256-bit key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Create a cipher from key bytes of unchecked length.
    pub fn from_slice(key: &[u8]) -> CryptoResult<Self> {
        let key: &[u8; KEY_SIZE] = key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        })?;
        Ok(Self::new(key))
    }

    /// Encrypt `plaintext` under a freshly drawn random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Envelope> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| CryptoError::Encryption)?;

        Ok(Envelope {
            version: CURRENT_VERSION,
            iv: nonce.to_vec(),
            ciphertext: buffer,
            tag: tag.to_vec(),
        })
    }

    /// Verify and decrypt an envelope.
    ///
    /// Plaintext is only returned after the tag has been verified.
    pub fn decrypt(&self, envelope: &Envelope) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let decode = decoder_for(envelope.version)
            .ok_or(CryptoError::UnsupportedVersion(envelope.version))?;
        decode(&self.cipher, envelope)
    }
}

impl std::fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeCipher")
            .field("key", &"[redacted]")
            .finish()
    }
}
