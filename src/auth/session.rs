// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session tokens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::{AuthError, SessionClaims};
use crate::access::Principal;

/// Issuer written into and required from every session token.
pub const SESSION_ISSUER: &str = "credvault";

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<IssuedSession, AuthError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let expires_at = now + ttl;

        let claims = SessionClaims {
            sub: principal.id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: SESSION_ISSUER.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedSession { token, expires_at })
    }

    /// Verify signature, expiry and issuer.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_issuer(&[SESSION_ISSUER]);

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                _ => AuthError::MalformedToken,
            })
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PrivilegeLevel;

    fn keys() -> SessionKeys {
        SessionKeys::new(b"test-secret-with-enough-entropy!", Duration::from_secs(3600))
    }

    fn principal() -> Principal {
        Principal::new("alice", PrivilegeLevel::User, String::new())
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys();
        let alice = principal();
        let session = keys.issue(&alice).unwrap();

        let claims = keys.verify(&session.token).unwrap();
        assert_eq!(claims.sub, alice.id.to_string());
        assert_eq!(claims.iss, SESSION_ISSUER);
        assert_eq!(claims.exp, session.expires_at.timestamp());
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let session = keys().issue(&principal()).unwrap();
        let other = SessionKeys::new(b"another-secret-entirely-different", Duration::from_secs(60));
        assert!(matches!(
            other.verify(&session.token),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let past = Utc::now().timestamp() - 3600;
        let claims = SessionClaims {
            sub: principal().id.to_string(),
            iat: past - 60,
            exp: past,
            iss: SESSION_ISSUER.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            keys().verify("not-a-token"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn debug_hides_keys() {
        assert!(!format!("{:?}", keys()).contains("secret"));
    }
}
