// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated principal.

use serde::{Deserialize, Serialize};

use crate::access::Principal;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the principal id
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    pub iss: String,
}

/// The principal making a request, reloaded from the store.
///
/// This is the primary type used throughout the services to represent the
/// caller; the privilege level and active flag are current, not whatever
/// the token was issued with.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub principal: Principal,
    /// Client network origin, if known
    pub origin: Option<String>,
}

impl AuthenticatedPrincipal {
    pub fn new(principal: Principal, origin: Option<String>) -> Self {
        Self { principal, origin }
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }
}
