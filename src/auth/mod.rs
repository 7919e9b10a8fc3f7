// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session authentication for the vault API.
//!
//! ## Auth Flow
//!
//! 1. Client posts username and password to `/v1/auth/login`
//! 2. Server verifies the Argon2id hash and issues an HS256 session token
//! 3. Client sends `Authorization: Bearer <token>` on every other request
//! 4. The [`Auth`] extractor verifies signature, expiry and issuer, then
//!    reloads the principal from the store
//!
//! ## Security
//!
//! - All non-health endpoints except login require authentication
//! - A retired principal's outstanding tokens stop working immediately
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;
pub mod session;

pub use claims::{AuthenticatedPrincipal, SessionClaims};
pub use error::AuthError;
pub use extractor::{client_origin, AdminOnly, Auth};
pub use roles::PrivilegeLevel;
pub use session::{IssuedSession, SessionKeys, SESSION_ISSUER};
