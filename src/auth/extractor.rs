// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated principals.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller is AuthenticatedPrincipal
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use super::{AuthError, AuthenticatedPrincipal};
use crate::access::PrincipalId;
use crate::state::AppState;
use crate::storage::DirectoryStore;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Extractor for authenticated principals.
///
/// Verifies the bearer session token, then reloads the principal so that a
/// retired account or a privilege change takes effect on the next request.
pub struct Auth(pub AuthenticatedPrincipal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::BadScheme)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::BadScheme)?;

        let claims = state.sessions.verify(token)?;
        let principal_id: PrincipalId = claims.sub.parse().map_err(|_| AuthError::MalformedToken)?;

        let principal = state
            .store
            .get_principal(principal_id)?
            .filter(|p| p.active)
            .ok_or_else(|| {
                warn!(principal_id = %principal_id, "Session for unknown or retired principal");
                AuthError::Revoked
            })?;

        Ok(Auth(AuthenticatedPrincipal::new(
            principal,
            client_origin(&parts.headers),
        )))
    }
}

/// Extractor that requires ADMIN or above.
pub struct AdminOnly(pub AuthenticatedPrincipal);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(caller) = Auth::from_request_parts(parts, state).await?;

        if !caller.is_admin() {
            return Err(AuthError::AdminRequired);
        }

        Ok(AdminOnly(caller))
    }
}

/// Client address as reported by the fronting proxy.
pub fn client_origin(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get(REAL_IP)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}
