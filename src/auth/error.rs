// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session errors and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Bearer token is required")]
    MissingToken,

    #[error("Authorization header must be 'Bearer <token>'")]
    BadScheme,

    #[error("Session token is malformed")]
    MalformedToken,

    #[error("Session token signature does not verify")]
    BadSignature,

    #[error("Session has expired")]
    Expired,

    /// The subject was retired or no longer exists.
    #[error("Session is no longer valid")]
    Revoked,

    #[error("ADMIN privilege required")]
    AdminRequired,

    #[error("session signing failed: {0}")]
    Signing(String),

    #[error("principal lookup failed: {0}")]
    Lookup(#[from] StorageError),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: &'static str,
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::BadScheme => "bad_scheme",
            AuthError::MalformedToken => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "session_expired",
            AuthError::Revoked => "session_revoked",
            AuthError::AdminRequired => "admin_required",
            AuthError::Signing(_) | AuthError::Lookup(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::AdminRequired => StatusCode::FORBIDDEN,
            AuthError::Signing(_) | AuthError::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Session handling failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = Json(AuthErrorBody {
            error,
            error_code: self.code(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body(err: AuthError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_token_is_401_with_code() {
        let (status, json) = body(AuthError::MissingToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error_code"], "missing_token");
    }

    #[tokio::test]
    async fn admin_required_is_403() {
        let (status, _) = body(AuthError::AdminRequired).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn internal_failures_are_not_echoed() {
        let (status, json) = body(AuthError::Lookup(StorageError::LockPoisoned)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }

    #[test]
    fn revoked_session_is_unauthorized() {
        assert_eq!(AuthError::Revoked.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Expired.status(), StatusCode::UNAUTHORIZED);
    }
}
