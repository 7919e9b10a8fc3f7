// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::services::{RevealError, ServiceError};
use crate::storage::StorageError;

/// Body shared by secret-not-found and secret-undecryptable responses.
pub const SECRET_NOT_AVAILABLE: &str = "Secret not available";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Seconds for the `Retry-After` header on 429 responses
    pub retry_after: Option<u64>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn too_many_requests(retry_after: u64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")
        }
    }

    /// Generic 500. The cause is logged, never returned.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(error = %cause, "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        let mut response = (self.status, body).into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::InvalidCredentials => ApiError::unauthorized(e.to_string()),
            ServiceError::Forbidden(_) => ApiError::forbidden(e.to_string()),
            ServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            ServiceError::Validation(message) => ApiError::bad_request(message),
            ServiceError::Conflict(_) => ApiError::conflict(e.to_string()),
            ServiceError::RateLimited { retry_after } => ApiError::too_many_requests(retry_after),
            ServiceError::Session(ref auth)
                if auth.status() != StatusCode::INTERNAL_SERVER_ERROR =>
            {
                ApiError::new(auth.status(), auth.to_string())
            }
            ServiceError::Storage(_) | ServiceError::Crypto(_) | ServiceError::Session(_) => {
                ApiError::internal(e)
            }
        }
    }
}

impl From<RevealError> for ApiError {
    fn from(e: RevealError) -> Self {
        match e {
            RevealError::RateLimitExceeded { retry_after } => {
                ApiError::too_many_requests(retry_after)
            }
            RevealError::Forbidden => ApiError::forbidden("Access denied"),
            RevealError::NotFound | RevealError::Unavailable => {
                ApiError::not_found(SECRET_NOT_AVAILABLE)
            }
            RevealError::Validation(message) => ApiError::bad_request(message),
            RevealError::Storage(e) => ApiError::from(e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::from(ServiceError::from(e))
    }
}
