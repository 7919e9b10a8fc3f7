// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use super::blocking;
use crate::{
    auth::{client_origin, Auth},
    error::ApiError,
    models::{ChangePasswordRequest, LoginRequest},
    services::LoginOutcome,
    state::AppState,
};

/// Exchange username and password for a session token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginOutcome),
        (status = 401, description = "Invalid username or password"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let origin = client_origin(&headers);
    let accounts = state.accounts.clone();
    let outcome = blocking(move || {
        accounts
            .login(&payload.username, &payload.password, origin)
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(outcome))
}

/// End the session. Tokens are stateless; this records the logout.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(Auth(caller): Auth, State(state): State<AppState>) -> StatusCode {
    state.accounts.logout(&caller);
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    post,
    path = "/v1/auth/password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "New password rejected"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Current password is wrong")
    )
)]
pub async fn change_password(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let accounts = state.accounts.clone();
    blocking(move || {
        accounts
            .change_password(&caller, &payload.current_password, &payload.new_password)
            .map_err(ApiError::from)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
