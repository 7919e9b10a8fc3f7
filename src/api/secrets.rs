// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret record endpoints.
//!
//! `{resource_type}` is `credentials` or `servers` (singular also accepted).
//! A record that does not exist and a record whose ciphertext fails to
//! authenticate produce the same 404 body on reveal.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    access::{ResourceId, ResourceType},
    auth::Auth,
    error::ApiError,
    models::{CopyResponse, CreateSecretRequest, FieldRequest, RevealResponse, UpdateFieldRequest},
    services::SecretSummary,
    state::AppState,
};

fn parse_type(raw: &str) -> Result<ResourceType, ApiError> {
    raw.parse().map_err(ApiError::bad_request)
}

#[utoipa::path(
    get,
    path = "/v1/secrets/{resource_type}",
    tag = "Secrets",
    params(("resource_type" = String, Path, description = "credentials or servers")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Records visible to the caller", body = [SecretSummary]),
        (status = 400, description = "Unknown resource type"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_secrets(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
) -> Result<Json<Vec<SecretSummary>>, ApiError> {
    let resource_type = parse_type(&resource_type)?;
    Ok(Json(state.secrets.list(&caller, resource_type)?))
}

#[utoipa::path(
    post,
    path = "/v1/secrets/{resource_type}",
    tag = "Secrets",
    params(("resource_type" = String, Path, description = "credentials or servers")),
    request_body = CreateSecretRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Record created", body = SecretSummary),
        (status = 400, description = "Invalid name or field"),
        (status = 403, description = "Forbidden"),
        (status = 429, description = "Too many creations")
    )
)]
pub async fn create_secret(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    Json(payload): Json<CreateSecretRequest>,
) -> Result<(StatusCode, Json<SecretSummary>), ApiError> {
    let resource_type = parse_type(&resource_type)?;
    let summary = state
        .secrets
        .create(&caller, resource_type, &payload.name, payload.fields)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[utoipa::path(
    put,
    path = "/v1/secrets/{resource_type}/{id}/fields/{field}",
    tag = "Secrets",
    params(
        ("resource_type" = String, Path, description = "credentials or servers"),
        ("id" = Uuid, Path, description = "Record ID"),
        ("field" = String, Path, description = "Field name, e.g. password")
    ),
    request_body = UpdateFieldRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Field replaced", body = SecretSummary),
        (status = 400, description = "Unknown field"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn update_field(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((resource_type, id, field)): Path<(String, Uuid, String)>,
    Json(payload): Json<UpdateFieldRequest>,
) -> Result<Json<SecretSummary>, ApiError> {
    let resource_type = parse_type(&resource_type)?;
    let summary = state.secrets.update_field(
        &caller,
        resource_type,
        ResourceId(id),
        &field,
        &payload.value,
    )?;
    Ok(Json(summary))
}

#[utoipa::path(
    delete,
    path = "/v1/secrets/{resource_type}/{id}",
    tag = "Secrets",
    params(
        ("resource_type" = String, Path, description = "credentials or servers"),
        ("id" = Uuid, Path, description = "Record ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Record deactivated"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn delete_secret(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let resource_type = parse_type(&resource_type)?;
    state.secrets.delete(&caller, resource_type, ResourceId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Decrypt one field. Rate limited per principal.
#[utoipa::path(
    post,
    path = "/v1/secrets/{resource_type}/{id}/reveal",
    tag = "Secrets",
    params(
        ("resource_type" = String, Path, description = "credentials or servers"),
        ("id" = Uuid, Path, description = "Record ID")
    ),
    request_body = FieldRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Plaintext value", body = RevealResponse),
        (status = 400, description = "Unknown field"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Secret not available"),
        (status = 429, description = "Too many reveals")
    )
)]
pub async fn reveal_secret(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, Uuid)>,
    Json(payload): Json<FieldRequest>,
) -> Result<Json<RevealResponse>, ApiError> {
    let resource_type = parse_type(&resource_type)?;
    let revealed = state
        .reveal
        .reveal(&caller, resource_type, ResourceId(id), &payload.field)?;

    Ok(Json(RevealResponse {
        field: revealed.field,
        value: String::from_utf8_lossy(&revealed.plaintext).into_owned(),
        clear_after_secs: revealed.clear_after.as_secs(),
    }))
}

/// Record that a field was copied to the clipboard. Nothing is decrypted.
#[utoipa::path(
    post,
    path = "/v1/secrets/{resource_type}/{id}/copy",
    tag = "Secrets",
    params(
        ("resource_type" = String, Path, description = "credentials or servers"),
        ("id" = Uuid, Path, description = "Record ID")
    ),
    request_body = FieldRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Copy recorded", body = CopyResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Secret not available"),
        (status = 429, description = "Too many copies")
    )
)]
pub async fn copy_secret(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, Uuid)>,
    Json(payload): Json<FieldRequest>,
) -> Result<Json<CopyResponse>, ApiError> {
    let resource_type = parse_type(&resource_type)?;
    let field = state
        .reveal
        .copy(&caller, resource_type, ResourceId(id), &payload.field)?;
    Ok(Json(CopyResponse {
        field,
        recorded: true,
    }))
}
