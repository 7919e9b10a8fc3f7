// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require ADMIN or above and provide:
//! - Principal creation, privilege changes and retirement
//! - Group, membership and grant management
//! - Audit log queries

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::blocking;
use crate::{
    access::{Group, GroupId, PrincipalId, ResourceGrant},
    auth::AdminOnly,
    error::ApiError,
    models::{
        AuditQueryParams, CreateGroupRequest, CreatePrincipalRequest, GrantTarget, PrincipalView,
        PrivilegeRequest, RetireRequest, SetGrantRequest,
    },
    state::AppState,
    storage::{AuditEntry, AuditFilter, RetirementSummary},
};

// ============================================================================
// Principals
// ============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/principals",
    tag = "Admin",
    request_body = CreatePrincipalRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Principal created", body = PrincipalView),
        (status = 400, description = "Invalid username or password"),
        (status = 403, description = "Level not below the caller's"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn create_principal(
    AdminOnly(caller): AdminOnly,
    State(state): State<AppState>,
    Json(payload): Json<CreatePrincipalRequest>,
) -> Result<(StatusCode, Json<PrincipalView>), ApiError> {
    let accounts = state.accounts.clone();
    let principal = blocking(move || {
        accounts
            .create_principal(&caller, &payload.username, &payload.password, payload.level)
            .map_err(ApiError::from)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(PrincipalView::from(&principal))))
}

#[utoipa::path(
    put,
    path = "/v1/admin/principals/{id}/privilege",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Principal ID")),
    request_body = PrivilegeRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Privilege changed", body = PrincipalView),
        (status = 403, description = "Caller not above target"),
        (status = 404, description = "Principal not found")
    )
)]
pub async fn change_privilege(
    AdminOnly(caller): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PrivilegeRequest>,
) -> Result<Json<PrincipalView>, ApiError> {
    let principal = state
        .accounts
        .change_privilege(&caller, PrincipalId(id), payload.level)?;
    Ok(Json(PrincipalView::from(&principal)))
}

/// Deactivate a principal and hand its records to a successor.
#[utoipa::path(
    post,
    path = "/v1/admin/principals/{id}/retire",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Principal ID")),
    request_body = RetireRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Principal retired", body = RetirementSummary),
        (status = 400, description = "Cannot retire yourself"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Principal not found"),
        (status = 409, description = "Already retired")
    )
)]
pub async fn retire_principal(
    AdminOnly(caller): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<RetireRequest>>,
) -> Result<Json<RetirementSummary>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let summary = state
        .accounts
        .retire_principal(&caller, PrincipalId(id), request.successor_id)?;
    Ok(Json(summary))
}

// ============================================================================
// Groups and grants
// ============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/groups",
    tag = "Admin",
    request_body = CreateGroupRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 409, description = "Group name taken")
    )
)]
pub async fn create_group(
    AdminOnly(caller): AdminOnly,
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let group = state.grants.create_group(&caller, &payload.name)?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    put,
    path = "/v1/admin/groups/{id}/members/{principal_id}",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("principal_id" = Uuid, Path, description = "Principal ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Member added"),
        (status = 404, description = "Group or principal not found")
    )
)]
pub async fn add_member(
    AdminOnly(caller): AdminOnly,
    State(state): State<AppState>,
    Path((id, principal_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .grants
        .add_member(&caller, GroupId(id), PrincipalId(principal_id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Write a grant, replacing the action set of an existing one.
#[utoipa::path(
    put,
    path = "/v1/admin/groups/{id}/grants",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = SetGrantRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Grant written", body = ResourceGrant),
        (status = 400, description = "Empty action set"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn set_grant(
    AdminOnly(caller): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetGrantRequest>,
) -> Result<Json<ResourceGrant>, ApiError> {
    let grant = state.grants.set_grant(
        &caller,
        GroupId(id),
        payload.target.resource_type,
        payload.target.scope(),
        payload.actions,
    )?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/v1/admin/groups/{id}/grants",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = GrantTarget,
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Grant revoked"),
        (status = 404, description = "Group or grant not found")
    )
)]
pub async fn revoke_grant(
    AdminOnly(caller): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrantTarget>,
) -> Result<StatusCode, ApiError> {
    state
        .grants
        .revoke_grant(&caller, GroupId(id), payload.resource_type, payload.scope())?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Audit
// ============================================================================

/// Query the audit trail, newest first.
#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    tag = "Admin",
    params(AuditQueryParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Matching audit entries", body = [AuditEntry]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn query_audit(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let filter = AuditFilter::from(params);
    Ok(Json(state.audit.entries(&filter)?))
}
