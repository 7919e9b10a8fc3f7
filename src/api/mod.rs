// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    access::{Action, GrantScope, Group, PrincipalId, ResourceGrant, ResourceType},
    auth::PrivilegeLevel,
    error::ApiError,
    models::{
        ChangePasswordRequest, CopyResponse, CreateGroupRequest, CreatePrincipalRequest,
        CreateSecretRequest, FieldRequest, GrantTarget, LoginRequest, PrincipalView,
        PrivilegeRequest, RetireRequest, RevealResponse, SetGrantRequest, UpdateFieldRequest,
    },
    services::{LoginOutcome, SecretSummary},
    state::AppState,
    storage::{AuditAction, AuditEntry, RetirementSummary, SecretField},
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod secrets;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password", post(auth::change_password))
        .route(
            "/secrets/{resource_type}",
            get(secrets::list_secrets).post(secrets::create_secret),
        )
        .route(
            "/secrets/{resource_type}/{id}",
            axum::routing::delete(secrets::delete_secret),
        )
        .route(
            "/secrets/{resource_type}/{id}/fields/{field}",
            put(secrets::update_field),
        )
        .route(
            "/secrets/{resource_type}/{id}/reveal",
            post(secrets::reveal_secret),
        )
        .route("/secrets/{resource_type}/{id}/copy", post(secrets::copy_secret))
        .route("/admin/principals", post(admin::create_principal))
        .route(
            "/admin/principals/{id}/privilege",
            put(admin::change_privilege),
        )
        .route(
            "/admin/principals/{id}/retire",
            post(admin::retire_principal),
        )
        .route("/admin/groups", post(admin::create_group))
        .route(
            "/admin/groups/{id}/members/{principal_id}",
            put(admin::add_member),
        )
        .route(
            "/admin/groups/{id}/grants",
            put(admin::set_grant).delete(admin::revoke_grant),
        )
        .route("/admin/audit", get(admin::query_audit))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run password hashing and other CPU-heavy service calls off the runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(ApiError::internal)?
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        auth::login,
        auth::logout,
        auth::change_password,
        secrets::list_secrets,
        secrets::create_secret,
        secrets::update_field,
        secrets::delete_secret,
        secrets::reveal_secret,
        secrets::copy_secret,
        admin::create_principal,
        admin::change_privilege,
        admin::retire_principal,
        admin::create_group,
        admin::add_member,
        admin::set_grant,
        admin::revoke_grant,
        admin::query_audit
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            LoginRequest,
            LoginOutcome,
            ChangePasswordRequest,
            CreateSecretRequest,
            UpdateFieldRequest,
            FieldRequest,
            RevealResponse,
            CopyResponse,
            SecretSummary,
            SecretField,
            CreatePrincipalRequest,
            PrivilegeRequest,
            RetireRequest,
            RetirementSummary,
            PrincipalView,
            PrincipalId,
            PrivilegeLevel,
            CreateGroupRequest,
            Group,
            GrantTarget,
            SetGrantRequest,
            ResourceGrant,
            GrantScope,
            ResourceType,
            Action,
            AuditEntry,
            AuditAction
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Sessions and passwords"),
        (name = "Secrets", description = "Encrypted credential and server records"),
        (name = "Admin", description = "Principals, groups, grants and audit")
    )
)]
struct ApiDoc;
