// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Accounts: sessions, passwords, privilege changes and retirement.
//!
//! ## Privilege rules
//!
//! - Creating an account or changing a level requires the actor to sit
//!   strictly above every level involved.
//! - Retiring requires an admin at least as privileged as the target, and
//!   never the target itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::{validate_name, validate_password, ServiceError, ServiceResult};
use crate::access::{Principal, PrincipalId, ResourceType};
use crate::auth::{AuthenticatedPrincipal, PrivilegeLevel, SessionKeys};
use crate::crypto::PasswordVault;
use crate::ratelimit::{RateLimitClass, RateLimiter};
use crate::storage::{
    AuditAction, AuditEntry, AuditLogger, DirectoryStore, RetirementSummary, VaultStore,
};

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub principal_id: PrincipalId,
    pub level: PrivilegeLevel,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn VaultStore>,
    vault: PasswordVault,
    sessions: SessionKeys,
    limiter: Arc<RateLimiter>,
    audit: AuditLogger,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn VaultStore>,
        vault: PasswordVault,
        sessions: SessionKeys,
        limiter: Arc<RateLimiter>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            store,
            vault,
            sessions,
            limiter,
            audit,
        }
    }

    /// Seed a SUPER_ADMIN when the store holds no principals yet.
    pub fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> ServiceResult<Option<Principal>> {
        if self.store.count_principals()? > 0 {
            return Ok(None);
        }
        validate_name("username", username)?;
        validate_password(password)?;

        let principal = Principal::new(
            username.trim(),
            PrivilegeLevel::SuperAdmin,
            self.vault.hash(password)?,
        );
        self.store.insert_principal(&principal)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Create, ResourceType::User)
                .with_resource(principal.id, principal.username.as_str())
                .with_metadata(serde_json::json!({ "level": principal.level, "bootstrap": true })),
        );
        info!(
            principal_id = %principal.id,
            username = %principal.username,
            "Bootstrap admin created"
        );

        Ok(Some(principal))
    }

    /// Verify credentials and issue a session token.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        origin: Option<String>,
    ) -> ServiceResult<LoginOutcome> {
        let decision = self.limiter.check_class(RateLimitClass::Login, username);
        if !decision.success {
            let retry_after = decision.retry_after.unwrap_or(1);
            warn!(username = %username, retry_after, "Login rate limit exceeded");
            return Err(ServiceError::RateLimited { retry_after });
        }

        let candidate = self
            .store
            .find_principal_by_username(username)?
            .filter(|principal| principal.active);

        let Some(principal) = candidate else {
            self.vault.verify_decoy(password);
            self.audit.append(
                AuditEntry::new(AuditAction::LoginFailed, ResourceType::User)
                    .with_metadata(serde_json::json!({ "username": username }))
                    .with_origin(origin),
            );
            return Err(ServiceError::InvalidCredentials);
        };

        let verified = self
            .vault
            .verify(password, &principal.password_hash)
            .inspect_err(|e| {
                error!(
                    principal_id = %principal.id,
                    error = %e,
                    "Stored password hash is unusable"
                );
            })?;

        if !verified {
            self.audit.append(
                AuditEntry::new(AuditAction::LoginFailed, ResourceType::User)
                    .with_resource(principal.id, principal.username.as_str())
                    .with_origin(origin),
            );
            return Err(ServiceError::InvalidCredentials);
        }

        let session = self.sessions.issue(&principal)?;
        self.audit.append(
            AuditEntry::new(AuditAction::Login, ResourceType::User)
                .with_actor(principal.id)
                .with_resource(principal.id, principal.username.as_str())
                .with_origin(origin),
        );

        Ok(LoginOutcome {
            token: session.token,
            expires_at: session.expires_at,
            principal_id: principal.id,
            level: principal.level,
        })
    }

    /// Record the end of a session. Tokens are stateless and simply expire.
    pub fn logout(&self, caller: &AuthenticatedPrincipal) {
        self.audit.append(
            AuditEntry::new(AuditAction::Logout, ResourceType::User)
                .with_actor(caller.principal.id)
                .with_resource(caller.principal.id, caller.principal.username.as_str())
                .with_origin(caller.origin.clone()),
        );
    }

    pub fn change_password(
        &self,
        caller: &AuthenticatedPrincipal,
        current: &str,
        new: &str,
    ) -> ServiceResult<()> {
        let decision = self
            .limiter
            .check_class(RateLimitClass::Login, &caller.principal.id.to_string());
        if !decision.success {
            let retry_after = decision.retry_after.unwrap_or(1);
            warn!(
                principal_id = %caller.principal.id,
                retry_after,
                "Password change rate limit exceeded"
            );
            return Err(ServiceError::RateLimited { retry_after });
        }

        validate_password(new)?;
        let mut principal = self
            .store
            .get_principal(caller.principal.id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Principal {}", caller.principal.id)))?;

        if !self.vault.verify(current, &principal.password_hash)? {
            self.audit.append(
                AuditEntry::new(AuditAction::LoginFailed, ResourceType::User)
                    .with_resource(principal.id, principal.username.as_str())
                    .with_metadata(serde_json::json!({ "operation": "change_password" }))
                    .with_origin(caller.origin.clone()),
            );
            return Err(ServiceError::Forbidden(
                "current password is incorrect".to_string(),
            ));
        }

        principal.password_hash = self.vault.hash(new)?;
        self.store.update_principal(&principal)?;

        self.audit.append(
            AuditEntry::new(AuditAction::PasswordChanged, ResourceType::User)
                .with_actor(principal.id)
                .with_resource(principal.id, principal.username.as_str())
                .with_origin(caller.origin.clone()),
        );
        Ok(())
    }

    /// Enroll a new account.
    pub fn create_principal(
        &self,
        caller: &AuthenticatedPrincipal,
        username: &str,
        password: &str,
        level: PrivilegeLevel,
    ) -> ServiceResult<Principal> {
        let actor = &caller.principal;
        if !actor.is_admin() || !actor.level.is_above(level) {
            return Err(ServiceError::Forbidden(format!(
                "{} may not create {} accounts",
                actor.level, level
            )));
        }
        validate_name("username", username)?;
        validate_password(password)?;

        let principal = Principal::new(username.trim(), level, self.vault.hash(password)?);
        self.store.insert_principal(&principal)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Create, ResourceType::User)
                .with_actor(actor.id)
                .with_resource(principal.id, principal.username.as_str())
                .with_metadata(serde_json::json!({ "level": level }))
                .with_origin(caller.origin.clone()),
        );
        Ok(principal)
    }

    /// Change another principal's privilege level.
    pub fn change_privilege(
        &self,
        caller: &AuthenticatedPrincipal,
        target_id: PrincipalId,
        level: PrivilegeLevel,
    ) -> ServiceResult<Principal> {
        let actor = &caller.principal;
        let mut target = self
            .store
            .get_principal(target_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Principal {target_id}")))?;

        if !actor.level.is_above(target.level) || !actor.level.is_above(level) {
            warn!(
                principal_id = %actor.id,
                target_id = %target_id,
                requested = %level,
                "Privilege change denied"
            );
            return Err(ServiceError::Forbidden(
                "privilege changes require a strictly higher level".to_string(),
            ));
        }

        let previous = target.level;
        target.level = level;
        self.store.update_principal(&target)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Update, ResourceType::User)
                .with_actor(actor.id)
                .with_resource(target.id, target.username.as_str())
                .with_metadata(serde_json::json!({ "level": { "from": previous, "to": level } }))
                .with_origin(caller.origin.clone()),
        );
        Ok(target)
    }

    /// Retire a principal, handing its records to `successor` (default: the
    /// caller).
    pub fn retire_principal(
        &self,
        caller: &AuthenticatedPrincipal,
        target_id: PrincipalId,
        successor: Option<PrincipalId>,
    ) -> ServiceResult<RetirementSummary> {
        let actor = &caller.principal;
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "retiring principals requires ADMIN".to_string(),
            ));
        }
        if target_id == actor.id {
            return Err(ServiceError::Validation(
                "a principal cannot retire itself".to_string(),
            ));
        }

        let target = self
            .store
            .get_principal(target_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Principal {target_id}")))?;
        if !actor.level.is_at_least(target.level) {
            return Err(ServiceError::Forbidden(format!(
                "{} may not retire {}",
                actor.level, target.level
            )));
        }
        if !target.active {
            return Err(ServiceError::Conflict(format!(
                "Principal {target_id} is already retired"
            )));
        }

        let successor_id = successor.unwrap_or(actor.id);
        if successor_id == target_id {
            return Err(ServiceError::Validation(
                "successor must differ from the retired principal".to_string(),
            ));
        }
        let heir = self
            .store
            .get_principal(successor_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Principal {successor_id}")))?;
        if !heir.active {
            return Err(ServiceError::Validation(
                "successor must be an active principal".to_string(),
            ));
        }

        let summary = self.store.retire_principal(target_id, successor_id)?;

        self.audit.append(
            AuditEntry::new(AuditAction::Delete, ResourceType::User)
                .with_actor(actor.id)
                .with_resource(target.id, target.username.as_str())
                .with_metadata(serde_json::json!({
                    "successor_id": successor_id,
                    "records_reassigned": summary.records_reassigned,
                    "audit_entries_detached": summary.audit_entries_detached,
                }))
                .with_origin(caller.origin.clone()),
        );
        info!(
            principal_id = %actor.id,
            target_id = %target_id,
            successor_id = %successor_id,
            "Principal retired"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::access::Action;
    use crate::services::testing::Harness;
    use crate::services::SecretService;
    use crate::storage::{AuditFilter, DirectoryStore, RecordStore, SecretRecord};

    const PASSWORD: &str = "correct horse battery";

    fn service(h: &Harness) -> AccountService {
        AccountService::new(
            h.store.clone(),
            h.vault.clone(),
            SessionKeys::new(b"unit-test-session-secret-0123456", Duration::from_secs(600)),
            h.limiter.clone(),
            h.audit.clone(),
        )
    }

    fn last_action(h: &Harness) -> AuditAction {
        h.audit.entries(&AuditFilter::default()).unwrap()[0].action
    }

    #[test]
    fn login_issues_token_and_audits() {
        let h = Harness::new();
        let alice = h.principal("alice", PrivilegeLevel::User);
        let svc = service(&h);

        let outcome = svc.login("alice", PASSWORD, Some("192.0.2.1".into())).unwrap();
        assert_eq!(outcome.principal_id, alice.principal.id);
        assert!(!outcome.token.is_empty());

        let entries = h.audit.entries(&AuditFilter::default()).unwrap();
        assert_eq!(entries[0].action, AuditAction::Login);
        assert_eq!(entries[0].origin.as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn bad_password_and_unknown_user_look_the_same() {
        let h = Harness::new();
        h.principal("alice", PrivilegeLevel::User);
        let svc = service(&h);

        let wrong = svc.login("alice", "nope-nope-nope", None).unwrap_err();
        let unknown = svc.login("mallory", PASSWORD, None).unwrap_err();
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());

        let failed = h
            .audit
            .entries(&AuditFilter {
                action: Some(AuditAction::LoginFailed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(failed.len(), 2);
    }

    #[test]
    fn every_rejected_login_runs_the_password_kdf() {
        let h = Harness::new();
        h.principal("alice", PrivilegeLevel::User);
        let retired = h.principal("retired", PrivilegeLevel::User);
        let mut inactive = retired.principal.clone();
        inactive.active = false;
        h.store.update_principal(&inactive).unwrap();
        let svc = service(&h);

        for username in ["alice", "mallory", "retired"] {
            let before = h.vault.verification_count();
            assert!(matches!(
                svc.login(username, "nope-nope-nope", None),
                Err(ServiceError::InvalidCredentials)
            ));
            assert_eq!(h.vault.verification_count(), before + 1, "{username}");
        }
    }

    #[test]
    fn failed_login_is_not_attributed_to_the_target() {
        let h = Harness::new();
        let alice = h.principal("alice", PrivilegeLevel::User);
        let _ = service(&h).login("alice", "nope-nope-nope", None);

        let entries = h.audit.entries(&AuditFilter::default()).unwrap();
        assert_eq!(entries[0].action, AuditAction::LoginFailed);
        assert!(entries[0].actor_id.is_none());
        assert_eq!(entries[0].resource_id, Some(alice.principal.id.as_uuid()));
    }

    #[test]
    fn login_is_rate_limited_per_username() {
        let h = Harness::new();
        h.principal("alice", PrivilegeLevel::User);
        let svc = service(&h);

        for _ in 0..5 {
            let _ = svc.login("alice", "wrong-password", None);
        }
        assert!(matches!(
            svc.login("alice", PASSWORD, None),
            Err(ServiceError::RateLimited { .. })
        ));
    }

    #[test]
    fn logout_is_audited() {
        let h = Harness::new();
        let alice = h.principal("alice", PrivilegeLevel::User);
        service(&h).logout(&alice);
        assert_eq!(last_action(&h), AuditAction::Logout);
    }

    #[test]
    fn change_password_requires_current() {
        let h = Harness::new();
        let alice = h.principal("alice", PrivilegeLevel::User);
        let svc = service(&h);

        assert!(matches!(
            svc.change_password(&alice, "wrong-current", "brand new pass"),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.change_password(&alice, PASSWORD, "short"),
            Err(ServiceError::Validation(_))
        ));

        svc.change_password(&alice, PASSWORD, "brand new pass").unwrap();
        assert_eq!(last_action(&h), AuditAction::PasswordChanged);
        assert!(svc.login("alice", "brand new pass", None).is_ok());
    }

    #[test]
    fn change_password_is_rate_limited_and_failures_audited() {
        let h = Harness::new();
        let alice = h.principal("alice", PrivilegeLevel::User);
        let svc = service(&h);

        for _ in 0..5 {
            assert!(matches!(
                svc.change_password(&alice, "wrong-current", "brand new pass"),
                Err(ServiceError::Forbidden(_))
            ));
        }
        assert!(matches!(
            svc.change_password(&alice, PASSWORD, "brand new pass"),
            Err(ServiceError::RateLimited { .. })
        ));

        let failed = h
            .audit
            .entries(&AuditFilter {
                action: Some(AuditAction::LoginFailed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(failed.len(), 5);
        assert!(failed.iter().all(|e| e.actor_id.is_none()));
    }

    #[test]
    fn privilege_changes_need_a_strictly_higher_actor() {
        let h = Harness::new();
        let root = h.principal("root", PrivilegeLevel::SuperAdmin);
        let admin = h.principal("admin", PrivilegeLevel::Admin);
        let other_admin = h.principal("other", PrivilegeLevel::Admin);
        let user = h.principal("user", PrivilegeLevel::User);
        let svc = service(&h);

        // Admins manage users but cannot mint admins or touch peers.
        assert!(svc
            .change_privilege(&admin, user.principal.id, PrivilegeLevel::Admin)
            .is_err());
        assert!(svc
            .change_privilege(&admin, other_admin.principal.id, PrivilegeLevel::User)
            .is_err());
        assert!(svc
            .change_privilege(&user, user.principal.id, PrivilegeLevel::Admin)
            .is_err());

        let promoted = svc
            .change_privilege(&root, user.principal.id, PrivilegeLevel::Admin)
            .unwrap();
        assert_eq!(promoted.level, PrivilegeLevel::Admin);
        assert_eq!(last_action(&h), AuditAction::Update);
        assert_eq!(
            h.store
                .get_principal(user.principal.id)
                .unwrap()
                .unwrap()
                .level,
            PrivilegeLevel::Admin
        );
    }

    #[test]
    fn create_principal_respects_hierarchy() {
        let h = Harness::new();
        let admin = h.principal("admin", PrivilegeLevel::Admin);
        let user = h.principal("user", PrivilegeLevel::User);
        let svc = service(&h);

        assert!(svc
            .create_principal(&user, "x", PASSWORD, PrivilegeLevel::User)
            .is_err());
        assert!(svc
            .create_principal(&admin, "peer", PASSWORD, PrivilegeLevel::Admin)
            .is_err());
        let bob = svc
            .create_principal(&admin, "bob", PASSWORD, PrivilegeLevel::User)
            .unwrap();
        assert_eq!(bob.level, PrivilegeLevel::User);
        assert!(matches!(
            svc.create_principal(&admin, "bob", PASSWORD, PrivilegeLevel::User),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn bootstrap_only_runs_on_empty_store() {
        let h = Harness::new();
        let svc = service(&h);
        let root = svc.bootstrap_admin("root", PASSWORD).unwrap().unwrap();
        assert_eq!(root.level, PrivilegeLevel::SuperAdmin);
        assert!(svc.bootstrap_admin("root2", PASSWORD).unwrap().is_none());
        assert_eq!(last_action(&h), AuditAction::Create);
    }

    #[test]
    fn retirement_scenario() {
        let h = Harness::new();
        let admin = h.principal("admin", PrivilegeLevel::Admin);
        let leaver = h.principal("leaver", PrivilegeLevel::User);
        let svc = service(&h);

        let record = SecretRecord::new(ResourceType::Credential, "db", leaver.principal.id);
        h.store.insert_record(&record).unwrap();
        svc.login("leaver", PASSWORD, None).unwrap();

        let summary = svc
            .retire_principal(&admin, leaver.principal.id, None)
            .unwrap();
        assert_eq!(summary.records_reassigned, 1);
        assert_eq!(summary.audit_entries_detached, 1);

        // Records moved to the actor, nothing orphaned.
        let record = h
            .store
            .get_record(ResourceType::Credential, record.id)
            .unwrap()
            .unwrap();
        assert_eq!(record.owner_id, admin.principal.id);

        // Actor reference nulled, entry kept.
        let logins = h
            .audit
            .entries(&AuditFilter {
                action: Some(AuditAction::Login),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(logins.len(), 1);
        assert!(logins[0].actor_id.is_none());

        // Deactivated: login fails, and the retirement itself is audited.
        let retired = h.store.get_principal(leaver.principal.id).unwrap().unwrap();
        assert!(!retired.active);
        assert!(matches!(
            svc.login("leaver", PASSWORD, None),
            Err(ServiceError::InvalidCredentials)
        ));
        let deletes = h
            .audit
            .entries(&AuditFilter {
                action: Some(AuditAction::Delete),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(deletes[0].actor_id, Some(admin.principal.id));

        // The heir now controls the record.
        let secrets = SecretService::new(
            h.store.clone(),
            h.resolver.clone(),
            h.limiter.clone(),
            h.cipher.clone(),
            h.audit.clone(),
        );
        let heir = crate::auth::AuthenticatedPrincipal::new(
            h.store.get_principal(admin.principal.id).unwrap().unwrap(),
            None,
        );
        assert!(h
            .resolver
            .check_permission(
                &heir.principal,
                Action::Delete,
                ResourceType::Credential,
                Some(record.id)
            )
            .unwrap());
        secrets.delete(&heir, ResourceType::Credential, record.id).unwrap();
    }

    #[test]
    fn retirement_guards() {
        let h = Harness::new();
        let root = h.principal("root", PrivilegeLevel::SuperAdmin);
        let admin = h.principal("admin", PrivilegeLevel::Admin);
        let user = h.principal("user", PrivilegeLevel::User);
        let svc = service(&h);

        assert!(matches!(
            svc.retire_principal(&user, admin.principal.id, None),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.retire_principal(&admin, admin.principal.id, None),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.retire_principal(&admin, root.principal.id, None),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.retire_principal(&admin, user.principal.id, Some(user.principal.id)),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.retire_principal(&admin, PrincipalId::generate(), None),
            Err(ServiceError::NotFound(_))
        ));

        svc.retire_principal(&root, admin.principal.id, Some(user.principal.id))
            .unwrap();
        assert!(matches!(
            svc.retire_principal(&root, admin.principal.id, None),
            Err(ServiceError::Conflict(_))
        ));
    }
}
