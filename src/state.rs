// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::access::PermissionResolver;
use crate::auth::SessionKeys;
use crate::crypto::{EnvelopeCipher, PasswordVault};
use crate::ratelimit::RateLimiter;
use crate::services::{AccountService, GrantService, SecretRevealService, SecretService};
use crate::storage::{AuditLogger, VaultStore};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VaultStore>,
    pub sessions: SessionKeys,
    pub limiter: Arc<RateLimiter>,
    pub audit: AuditLogger,
    pub reveal: SecretRevealService,
    pub secrets: SecretService,
    pub accounts: AccountService,
    pub grants: GrantService,
}

impl AppState {
    pub fn new<S>(
        store: Arc<S>,
        cipher: EnvelopeCipher,
        vault: PasswordVault,
        sessions: SessionKeys,
    ) -> Self
    where
        S: VaultStore + 'static,
    {
        let store: Arc<dyn VaultStore> = store;
        let audit = AuditLogger::new(store.clone());
        let resolver = PermissionResolver::new(store.clone());
        let limiter = Arc::new(RateLimiter::new());
        let cipher = Arc::new(cipher);

        Self {
            reveal: SecretRevealService::new(
                store.clone(),
                resolver.clone(),
                limiter.clone(),
                cipher.clone(),
                audit.clone(),
            ),
            secrets: SecretService::new(
                store.clone(),
                resolver,
                limiter.clone(),
                cipher,
                audit.clone(),
            ),
            accounts: AccountService::new(
                store.clone(),
                vault,
                sessions.clone(),
                limiter.clone(),
                audit.clone(),
            ),
            grants: GrantService::new(store.clone(), audit.clone()),
            store,
            sessions,
            limiter,
            audit,
        }
    }
}
