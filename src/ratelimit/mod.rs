// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Rate Limiting
//!
//! Fixed-window request counters keyed by identifier and operation class.
//!
//! The first request for a key opens a window with `count = 1`; a request
//! succeeds while `count <= max_requests`. Once the window's reset time
//! passes, the next request opens a fresh window. Expired windows are also
//! evicted in bulk by [`RateLimitSweeper`].
//!
//! Counters are process-local and are not persisted.

pub mod sweeper;

pub use sweeper::RateLimitSweeper;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Limit applied to one operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    /// 5 attempts per 15 minutes.
    pub const LOGIN: Self = Self {
        max_requests: 5,
        window: Duration::from_secs(15 * 60),
    };

    /// 10 reveals per minute.
    pub const REVEAL: Self = Self {
        max_requests: 10,
        window: Duration::from_secs(60),
    };

    /// 30 creations per minute.
    pub const CREATE: Self = Self {
        max_requests: 30,
        window: Duration::from_secs(60),
    };
}

/// Operation classes with independent counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitClass {
    Login,
    Reveal,
    /// Counted apart from reveals, under the same limit.
    Copy,
    Create,
}

impl RateLimitClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RateLimitClass::Login => "login",
            RateLimitClass::Reveal => "reveal",
            RateLimitClass::Copy => "copy",
            RateLimitClass::Create => "create",
        }
    }

    pub fn config(self) -> RateLimitConfig {
        match self {
            RateLimitClass::Login => RateLimitConfig::LOGIN,
            RateLimitClass::Reveal | RateLimitClass::Copy => RateLimitConfig::REVEAL,
            RateLimitClass::Create => RateLimitConfig::CREATE,
        }
    }

    /// Counter key for `identifier` in this class.
    pub fn key(self, identifier: &str) -> String {
        format!("{identifier}:{}", self.as_str())
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub success: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until the window resets; set only when rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Process-local fixed-window rate limiter.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a window half-updated, so
    // the map is still usable after poisoning.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one request for `identifier` in `class`.
    pub fn check_class(&self, class: RateLimitClass, identifier: &str) -> RateLimitDecision {
        self.check(&class.key(identifier), &class.config())
    }

    /// Count one request against `key`.
    pub fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitDecision {
        self.check_at(key, config, Utc::now())
    }

    pub fn check_at(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let window_len = chrono::Duration::from_std(config.window)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));

        let mut windows = self.lock();
        let window = windows.entry(key.to_string()).or_insert(RateWindow {
            count: 0,
            reset_at: now + window_len,
        });
        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + window_len;
        }
        window.count = window.count.saturating_add(1);

        let success = window.count <= config.max_requests;
        let retry_after = (!success).then(|| {
            let millis = (window.reset_at - now).num_milliseconds().max(0) as u64;
            millis.div_ceil(1000).max(1)
        });

        RateLimitDecision {
            success,
            remaining: config.max_requests.saturating_sub(window.count),
            reset_at: window.reset_at,
            retry_after,
        }
    }

    /// Evict expired windows, returning how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, window| window.reset_at > now);
        before - windows.len()
    }

    /// Number of live windows.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fixed_window_scenario() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig::REVEAL;
        let start = Utc::now();

        for i in 0..10 {
            let decision = limiter.check_at("alice:reveal", &config, start);
            assert!(decision.success, "request {i} should pass");
            assert_eq!(decision.remaining, 9 - i);
            assert!(decision.retry_after.is_none());
        }

        let rejected = limiter.check_at("alice:reveal", &config, start);
        assert!(!rejected.success);
        assert_eq!(rejected.remaining, 0);
        assert!(rejected.retry_after.unwrap() > 0);
        assert_eq!(rejected.retry_after, Some(60));

        let later = start + chrono::Duration::seconds(30);
        let still = limiter.check_at("alice:reveal", &config, later);
        assert_eq!(still.retry_after, Some(30));

        let after = start + chrono::Duration::seconds(60);
        let fresh = limiter.check_at("alice:reveal", &config, after);
        assert!(fresh.success);
        assert_eq!(fresh.remaining, 9);
    }

    #[test]
    fn classes_are_counted_independently() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            assert!(limiter.check_class(RateLimitClass::Reveal, "bob").success);
        }
        assert!(!limiter.check_class(RateLimitClass::Reveal, "bob").success);
        assert!(limiter.check_class(RateLimitClass::Copy, "bob").success);
        assert!(limiter.check_class(RateLimitClass::Create, "bob").success);
        assert!(limiter.check_class(RateLimitClass::Reveal, "carol").success);
    }

    #[test]
    fn sweep_removes_only_expired_windows() {
        let limiter = RateLimiter::new();
        let now = Utc::now();
        limiter.check_at("short", &RateLimitConfig::REVEAL, now);
        limiter.check_at("long", &RateLimitConfig::LOGIN, now);
        assert_eq!(limiter.len(), 2);

        let removed = limiter.sweep_at(now + chrono::Duration::seconds(61));
        assert_eq!(removed, 1);
        assert_eq!(limiter.len(), 1);

        assert_eq!(limiter.sweep_at(now + chrono::Duration::minutes(16)), 1);
        assert!(limiter.is_empty());
    }

    #[test]
    fn concurrent_checks_never_overshoot() {
        let limiter = Arc::new(RateLimiter::new());
        let config = RateLimitConfig {
            max_requests: 50,
            window: Duration::from_secs(60),
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|_| limiter.check("shared", &config).success)
                        .count()
                })
            })
            .collect();

        let passed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(passed, 50);
    }

    #[test]
    fn decision_serializes_camel_case() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(10),
        };
        limiter.check("k", &config);
        let json = serde_json::to_value(limiter.check("k", &config)).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["retryAfter"].as_u64().unwrap() > 0);
    }
}
