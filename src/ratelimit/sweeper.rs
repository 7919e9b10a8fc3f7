// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Background eviction of expired rate-limit windows.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; the server cancels it when it
//! begins graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RateLimiter;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically removes expired windows from a [`RateLimiter`].
pub struct RateLimitSweeper {
    limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl RateLimitSweeper {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Rate limit sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Rate limit sweeper shutting down");
                    return;
                }
            }

            let removed = self.limiter.sweep();
            if removed > 0 {
                debug!(
                    removed,
                    remaining = self.limiter.len(),
                    "Rate limit sweep"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::RateLimitConfig;

    #[tokio::test]
    async fn stops_when_cancelled() {
        let sweeper = RateLimitSweeper::new(Arc::new(RateLimiter::new()));
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), sweeper.run(shutdown))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn evicts_expired_windows() {
        let limiter = Arc::new(RateLimiter::new());
        let config = RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(10),
        };
        limiter.check("ephemeral", &config);
        assert_eq!(limiter.len(), 1);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            RateLimitSweeper::new(limiter.clone())
                .with_interval(Duration::from_millis(20))
                .run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(limiter.is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
