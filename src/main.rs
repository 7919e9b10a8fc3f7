// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use credvault_server::{
    api::router,
    auth::SessionKeys,
    config::{AppConfig, LogFormat, LOG_FORMAT_ENV},
    crypto::{EnvelopeCipher, PasswordVault},
    ratelimit::RateLimitSweeper,
    state::AppState,
    storage::{InMemoryStore, StoragePaths, VaultDatabase},
};

fn init_tracing() {
    let format: LogFormat = std::env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

fn build_state(config: &AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let cipher = EnvelopeCipher::new(&config.encryption_key);
    let vault = PasswordVault::new(config.kdf)?;
    let sessions = SessionKeys::new(&config.jwt_secret, config.token_ttl);

    let state = match &config.data_dir {
        Some(dir) => {
            let paths = StoragePaths::new(dir);
            let db = VaultDatabase::open(&paths.database())?;
            info!(path = %paths.database().display(), "Opened vault database");
            AppState::new(Arc::new(db), cipher, vault, sessions)
        }
        None => {
            warn!("DATA_DIR not set; using an in-memory store. Data is lost on restart");
            AppState::new(Arc::new(InMemoryStore::new()), cipher, vault, sessions)
        }
    };

    if let Some(admin) = &config.bootstrap_admin {
        state
            .accounts
            .bootstrap_admin(&admin.username, &admin.password)?;
    }

    Ok(state)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let state = match build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize vault");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let sweeper =
        RateLimitSweeper::new(state.limiter.clone()).with_interval(config.sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let addr = config.bind_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %addr, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %addr, "Credential vault listening (docs at /docs)");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await;

    shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "Sweeper task ended abnormally");
    }

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
