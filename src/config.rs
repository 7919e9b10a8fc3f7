// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup. A missing or
//! malformed key or secret is fatal.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory for the vault database | unset (in-memory) |
//! | `VAULT_ENCRYPTION_KEY` | Base64 of the 32-byte system key | Required |
//! | `AUTH_JWT_SECRET` | HS256 session secret (at least 32 bytes) | Required |
//! | `AUTH_TOKEN_TTL_SECS` | Session lifetime | `3600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=info` |
//! | `RATE_LIMIT_SWEEP_SECS` | Expired window eviction cadence | `60` |
//! | `ARGON2_MEMORY_KIB` | Argon2id memory cost | `19456` |
//! | `ARGON2_TIME_COST` | Argon2id iterations | `2` |
//! | `ARGON2_PARALLELISM` | Argon2id lanes | `1` |
//! | `BOOTSTRAP_ADMIN_USERNAME` | First SUPER_ADMIN, created on an empty store | unset |
//! | `BOOTSTRAP_ADMIN_PASSWORD` | Its password | unset |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use zeroize::Zeroizing;

use crate::crypto::{KdfParams, KEY_SIZE};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const ENCRYPTION_KEY_ENV: &str = "VAULT_ENCRYPTION_KEY";
pub const JWT_SECRET_ENV: &str = "AUTH_JWT_SECRET";
pub const TOKEN_TTL_ENV: &str = "AUTH_TOKEN_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const SWEEP_INTERVAL_ENV: &str = "RATE_LIMIT_SWEEP_SECS";
pub const ARGON2_MEMORY_ENV: &str = "ARGON2_MEMORY_KIB";
pub const ARGON2_TIME_ENV: &str = "ARGON2_TIME_COST";
pub const ARGON2_PARALLELISM_ENV: &str = "ARGON2_PARALLELISM";
pub const BOOTSTRAP_USERNAME_ENV: &str = "BOOTSTRAP_ADMIN_USERNAME";
pub const BOOTSTRAP_PASSWORD_ENV: &str = "BOOTSTRAP_ADMIN_PASSWORD";

/// Shortest accepted session secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("expected 'json' or 'pretty', got '{other}'")),
        }
    }
}

/// Credentials for the first administrator.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Validated runtime configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub encryption_key: Zeroizing<[u8; KEY_SIZE]>,
    pub jwt_secret: Zeroizing<Vec<u8>>,
    pub token_ttl: Duration,
    pub log_format: LogFormat,
    pub sweep_interval: Duration,
    pub kdf: KdfParams,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let encoded_key = get(ENCRYPTION_KEY_ENV).ok_or(ConfigError::Missing(ENCRYPTION_KEY_ENV))?;
        let key_bytes = Zeroizing::new(
            Base64::decode_vec(encoded_key.trim())
                .map_err(|e| ConfigError::invalid(ENCRYPTION_KEY_ENV, e.to_string()))?,
        );
        let encryption_key: [u8; KEY_SIZE] = key_bytes.as_slice().try_into().map_err(|_| {
            ConfigError::invalid(
                ENCRYPTION_KEY_ENV,
                format!("expected {KEY_SIZE} bytes, got {}", key_bytes.len()),
            )
        })?;

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::invalid(
                JWT_SECRET_ENV,
                format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            ));
        }

        let defaults = KdfParams::RECOMMENDED;
        let kdf = KdfParams {
            memory_kib: parse_or(&get, ARGON2_MEMORY_ENV, defaults.memory_kib)?,
            time_cost: parse_or(&get, ARGON2_TIME_ENV, defaults.time_cost)?,
            parallelism: parse_or(&get, ARGON2_PARALLELISM_ENV, defaults.parallelism)?,
            output_len: defaults.output_len,
        };

        let bootstrap_admin = match (get(BOOTSTRAP_USERNAME_ENV), get(BOOTSTRAP_PASSWORD_ENV)) {
            (Some(username), Some(password)) => Some(BootstrapAdmin {
                username,
                password: Zeroizing::new(password),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(BOOTSTRAP_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(BOOTSTRAP_USERNAME_ENV)),
        };

        let sweep_secs: u64 = parse_or(&get, SWEEP_INTERVAL_ENV, 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::invalid(SWEEP_INTERVAL_ENV, "must be at least 1 second"));
        }

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, PORT_ENV, 8080)?,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            encryption_key: Zeroizing::new(encryption_key),
            jwt_secret: Zeroizing::new(jwt_secret.into_bytes()),
            token_ttl: Duration::from_secs(parse_or(&get, TOKEN_TTL_ENV, 3600)?),
            log_format: parse_or(&get, LOG_FORMAT_ENV, LogFormat::default())?,
            sweep_interval: Duration::from_secs(sweep_secs),
            kdf,
            bootstrap_admin,
        })
    }

    /// `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("token_ttl", &self.token_ttl)
            .field("log_format", &self.log_format)
            .field("sweep_interval", &self.sweep_interval)
            .field("kdf", &self.kdf)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish_non_exhaustive()
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn key_b64() -> String {
        Base64::encode_string(&[7u8; KEY_SIZE])
    }

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply() {
        let key = key_b64();
        let config = load(&[(ENCRYPTION_KEY_ENV, &key), (JWT_SECRET_ENV, SECRET)]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.data_dir.is_none());
        assert_eq!(*config.encryption_key, [7u8; KEY_SIZE]);
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.kdf, KdfParams::RECOMMENDED);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let key = key_b64();
        let config = load(&[
            (ENCRYPTION_KEY_ENV, &key),
            (JWT_SECRET_ENV, SECRET),
            (PORT_ENV, "9443"),
            (DATA_DIR_ENV, "/var/lib/vault"),
            (LOG_FORMAT_ENV, "JSON"),
            (ARGON2_MEMORY_ENV, "65536"),
            (BOOTSTRAP_USERNAME_ENV, "root"),
            (BOOTSTRAP_PASSWORD_ENV, "change-me-now"),
        ])
        .unwrap();

        assert_eq!(config.port, 9443);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/vault")));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.kdf.memory_kib, 65536);
        assert_eq!(config.bootstrap_admin.unwrap().username, "root");
    }

    #[test]
    fn missing_secrets_are_fatal() {
        let key = key_b64();
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET)]),
            Err(ConfigError::Missing(ENCRYPTION_KEY_ENV))
        ));
        assert!(matches!(
            load(&[(ENCRYPTION_KEY_ENV, &key)]),
            Err(ConfigError::Missing(JWT_SECRET_ENV))
        ));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let key = key_b64();
        let short_key = Base64::encode_string(&[1u8; 16]);

        assert!(load(&[(ENCRYPTION_KEY_ENV, "not base64!"), (JWT_SECRET_ENV, SECRET)]).is_err());
        assert!(load(&[(ENCRYPTION_KEY_ENV, &short_key), (JWT_SECRET_ENV, SECRET)]).is_err());
        assert!(load(&[(ENCRYPTION_KEY_ENV, &key), (JWT_SECRET_ENV, "short")]).is_err());
        assert!(load(&[
            (ENCRYPTION_KEY_ENV, &key),
            (JWT_SECRET_ENV, SECRET),
            (PORT_ENV, "eighty")
        ])
        .is_err());
        assert!(load(&[
            (ENCRYPTION_KEY_ENV, &key),
            (JWT_SECRET_ENV, SECRET),
            (BOOTSTRAP_USERNAME_ENV, "root")
        ])
        .is_err());
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let key = key_b64();
        let result = load(&[
            (ENCRYPTION_KEY_ENV, &key),
            (JWT_SECRET_ENV, SECRET),
            (SWEEP_INTERVAL_ENV, "0"),
        ]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { var: SWEEP_INTERVAL_ENV, .. })
        ));
    }

    #[test]
    fn debug_hides_secrets() {
        let key = key_b64();
        let config = load(&[(ENCRYPTION_KEY_ENV, &key), (JWT_SECRET_ENV, SECRET)]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(SECRET));
        assert!(!rendered.contains("encryption_key"));
    }
}
