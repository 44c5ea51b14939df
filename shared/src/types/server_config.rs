use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::types::claims::PermissionLevel;

/// Environment variable that overrides `auth.signing_secret`.
pub const SIGNING_SECRET_ENV: &str = "AUTH_SIGNING_SECRET";

/// Upper bound for `auth.token_validity_minutes` (one week).
pub const MAX_TOKEN_VALIDITY_MINUTES: u64 = 7 * 24 * 60;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Exact paths served without going through the gate.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    /// Expose `POST /api/token`, which mints sessions for arbitrary subjects.
    /// Development only.
    #[serde(default)]
    pub enable_issue_endpoint: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC key used to sign and verify tokens.
    ///
    /// Prefer loading this via the `AUTH_SIGNING_SECRET` environment
    /// variable. Rotating it invalidates every live token at once.
    pub signing_secret: Option<String>,
    #[serde(default = "default_token_validity")]
    pub token_validity_minutes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// `memory` or a SQLite URL such as `sqlite://sessions.db`.
    #[serde(default = "default_store_address")]
    pub address: String,
    /// Table holding the session records.
    #[serde(default = "default_store_namespace")]
    pub namespace: String,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Path pattern -> required permission level.
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionLevel>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:7777"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl AuthConfig {
    pub fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity_minutes * 60)
    }

    /// Resolve the signing secret with `AUTH_SIGNING_SECRET` taking priority
    /// over the config file field.
    ///
    /// Returns `None` when neither source is set.
    pub fn resolved_signing_secret(&self) -> Option<String> {
        std::env::var(SIGNING_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.signing_secret.clone())
            .filter(|s| !s.is_empty())
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_memory(&self) -> bool {
        self.address.eq_ignore_ascii_case("memory")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: default_store_address(),
            namespace: default_store_namespace(),
            timeout_secs: default_store_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_port() -> u16 {
    7777
}

pub fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string()]
}

pub fn default_token_validity() -> u64 {
    15
}

pub fn default_store_address() -> String {
    "memory".to_string()
}

pub fn default_store_namespace() -> String {
    "sessions".to_string()
}

pub fn default_store_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1"

            [auth]
            signing_secret = "s"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.addr(), "127.0.0.1:7777");
        assert_eq!(cfg.server.public_paths, vec!["/health".to_string()]);
        assert!(!cfg.server.enable_issue_endpoint);
        assert_eq!(cfg.auth.token_validity(), Duration::from_secs(900));
        assert!(cfg.store.is_memory());
        assert_eq!(cfg.store.timeout(), Duration::from_secs(5));
        assert!(cfg.permissions.is_empty());
    }

    #[test]
    fn permissions_table_parses_quoted_patterns() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0"

            [auth]

            [permissions]
            "/protected" = 1
            "/api/test/:id" = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.permissions.get("/protected"), Some(&1));
        assert_eq!(cfg.permissions.get("/api/test/:id"), Some(&2));
    }
}
