use std::fs;
use tracing::{debug, error, info, warn};

use crate::types::server_config::{
    AppConfig, ConfigError, MAX_TOKEN_VALIDITY_MINUTES, SIGNING_SECRET_ENV,
};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");

    validate_config(&config)?;

    info!(
        "Config validated: {} permission rule(s), store '{}'",
        config.permissions.len(),
        config.store.address
    );

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.bind.is_empty() {
        return Err(ConfigError::InvalidConfig("bind cannot be empty".into()));
    }

    if config.auth.token_validity_minutes == 0 {
        return Err(ConfigError::InvalidConfig(
            "token_validity_minutes must be greater than 0".into(),
        ));
    }

    if config.auth.token_validity_minutes > MAX_TOKEN_VALIDITY_MINUTES {
        return Err(ConfigError::InvalidConfig(format!(
            "token_validity_minutes must not exceed {}",
            MAX_TOKEN_VALIDITY_MINUTES
        )));
    }

    if config.store.timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "store.timeout_secs must be greater than 0".into(),
        ));
    }

    if !is_identifier(&config.store.namespace) {
        return Err(ConfigError::InvalidConfig(format!(
            "store.namespace '{}' must be non-empty and contain only ASCII letters, digits and '_'",
            config.store.namespace
        )));
    }

    // Checked here so a bad secret stops start-up instead of surfacing on the
    // first login.
    match config.auth.resolved_signing_secret() {
        None => {
            return Err(ConfigError::InvalidConfig(format!(
                "signing_secret must be set via the {} env var or auth.signing_secret config field",
                SIGNING_SECRET_ENV
            )));
        }
        Some(secret) if secret.len() < 32 => {
            warn!("signing secret is shorter than 32 bytes");
        }
        _ => {}
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
