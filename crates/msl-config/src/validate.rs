//! Configuration validation.
//!
//! Checks that a deserialized [`TrustConfig`](crate::TrustConfig) is within
//! acceptable ranges and that cross-field invariants hold.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::TrustConfig;

/// Largest value a non-replayable ID may take on the wire (2^53).
const MAX_NON_REPLAYABLE_FLOOR: u64 = 9_007_199_254_740_992;

/// Validate a configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &TrustConfig) -> ConfigResult<()> {
    validate_entity(config)?;
    validate_store(config)?;
    validate_schemes(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_entity(config: &TrustConfig) -> ConfigResult<()> {
    if config.entity_id.trim().is_empty() {
        return Err(invalid("entity_id", "entity_id must not be empty"));
    }
    Ok(())
}

fn validate_store(config: &TrustConfig) -> ConfigResult<()> {
    if let Some(path) = &config.store.path
        && path.trim().is_empty()
    {
        return Err(invalid(
            "store.path",
            "store.path must not be empty; omit it to keep the store in memory",
        ));
    }

    if config.store.non_replayable_floor > MAX_NON_REPLAYABLE_FLOOR {
        return Err(invalid(
            "store.non_replayable_floor",
            format!("non_replayable_floor must be at most {MAX_NON_REPLAYABLE_FLOOR}"),
        ));
    }
    Ok(())
}

fn validate_schemes(config: &TrustConfig) -> ConfigResult<()> {
    let s = &config.schemes;

    for (field, value) in [
        ("schemes.entity_auth", &s.entity_auth),
        ("schemes.user_auth", &s.user_auth),
        ("schemes.key_exchange_mechanism", &s.key_exchange_mechanism),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(invalid(field, "scheme name must not be blank"));
        }
    }

    let mut seen = HashSet::new();
    for scheme in &s.key_exchange {
        if scheme.trim().is_empty() {
            return Err(invalid(
                "schemes.key_exchange",
                "scheme name must not be blank",
            ));
        }
        if !seen.insert(scheme.as_str()) {
            return Err(invalid(
                "schemes.key_exchange",
                format!("'{scheme}' is listed more than once"),
            ));
        }
    }

    if s.key_exchange_mechanism.is_some() && s.key_exchange.is_empty() {
        return Err(invalid(
            "schemes.key_exchange_mechanism",
            "a key exchange mechanism needs at least one key exchange scheme",
        ));
    }
    Ok(())
}

fn validate_logging(config: &TrustConfig) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}
