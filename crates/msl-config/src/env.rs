//! Environment variable overrides.
//!
//! Unlike file values, a set variable always wins. This lets a deployment
//! reuse one config file for several entities.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::TrustConfig;

/// Overrides `entity_id`.
pub const ENV_ENTITY_ID: &str = "MSL_ENTITY_ID";

/// Overrides `store.path`.
pub const ENV_STORE_PATH: &str = "MSL_STORE_PATH";

/// Apply `MSL_*` overrides from `env` to `config`.
///
/// Returns the names of the variables that were applied.
///
/// # Errors
///
/// Returns [`ConfigError::EmptyEnvVar`] if an override variable is set but empty.
pub fn apply_env_overrides(
    config: &mut TrustConfig,
    env: &HashMap<String, String>,
) -> ConfigResult<Vec<&'static str>> {
    let mut applied = Vec::new();

    if let Some(value) = non_empty(env, ENV_ENTITY_ID)? {
        config.entity_id = value.to_owned();
        applied.push(ENV_ENTITY_ID);
    }
    if let Some(value) = non_empty(env, ENV_STORE_PATH)? {
        config.store.path = Some(value.to_owned());
        applied.push(ENV_STORE_PATH);
    }

    for var in &applied {
        debug!(var = %var, "applied env override");
    }
    Ok(applied)
}

fn non_empty<'a>(
    env: &'a HashMap<String, String>,
    var: &'static str,
) -> ConfigResult<Option<&'a str>> {
    match env.get(var) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyEnvVar { var }),
        Some(value) => Ok(Some(value.as_str())),
        None => Ok(None),
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
