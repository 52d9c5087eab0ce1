//! Config file loading.
//!
//! [`load`] runs the full sequence:
//! 1. Read and parse the TOML file (size-limited)
//! 2. Apply `MSL_*` environment overrides
//! 3. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::apply_env_overrides;
use crate::error::{ConfigError, ConfigResult};
use crate::types::TrustConfig;
use crate::validate;

/// Maximum config file size in bytes (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Parse a configuration from TOML text. `origin` names the source in errors.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the text is not a valid configuration.
pub fn from_toml_str(content: &str, origin: &str) -> ConfigResult<TrustConfig> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        origin: origin.to_owned(),
        source,
    })
}

/// Read and parse a config file without overrides or validation.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, exceeds the size
/// limit, or is malformed.
pub fn load_file(path: &Path) -> ConfigResult<TrustConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // Measured after reading so the check sees the bytes actually parsed.
    let size = content.len() as u64;
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    debug!(path = %path.display(), "read config file");
    from_toml_str(&content, &path.display().to_string())
}

/// Load, override and validate a config file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable or malformed, an
/// override is invalid, or the result fails validation.
pub fn load(path: &Path, env: &HashMap<String, String>) -> ConfigResult<TrustConfig> {
    let mut config = load_file(path)?;
    let applied = apply_env_overrides(&mut config, env)?;
    validate::validate(&config)?;
    info!(
        path = %path.display(),
        entity_id = %config.entity_id,
        overrides = applied.len(),
        "loaded trust config"
    );
    Ok(config)
}

/// Per-user directory for store snapshots (e.g. `~/.local/share/msl-trust`).
///
/// # Errors
///
/// Returns [`ConfigError::NoDataDir`] if no home directory can be determined.
pub fn default_store_dir() -> ConfigResult<PathBuf> {
    directories::ProjectDirs::from("", "", "msl-trust")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}
