#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for one MSL trust-management entity.
//!
//! A single TOML document names the local entity, where its trust store is
//! persisted, which schemes it uses and how it logs:
//!
//! ```toml
//! entity_id = "client-1"
//!
//! [store]
//! path = "/var/lib/msl/{eid}.store"
//!
//! [schemes]
//! entity_auth = "PSK"
//! key_exchange = ["JWK_LADDER", "ASYMMETRIC_WRAPPED"]
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use msl_config::TrustConfig;
//!
//! let config = TrustConfig::load(std::path::Path::new("msl.toml")).unwrap();
//! println!("Entity: {}", config.entity_id);
//! ```
//!
//! # Design
//!
//! This crate has **no dependencies on other internal msl crates**. Scheme
//! names stay strings here; the entity context resolves them against the
//! scheme registries.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::default_store_dir;
pub use types::*;

impl TrustConfig {
    /// Load a config file, apply `MSL_*` environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load(path, &env::collect_env_vars())
    }

    /// Read a config file without overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable, too large or
    /// malformed.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Parse a configuration from TOML text without validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is malformed.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content, "<string>")
    }

    /// Validate this configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }

    /// Replace file values with `MSL_*` environment variables that are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyEnvVar`] if an override is set but empty.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<Vec<&'static str>> {
        env::apply_env_overrides(self, &env::collect_env_vars())
    }
}
