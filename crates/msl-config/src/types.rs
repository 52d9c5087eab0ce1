//! Configuration types for one MSL entity.
//!
//! These types have no dependencies on other internal msl crates. Scheme names
//! are plain strings here and are resolved against registries by the entity
//! context. Every section implements [`Default`], so a bare `[section]` header
//! produces a working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Placeholder in `store.path` replaced by the entity ID.
pub const ENTITY_ID_PLACEHOLDER: &str = "{eid}";

// ---------------------------------------------------------------------------
// Top-level TrustConfig
// ---------------------------------------------------------------------------

/// Root configuration for one local entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Identity of the local entity.
    pub entity_id: String,
    /// Trust store persistence.
    pub store: StoreSection,
    /// Scheme selection and preference.
    pub schemes: SchemesSection,
    /// Logging level and format.
    pub logging: LoggingSection,
}

impl TrustConfig {
    /// The store snapshot path with the entity ID substituted, or `None` if
    /// the store is not persisted.
    #[must_use]
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store
            .path
            .as_deref()
            .map(|path| PathBuf::from(path.replace(ENTITY_ID_PLACEHOLDER, &self.entity_id)))
    }
}

// ---------------------------------------------------------------------------
// StoreSection
// ---------------------------------------------------------------------------

/// Trust store persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Snapshot file. `{eid}` is replaced by the entity ID. `None` keeps the
    /// store in memory only.
    pub path: Option<String>,
    /// First non-replayable ID issued for a master token serial number with
    /// no persisted counter.
    pub non_replayable_floor: u64,
}

// ---------------------------------------------------------------------------
// SchemesSection
// ---------------------------------------------------------------------------

/// Scheme selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemesSection {
    /// Entity authentication scheme used to identify this entity.
    pub entity_auth: Option<String>,
    /// User authentication scheme used for local users.
    pub user_auth: Option<String>,
    /// Key exchange schemes, most preferred first.
    pub key_exchange: Vec<String>,
    /// Mechanism for the preferred key exchange scheme (e.g. `"JWE_RSA"`).
    pub key_exchange_mechanism: Option<String>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["msl_store=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_substitutes_entity_id() {
        let config = TrustConfig {
            entity_id: "client-1".to_owned(),
            store: StoreSection {
                path: Some("/var/lib/msl/{eid}.store".to_owned()),
                ..StoreSection::default()
            },
            ..TrustConfig::default()
        };
        assert_eq!(
            config.store_path(),
            Some(PathBuf::from("/var/lib/msl/client-1.store"))
        );
    }

    #[test]
    fn test_no_store_path() {
        assert!(TrustConfig::default().store_path().is_none());
    }

    #[test]
    fn test_bare_sections_use_defaults() {
        let config: TrustConfig = toml::from_str("entity_id = \"e\"\n[logging]\n[store]\n").unwrap();
        assert_eq!(config.logging, LoggingSection::default());
        assert_eq!(config.store.non_replayable_floor, 0);
    }
}
