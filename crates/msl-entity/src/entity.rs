//! The per-entity trust context.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use msl_config::{SchemesSection, TrustConfig};
use msl_core::{MslError, MslResult};
use msl_crypto::SharedCryptoContext;
use msl_schemes::{
    EntityAuthData, EntityAuthFactory, KeyExchangeFactory, SchemeContext, SchemeParameters,
    SchemePreferences, SchemeResolver, UserAuthFactory,
};
use msl_store::{
    FileSnapshotBackend, LoggingTrustStore, SimpleTrustStore, StoreOptions, TrustStore,
    load_store, save_store,
};
use msl_telemetry::{LogConfig, TelemetryResult};
use msl_tokens::MasterToken;
use tracing::{debug, info};

/// Scheme preferences named by a `[schemes]` section.
#[must_use]
pub fn preferences_from(section: &SchemesSection) -> SchemePreferences {
    SchemePreferences {
        entity_auth: section.entity_auth.clone(),
        user_auth: section.user_auth.clone(),
        key_exchange: section.key_exchange.clone(),
        key_exchange_mechanism: section.key_exchange_mechanism.clone(),
    }
}

/// Trust state of one local entity: its configuration, its trust store and
/// the scheme resolver that reads and writes it.
///
/// Constructed explicitly and passed to whatever needs it; there is no
/// process-global instance.
pub struct EntityTrust {
    config: TrustConfig,
    store_path: Option<PathBuf>,
    store: Arc<dyn TrustStore>,
    resolver: SchemeResolver,
    context: SchemeContext,
    entity_auth_cache: Mutex<HashMap<String, EntityAuthData>>,
}

impl EntityTrust {
    /// Start building an entity from `config`.
    #[must_use]
    pub fn builder(config: TrustConfig) -> EntityTrustBuilder {
        EntityTrustBuilder::new(config)
    }

    /// Open an entity with only the built-in schemes registered.
    ///
    /// # Errors
    ///
    /// See [`EntityTrustBuilder::open`].
    pub fn open(config: TrustConfig) -> MslResult<Self> {
        Self::builder(config).open()
    }

    /// The local entity identity.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.config.entity_id
    }

    /// The configuration the entity was opened with.
    #[must_use]
    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Where the store is persisted, if anywhere.
    #[must_use]
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// The trust store. Every call is logged.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TrustStore> {
        &self.store
    }

    /// The scheme resolver.
    #[must_use]
    pub fn resolver(&self) -> &SchemeResolver {
        &self.resolver
    }

    /// The context handed to scheme factories.
    #[must_use]
    pub fn context(&self) -> &SchemeContext {
        &self.context
    }

    /// Logging configuration from the `[logging]` section.
    ///
    /// # Errors
    ///
    /// Returns a telemetry error if the section names an unknown format.
    pub fn log_config(&self) -> TelemetryResult<LogConfig> {
        LogConfig::try_from(&self.config.logging)
    }

    /// Entity authentication data for the configured scheme.
    ///
    /// Data is produced once per scheme and reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no scheme is configured, or the
    /// factory's error.
    pub fn entity_auth_data(&self, params: &SchemeParameters) -> MslResult<EntityAuthData> {
        let scheme = self.resolver.entity_auth_scheme()?;
        if let Some(cached) = self.lock_cache()?.get(scheme) {
            return Ok(cached.clone());
        }

        // Produced outside the lock; the first value stored wins.
        let data = self.resolver.entity_auth_data(&self.context, params)?;
        debug!(scheme = %scheme, "Cached entity authentication data");
        Ok(self
            .lock_cache()?
            .entry(scheme.to_string())
            .or_insert(data)
            .clone())
    }

    /// Add a master token issued by key exchange together with the crypto
    /// context derived for it.
    ///
    /// A renewed token replaces its predecessor and takes over its context
    /// slot; the non-replayable counter for the serial number carries on.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the token is stale or collides.
    pub fn install_master_token(
        &self,
        master_token: MasterToken,
        crypto_context: SharedCryptoContext,
    ) -> MslResult<()> {
        self.store.add_master_token(master_token.clone())?;
        self.store.set_crypto_context(&master_token, crypto_context)
    }

    /// Persist the store to the configured path.
    ///
    /// Does nothing when the store is not persistent.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Persistence`] if the snapshot cannot be written.
    pub fn save_store(&self) -> MslResult<()> {
        let Some(path) = &self.store_path else {
            info!(entity_id = %self.entity_id(), "Trust store is not persistent; not saving");
            return Ok(());
        };
        save_store(self.store.as_ref(), &FileSnapshotBackend::new(path))?;
        info!(entity_id = %self.entity_id(), path = %path.display(), "Trust store updated");
        Ok(())
    }

    fn lock_cache(&self) -> MslResult<MutexGuard<'_, HashMap<String, EntityAuthData>>> {
        self.entity_auth_cache
            .lock()
            .map_err(|e| MslError::Internal(format!("entity auth cache lock poisoned: {e}")))
    }
}

impl fmt::Debug for EntityTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTrust")
            .field("entity_id", &self.config.entity_id)
            .field("store_path", &self.store_path)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// Builder for [`EntityTrust`]: register scheme factories, then open.
pub struct EntityTrustBuilder {
    config: TrustConfig,
    entity_auth: Vec<Arc<dyn EntityAuthFactory>>,
    user_auth: Vec<Arc<dyn UserAuthFactory>>,
    key_exchange: Vec<Arc<dyn KeyExchangeFactory>>,
}

impl EntityTrustBuilder {
    /// Start from `config`.
    #[must_use]
    pub fn new(config: TrustConfig) -> Self {
        Self {
            config,
            entity_auth: Vec::new(),
            user_auth: Vec::new(),
            key_exchange: Vec::new(),
        }
    }

    /// Register an entity authentication factory.
    #[must_use]
    pub fn entity_auth(mut self, factory: Arc<dyn EntityAuthFactory>) -> Self {
        self.entity_auth.push(factory);
        self
    }

    /// Register a user authentication factory.
    #[must_use]
    pub fn user_auth(mut self, factory: Arc<dyn UserAuthFactory>) -> Self {
        self.user_auth.push(factory);
        self
    }

    /// Register a key exchange factory.
    #[must_use]
    pub fn key_exchange(mut self, factory: Arc<dyn KeyExchangeFactory>) -> Self {
        self.key_exchange.push(factory);
        self
    }

    /// Validate the configuration, build the resolver and open the store.
    ///
    /// The store is loaded from the configured path when it names a file,
    /// starts empty when the path does not exist yet, and is memory-only when
    /// no path is configured.
    ///
    /// # Errors
    ///
    /// - [`MslError::Configuration`] if the configuration is invalid, a
    ///   factory is registered twice, or the store path is not a regular file
    /// - [`MslError::SchemeNotSupported`] if a configured scheme has no factory
    /// - [`MslError::Persistence`] or [`MslError::SnapshotVersion`] if the
    ///   saved store cannot be read
    pub fn open(self) -> MslResult<EntityTrust> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| MslError::Configuration(e.to_string()))?;

        let mut resolver = SchemeResolver::with_builtin(preferences_from(&config.schemes))?;
        for factory in self.entity_auth {
            resolver.register_entity_auth(factory)?;
        }
        for factory in self.user_auth {
            resolver.register_user_auth(factory)?;
        }
        for factory in self.key_exchange {
            resolver.register_key_exchange(factory)?;
        }
        resolver.validate()?;

        let options = StoreOptions {
            non_replayable_floor: config.store.non_replayable_floor,
        };
        let store_path = config.store_path();
        let simple = open_store(store_path.as_deref(), options)?;
        let store: Arc<dyn TrustStore> = Arc::new(LoggingTrustStore::new(simple));
        let context = SchemeContext::new(config.entity_id.clone(), Arc::clone(&store));

        info!(
            entity_id = %config.entity_id,
            persistent = store_path.is_some(),
            "Opened entity trust"
        );
        Ok(EntityTrust {
            config,
            store_path,
            store,
            resolver,
            context,
            entity_auth_cache: Mutex::new(HashMap::new()),
        })
    }
}

impl fmt::Debug for EntityTrustBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTrustBuilder")
            .field("entity_id", &self.config.entity_id)
            .field("entity_auth", &self.entity_auth.len())
            .field("user_auth", &self.user_auth.len())
            .field("key_exchange", &self.key_exchange.len())
            .finish()
    }
}

fn open_store(path: Option<&Path>, options: StoreOptions) -> MslResult<SimpleTrustStore> {
    let Some(path) = path else {
        debug!("No store path configured; trust store is memory-only");
        return SimpleTrustStore::with_options(options);
    };

    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            let store = load_store(&FileSnapshotBackend::new(path), options)?;
            info!(path = %path.display(), "Loaded trust store");
            Ok(store)
        },
        Ok(_) => Err(MslError::Configuration(format!(
            "store path {} exists but is not a regular file",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No saved trust store; starting empty");
            SimpleTrustStore::with_options(options)
        },
        Err(e) => Err(MslError::Persistence(format!(
            "cannot stat {}: {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msl_config::StoreSection;
    use msl_core::ErrorKind;
    use msl_test::{MockEntityAuthFactory, RecordingCryptoContext, master_token, user_id_token};

    fn config(path: Option<&Path>) -> TrustConfig {
        TrustConfig {
            entity_id: "client-1".to_owned(),
            store: StoreSection {
                path: path.map(|p| p.display().to_string()),
                non_replayable_floor: 0,
            },
            ..TrustConfig::default()
        }
    }

    #[test]
    fn test_memory_only_store() {
        let entity = EntityTrust::open(config(None)).unwrap();
        assert!(entity.store_path().is_none());
        assert!(entity.save_store().is_ok());
        assert_eq!(entity.entity_id(), "client-1");
    }

    #[test]
    fn test_absent_path_starts_empty_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("{eid}.store");
        let cfg = config(Some(&path));

        let entity = EntityTrust::open(cfg.clone()).unwrap();
        assert!(entity.store().get_master_token().unwrap().is_none());

        let mt = master_token(1, 1);
        let (ctx, _) = RecordingCryptoContext::shared("session");
        entity.install_master_token(mt.clone(), ctx).unwrap();
        entity
            .store()
            .add_user_id_token("alice", user_id_token(&mt, 2, "alice"))
            .unwrap();
        assert_eq!(entity.store().non_replayable_id(&mt).unwrap(), 0);
        entity.save_store().unwrap();
        assert!(dir.path().join("client-1.store").is_file());

        let reopened = EntityTrust::open(cfg).unwrap();
        assert_eq!(reopened.store().get_master_token().unwrap(), Some(mt.clone()));
        assert!(reopened.store().get_user_id_token("alice").unwrap().is_some());
        // Crypto contexts are never persisted.
        assert!(reopened.store().get_crypto_context(&mt).unwrap().is_none());
        assert_eq!(reopened.store().non_replayable_id(&mt).unwrap(), 1);
    }

    #[test]
    fn test_directory_path_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EntityTrust::open(config(Some(dir.path()))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = EntityTrust::open(TrustConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_unregistered_scheme_rejected() {
        let mut cfg = config(None);
        cfg.schemes.key_exchange = vec!["JWK_LADDER".to_owned()];
        let err = EntityTrust::open(cfg).unwrap_err();
        assert!(matches!(err, MslError::SchemeNotSupported { .. }));
    }

    #[test]
    fn test_entity_auth_data_cached_per_scheme() {
        let mut cfg = config(None);
        cfg.schemes.entity_auth = Some("PSK".to_owned());
        let factory = Arc::new(MockEntityAuthFactory::new("PSK"));
        let entity = EntityTrust::builder(cfg)
            .entity_auth(factory.clone())
            .open()
            .unwrap();

        let first = entity.entity_auth_data(&SchemeParameters::new()).unwrap();
        let second = entity.entity_auth_data(&SchemeParameters::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.identity, "client-1");
        assert_eq!(factory.log().count("PSK:auth_data"), 1);
    }

    #[test]
    fn test_log_config_from_section() {
        let mut cfg = config(None);
        cfg.logging.format = "json".to_owned();
        let entity = EntityTrust::open(cfg).unwrap();
        assert_eq!(
            entity.log_config().unwrap().format,
            msl_telemetry::LogFormat::Json
        );
    }

    #[test]
    fn test_preferences_from_section() {
        let section = SchemesSection {
            entity_auth: Some("RSA".to_owned()),
            user_auth: None,
            key_exchange: vec!["A".to_owned(), "B".to_owned()],
            key_exchange_mechanism: Some("JWE_RSA".to_owned()),
        };
        let prefs = preferences_from(&section);
        assert_eq!(prefs.entity_auth.as_deref(), Some("RSA"));
        assert_eq!(prefs.key_exchange, vec!["A", "B"]);
    }
}
