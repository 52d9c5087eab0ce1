//! Scheme resolution.
//!
//! The resolver owns one registry per scheme family and the configured
//! preferences. It routes each request to the matching factory and holds no
//! other state.

use std::fmt;
use std::sync::Arc;

use msl_core::{MslError, MslResult, SchemeFamily};
use msl_crypto::SharedCryptoContext;
use msl_tokens::MasterToken;
use tracing::{debug, warn};

use crate::builtin::{UnauthenticatedFactory, UserIdTokenAuthFactory};
use crate::data::{
    EntityAuthData, KeyRequestData, KeyResponseData, SchemeParameters, UserAuthData,
};
use crate::factory::{
    EntityAuthFactory, KeyExchangeFactory, SchemeContext, SchemeFactory, UserAuthFactory,
};
use crate::names;
use crate::registry::{EntityAuthRegistry, KeyExchangeRegistry, UserAuthRegistry};
use crate::user_id_token_auth::UserIdTokenAuthData;

/// Which schemes the local entity uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemePreferences {
    /// Entity authentication scheme used to identify ourselves.
    pub entity_auth: Option<String>,
    /// User authentication scheme used for local users.
    pub user_auth: Option<String>,
    /// Key exchange schemes, most preferred first.
    pub key_exchange: Vec<String>,
    /// Mechanism passed to the preferred key exchange scheme.
    pub key_exchange_mechanism: Option<String>,
}

/// Routes scheme operations to registered factories.
pub struct SchemeResolver {
    entity_auth: EntityAuthRegistry,
    user_auth: UserAuthRegistry,
    key_exchange: KeyExchangeRegistry,
    preferences: SchemePreferences,
}

impl SchemeResolver {
    /// A resolver with empty registries.
    #[must_use]
    pub fn new(preferences: SchemePreferences) -> Self {
        Self {
            entity_auth: EntityAuthRegistry::new(SchemeFamily::EntityAuthentication),
            user_auth: UserAuthRegistry::new(SchemeFamily::UserAuthentication),
            key_exchange: KeyExchangeRegistry::new(SchemeFamily::KeyExchange),
            preferences,
        }
    }

    /// A resolver with the built-in `NONE` and `USER_ID_TOKEN` schemes registered.
    ///
    /// # Errors
    ///
    /// Never fails in practice; registration into fresh registries cannot
    /// collide.
    pub fn with_builtin(preferences: SchemePreferences) -> MslResult<Self> {
        let mut resolver = Self::new(preferences);
        resolver.register_entity_auth(Arc::new(UnauthenticatedFactory))?;
        resolver.register_user_auth(Arc::new(UserIdTokenAuthFactory))?;
        Ok(resolver)
    }

    /// Register an entity authentication factory.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Configuration`] if the scheme is already registered.
    pub fn register_entity_auth(&mut self, factory: Arc<dyn EntityAuthFactory>) -> MslResult<()> {
        self.entity_auth.register(factory)
    }

    /// Register a user authentication factory.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Configuration`] if the scheme is already registered.
    pub fn register_user_auth(&mut self, factory: Arc<dyn UserAuthFactory>) -> MslResult<()> {
        self.user_auth.register(factory)
    }

    /// Register a key exchange factory.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Configuration`] if the scheme is already registered.
    pub fn register_key_exchange(
        &mut self,
        factory: Arc<dyn KeyExchangeFactory>,
    ) -> MslResult<()> {
        self.key_exchange.register(factory)
    }

    /// The configured preferences.
    #[must_use]
    pub fn preferences(&self) -> &SchemePreferences {
        &self.preferences
    }

    /// The entity authentication registry.
    #[must_use]
    pub fn entity_auth_registry(&self) -> &EntityAuthRegistry {
        &self.entity_auth
    }

    /// The user authentication registry.
    #[must_use]
    pub fn user_auth_registry(&self) -> &UserAuthRegistry {
        &self.user_auth
    }

    /// The key exchange registry.
    #[must_use]
    pub fn key_exchange_registry(&self) -> &KeyExchangeRegistry {
        &self.key_exchange
    }

    /// Check that every configured scheme is registered.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::SchemeNotSupported`] for the first configured scheme
    /// with no factory.
    pub fn validate(&self) -> MslResult<()> {
        if let Some(scheme) = &self.preferences.entity_auth {
            self.entity_auth.get(scheme)?;
        }
        if let Some(scheme) = &self.preferences.user_auth {
            self.user_auth.get(scheme)?;
        }
        for scheme in &self.preferences.key_exchange {
            self.key_exchange.get(scheme)?;
        }
        Ok(())
    }

    // Entity authentication

    /// The configured entity authentication scheme.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Configuration`] if none is configured.
    pub fn entity_auth_scheme(&self) -> MslResult<&str> {
        self.preferences
            .entity_auth
            .as_deref()
            .ok_or_else(|| {
                MslError::Configuration("no entity authentication scheme configured".into())
            })
    }

    /// Produce entity authentication data with the configured scheme.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the scheme is missing or unregistered,
    /// or the factory's error.
    pub fn entity_auth_data(
        &self,
        ctx: &SchemeContext,
        params: &SchemeParameters,
    ) -> MslResult<EntityAuthData> {
        let factory = self.entity_auth.get(self.entity_auth_scheme()?)?;
        factory.auth_data(ctx, params)
    }

    /// Authenticate a peer's entity authentication data.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::SchemeNotSupported`] if the data names an
    /// unregistered scheme, or the factory's error.
    pub fn entity_crypto_context(
        &self,
        ctx: &SchemeContext,
        data: &EntityAuthData,
    ) -> MslResult<SharedCryptoContext> {
        let factory = self.entity_auth.get(&data.scheme)?;
        debug!(scheme = %data.scheme, identity = %data.identity, "Authenticating entity");
        factory.crypto_context(ctx, data)
    }

    // User authentication

    /// Produce user authentication data with the configured scheme.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the scheme is missing or unregistered,
    /// or the factory's error.
    pub fn user_auth_data(
        &self,
        ctx: &SchemeContext,
        params: &SchemeParameters,
    ) -> MslResult<UserAuthData> {
        let scheme = self.preferences.user_auth.as_deref().ok_or_else(|| {
            MslError::Configuration("no user authentication scheme configured".into())
        })?;
        self.user_auth.get(scheme)?.auth_data(ctx, params)
    }

    /// Authenticate a peer's user authentication data.
    ///
    /// `master_token` is the master token the data arrived with. User-ID token
    /// authentication is checked against it before the factory runs.
    ///
    /// # Errors
    ///
    /// - [`MslError::SchemeNotSupported`] if the data names an unregistered scheme
    /// - [`MslError::TokenMismatch`] if a presented user-ID token is bound to
    ///   another master token line
    /// - the factory's error otherwise
    pub fn user_crypto_context(
        &self,
        ctx: &SchemeContext,
        data: &UserAuthData,
        master_token: Option<&MasterToken>,
    ) -> MslResult<SharedCryptoContext> {
        let factory = self.user_auth.get(&data.scheme)?;

        if data.scheme == names::user::USER_ID_TOKEN {
            let auth = UserIdTokenAuthData::from_auth_data(data)?;
            if let Some(master_token) = master_token {
                auth.user_id_token()
                    .check_bound_to(master_token)
                    .inspect_err(|e| warn!(error = %e, "User ID token presented with wrong master token"))?;
            }
        }

        debug!(scheme = %data.scheme, "Authenticating user");
        factory.crypto_context(ctx, data)
    }

    // Key exchange

    /// Position of `scheme` in the configured preference list.
    #[must_use]
    pub fn key_exchange_rank(&self, scheme: &str) -> Option<usize> {
        self.preferences
            .key_exchange
            .iter()
            .position(|s| s == scheme)
    }

    /// Key exchange factories, most preferred first.
    ///
    /// Order follows the configured list, whatever the registration order.
    /// Registered schemes absent from the list are not offered. With no list
    /// configured, every registered factory is offered in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::SchemeNotSupported`] if a configured scheme is not
    /// registered.
    pub fn key_exchange_factories(&self) -> MslResult<Vec<Arc<dyn KeyExchangeFactory>>> {
        if self.preferences.key_exchange.is_empty() {
            return Ok(self
                .key_exchange
                .names()
                .iter()
                .filter_map(|name| self.key_exchange.find(name))
                .collect());
        }
        self.preferences
            .key_exchange
            .iter()
            .map(|scheme| self.key_exchange.get(scheme))
            .collect()
    }

    /// Produce key request data with the most preferred scheme.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::KeyExchange`] if no key exchange scheme is available,
    /// or the factory's error.
    pub fn key_request_data(
        &self,
        ctx: &SchemeContext,
        params: &SchemeParameters,
    ) -> MslResult<KeyRequestData> {
        let factory = self
            .key_exchange_factories()?
            .into_iter()
            .next()
            .ok_or_else(|| MslError::key_exchange("none", "no key exchange scheme available"))?;
        factory.request_data(
            ctx,
            self.preferences.key_exchange_mechanism.as_deref(),
            params,
        )
    }

    /// Answer the peer's key requests with the most preferred scheme that
    /// can satisfy one of them.
    ///
    /// Schemes are tried in preference order. A key exchange failure moves
    /// on to the next candidate; any other error is returned at once.
    ///
    /// # Errors
    ///
    /// Returns the last [`MslError::KeyExchange`] if every candidate failed, or
    /// a key exchange error listing the offered schemes if none is supported.
    pub fn generate_key_response(
        &self,
        ctx: &SchemeContext,
        requests: &[KeyRequestData],
    ) -> MslResult<(KeyResponseData, SharedCryptoContext)> {
        let mut last_error = None;
        for factory in self.key_exchange_factories()? {
            for request in requests.iter().filter(|r| r.scheme == factory.scheme()) {
                match factory.generate_response(ctx, request) {
                    Ok(response) => {
                        debug!(scheme = %factory.scheme(), "Key exchange negotiated");
                        return Ok(response);
                    },
                    Err(e) if matches!(e, MslError::KeyExchange { .. }) => {
                        warn!(scheme = %factory.scheme(), error = %e, "Key exchange candidate failed");
                        last_error = Some(e);
                    },
                    Err(e) => return Err(e),
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            let offered: Vec<&str> = requests.iter().map(|r| r.scheme.as_str()).collect();
            MslError::key_exchange(
                offered.join(","),
                format!("no supported key exchange scheme among {offered:?}"),
            )
        }))
    }

    /// Derive the crypto context from the peer's response to our request.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::KeyExchange`] if the response scheme differs from the
    /// request scheme, [`MslError::SchemeNotSupported`] if it is unregistered,
    /// or the factory's error.
    pub fn key_exchange_crypto_context(
        &self,
        ctx: &SchemeContext,
        request: &KeyRequestData,
        response: &KeyResponseData,
    ) -> MslResult<SharedCryptoContext> {
        if request.scheme != response.scheme {
            return Err(MslError::key_exchange(
                &response.scheme,
                format!("response does not answer a {} request", request.scheme),
            ));
        }
        self.key_exchange
            .get(&response.scheme)?
            .crypto_context(ctx, request, response)
    }
}

impl fmt::Debug for SchemeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeResolver")
            .field("entity_auth", &self.entity_auth)
            .field("user_auth", &self.user_auth)
            .field("key_exchange", &self.key_exchange)
            .field("preferences", &self.preferences)
            .finish()
    }
}
