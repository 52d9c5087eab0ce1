//! Factory traits for the three scheme families.

use std::fmt;
use std::sync::Arc;

use msl_core::MslResult;
use msl_crypto::SharedCryptoContext;
use msl_store::TrustStore;

use crate::data::{
    EntityAuthData, KeyRequestData, KeyResponseData, SchemeParameters, UserAuthData,
};

/// State a factory may consult: the local entity and its trust store.
#[derive(Clone)]
pub struct SchemeContext {
    entity_identity: String,
    store: Arc<dyn TrustStore>,
}

impl SchemeContext {
    /// Create a context for `entity_identity` backed by `store`.
    #[must_use]
    pub fn new(entity_identity: impl Into<String>, store: Arc<dyn TrustStore>) -> Self {
        Self {
            entity_identity: entity_identity.into(),
            store,
        }
    }

    /// Identity of the local entity.
    #[must_use]
    pub fn entity_identity(&self) -> &str {
        &self.entity_identity
    }

    /// The local entity's trust store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TrustStore> {
        &self.store
    }
}

impl fmt::Debug for SchemeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeContext")
            .field("entity_identity", &self.entity_identity)
            .finish_non_exhaustive()
    }
}

/// Common supertrait: every factory serves exactly one named scheme.
pub trait SchemeFactory: Send + Sync {
    /// The scheme this factory serves.
    fn scheme(&self) -> &str;
}

/// Entity authentication scheme.
pub trait EntityAuthFactory: SchemeFactory {
    /// Produce authentication data for the local entity.
    ///
    /// # Errors
    ///
    /// Returns an entity-authentication error if required key material or
    /// parameters are missing.
    fn auth_data(
        &self,
        ctx: &SchemeContext,
        params: &SchemeParameters,
    ) -> MslResult<EntityAuthData>;

    /// Authenticate `data` and derive the crypto context it establishes.
    ///
    /// # Errors
    ///
    /// Returns an entity-authentication error if authentication fails.
    fn crypto_context(
        &self,
        ctx: &SchemeContext,
        data: &EntityAuthData,
    ) -> MslResult<SharedCryptoContext>;
}

/// User authentication scheme.
pub trait UserAuthFactory: SchemeFactory {
    /// Produce authentication data for a local user.
    ///
    /// # Errors
    ///
    /// Returns a user-authentication error if credentials are missing.
    fn auth_data(&self, ctx: &SchemeContext, params: &SchemeParameters)
    -> MslResult<UserAuthData>;

    /// Authenticate `data` and derive the crypto context it establishes.
    ///
    /// # Errors
    ///
    /// Returns a user-authentication error if authentication fails.
    fn crypto_context(
        &self,
        ctx: &SchemeContext,
        data: &UserAuthData,
    ) -> MslResult<SharedCryptoContext>;
}

/// Key exchange scheme.
pub trait KeyExchangeFactory: SchemeFactory {
    /// Produce request data (requesting side).
    ///
    /// # Errors
    ///
    /// Returns a key-exchange error if `mechanism` is not supported.
    fn request_data(
        &self,
        ctx: &SchemeContext,
        mechanism: Option<&str>,
        params: &SchemeParameters,
    ) -> MslResult<KeyRequestData>;

    /// Answer `request`, issuing a master token and its crypto context
    /// (responding side).
    ///
    /// # Errors
    ///
    /// Returns a key-exchange error if negotiation fails.
    fn generate_response(
        &self,
        ctx: &SchemeContext,
        request: &KeyRequestData,
    ) -> MslResult<(KeyResponseData, SharedCryptoContext)>;

    /// Derive the crypto context from the peer's `response` to our `request`
    /// (requesting side).
    ///
    /// # Errors
    ///
    /// Returns a key-exchange error if the response does not answer the request.
    fn crypto_context(
        &self,
        ctx: &SchemeContext,
        request: &KeyRequestData,
        response: &KeyResponseData,
    ) -> MslResult<SharedCryptoContext>;
}
