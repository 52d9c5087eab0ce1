//! The trust store interface.

use std::sync::Arc;

use msl_core::MslResult;
use msl_crypto::SharedCryptoContext;
use msl_tokens::{MasterToken, ServiceToken, UserIdToken};

use crate::snapshot::StoreSnapshot;

/// Trust material for one local entity.
///
/// Implementations must serialize every mutation so that no caller observes
/// a half-applied write, and must issue non-replayable IDs atomically.
/// Both [`SimpleTrustStore`](crate::SimpleTrustStore) and the
/// [`LoggingTrustStore`](crate::LoggingTrustStore) decorator implement it;
/// callers should depend on the trait.
pub trait TrustStore: Send + Sync {
    // -- Crypto contexts --

    /// Associate `context` with `master_token`'s serial number, replacing any
    /// existing context for that serial number.
    fn set_crypto_context(
        &self,
        master_token: &MasterToken,
        context: SharedCryptoContext,
    ) -> MslResult<()>;

    /// The crypto context for `master_token`'s serial number, if any.
    fn get_crypto_context(&self, master_token: &MasterToken)
    -> MslResult<Option<SharedCryptoContext>>;

    /// Drop the crypto context for `master_token`'s serial number.
    fn remove_crypto_context(&self, master_token: &MasterToken) -> MslResult<()>;

    /// Drop every crypto context.
    fn clear_crypto_contexts(&self) -> MslResult<()>;

    // -- Master tokens --

    /// Add a master token, or replace an older token of the same line.
    ///
    /// Offering an older sequence number than the stored one fails with
    /// [`MslError::StaleMasterToken`](msl_core::MslError::StaleMasterToken);
    /// offering the stored serial and sequence number with a different
    /// payload fails with
    /// [`MslError::IdentityCollision`](msl_core::MslError::IdentityCollision).
    fn add_master_token(&self, master_token: MasterToken) -> MslResult<()>;

    /// The newest master token (latest renewal window), if any.
    fn get_master_token(&self) -> MslResult<Option<MasterToken>>;

    /// The stored master token of line `serial_number`, if any.
    fn master_token(&self, serial_number: u64) -> MslResult<Option<MasterToken>>;

    /// Every stored master token, ordered by serial number.
    fn master_tokens(&self) -> MslResult<Vec<MasterToken>>;

    /// Remove `master_token` together with its crypto context and every
    /// user-ID token and service token bound to it. Its non-replayable
    /// counter is kept.
    fn remove_master_token(&self, master_token: &MasterToken) -> MslResult<()>;

    // -- Non-replayable IDs --

    /// Issue the next non-replayable ID for `master_token`'s serial number.
    fn non_replayable_id(&self, master_token: &MasterToken) -> MslResult<u64>;

    // -- User-ID tokens --

    /// Store `user_id_token` for `user_id`, replacing that user's previous token.
    ///
    /// Fails if the master token it is bound to is not in the store.
    fn add_user_id_token(&self, user_id: &str, user_id_token: UserIdToken) -> MslResult<()>;

    /// The user-ID token stored for `user_id`, if any.
    fn get_user_id_token(&self, user_id: &str) -> MslResult<Option<UserIdToken>>;

    /// Remove `user_id_token` and the service tokens bound to it.
    fn remove_user_id_token(&self, user_id_token: &UserIdToken) -> MslResult<()>;

    /// Remove every user-ID token and the service tokens bound to them.
    fn clear_user_id_tokens(&self) -> MslResult<()>;

    // -- Service tokens --

    /// Add service tokens, replacing tokens with the same name and bindings.
    ///
    /// Either all tokens are added or none are.
    fn add_service_tokens(&self, tokens: Vec<ServiceToken>) -> MslResult<()>;

    /// Service tokens usable with the given tokens: unbound tokens, tokens
    /// bound to `master_token`, and tokens bound to both `master_token` and
    /// `user_id_token`.
    fn get_service_tokens(
        &self,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<Vec<ServiceToken>>;

    /// Remove service tokens matching every given filter.
    fn remove_service_tokens(
        &self,
        name: Option<&str>,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<()>;

    /// Remove every service token.
    fn clear_service_tokens(&self) -> MslResult<()>;

    // -- Whole store --

    /// Remove all tokens and crypto contexts. Non-replayable counters are kept.
    fn clear(&self) -> MslResult<()>;

    /// A durable snapshot of the store. Crypto contexts are never included.
    fn snapshot(&self) -> MslResult<StoreSnapshot>;
}

impl<S: TrustStore + ?Sized> TrustStore for Arc<S> {
    fn set_crypto_context(
        &self,
        master_token: &MasterToken,
        context: SharedCryptoContext,
    ) -> MslResult<()> {
        (**self).set_crypto_context(master_token, context)
    }

    fn get_crypto_context(
        &self,
        master_token: &MasterToken,
    ) -> MslResult<Option<SharedCryptoContext>> {
        (**self).get_crypto_context(master_token)
    }

    fn remove_crypto_context(&self, master_token: &MasterToken) -> MslResult<()> {
        (**self).remove_crypto_context(master_token)
    }

    fn clear_crypto_contexts(&self) -> MslResult<()> {
        (**self).clear_crypto_contexts()
    }

    fn add_master_token(&self, master_token: MasterToken) -> MslResult<()> {
        (**self).add_master_token(master_token)
    }

    fn get_master_token(&self) -> MslResult<Option<MasterToken>> {
        (**self).get_master_token()
    }

    fn master_token(&self, serial_number: u64) -> MslResult<Option<MasterToken>> {
        (**self).master_token(serial_number)
    }

    fn master_tokens(&self) -> MslResult<Vec<MasterToken>> {
        (**self).master_tokens()
    }

    fn remove_master_token(&self, master_token: &MasterToken) -> MslResult<()> {
        (**self).remove_master_token(master_token)
    }

    fn non_replayable_id(&self, master_token: &MasterToken) -> MslResult<u64> {
        (**self).non_replayable_id(master_token)
    }

    fn add_user_id_token(&self, user_id: &str, user_id_token: UserIdToken) -> MslResult<()> {
        (**self).add_user_id_token(user_id, user_id_token)
    }

    fn get_user_id_token(&self, user_id: &str) -> MslResult<Option<UserIdToken>> {
        (**self).get_user_id_token(user_id)
    }

    fn remove_user_id_token(&self, user_id_token: &UserIdToken) -> MslResult<()> {
        (**self).remove_user_id_token(user_id_token)
    }

    fn clear_user_id_tokens(&self) -> MslResult<()> {
        (**self).clear_user_id_tokens()
    }

    fn add_service_tokens(&self, tokens: Vec<ServiceToken>) -> MslResult<()> {
        (**self).add_service_tokens(tokens)
    }

    fn get_service_tokens(
        &self,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<Vec<ServiceToken>> {
        (**self).get_service_tokens(master_token, user_id_token)
    }

    fn remove_service_tokens(
        &self,
        name: Option<&str>,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<()> {
        (**self).remove_service_tokens(name, master_token, user_id_token)
    }

    fn clear_service_tokens(&self) -> MslResult<()> {
        (**self).clear_service_tokens()
    }

    fn clear(&self) -> MslResult<()> {
        (**self).clear()
    }

    fn snapshot(&self) -> MslResult<StoreSnapshot> {
        (**self).snapshot()
    }
}
