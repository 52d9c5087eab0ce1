//! Logging decorator for any [`TrustStore`].

use msl_core::MslResult;
use msl_crypto::SharedCryptoContext;
use msl_tokens::{MasterToken, ServiceToken, UserIdToken};
use tracing::{debug, info, warn};

use crate::snapshot::StoreSnapshot;
use crate::store::TrustStore;

/// Forwards every call to the wrapped store and emits a `tracing` event for it.
///
/// Mutations are logged at `info`, lookups and ID issuance at `debug`, and
/// failures at `warn`. Logging never changes the outcome of a call.
#[derive(Debug)]
pub struct LoggingTrustStore<S> {
    inner: S,
}

impl<S: TrustStore> LoggingTrustStore<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap, returning the wrapped store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn logged<T>(op: &'static str, result: MslResult<T>) -> MslResult<T> {
    if let Err(e) = &result {
        warn!(op, error = %e, kind = %e.kind(), "Trust store operation failed");
    }
    result
}

fn serial(token: Option<&MasterToken>) -> Option<u64> {
    token.map(MasterToken::serial_number)
}

impl<S: TrustStore> TrustStore for LoggingTrustStore<S> {
    fn set_crypto_context(
        &self,
        master_token: &MasterToken,
        context: SharedCryptoContext,
    ) -> MslResult<()> {
        info!(
            serial_number = master_token.serial_number(),
            sequence_number = master_token.sequence_number(),
            context = context.id(),
            "Set crypto context"
        );
        logged(
            "set_crypto_context",
            self.inner.set_crypto_context(master_token, context),
        )
    }

    fn get_crypto_context(
        &self,
        master_token: &MasterToken,
    ) -> MslResult<Option<SharedCryptoContext>> {
        let result = logged(
            "get_crypto_context",
            self.inner.get_crypto_context(master_token),
        );
        if let Ok(found) = &result {
            debug!(
                serial_number = master_token.serial_number(),
                hit = found.is_some(),
                "Crypto context lookup"
            );
        }
        result
    }

    fn remove_crypto_context(&self, master_token: &MasterToken) -> MslResult<()> {
        info!(
            serial_number = master_token.serial_number(),
            "Remove crypto context"
        );
        logged(
            "remove_crypto_context",
            self.inner.remove_crypto_context(master_token),
        )
    }

    fn clear_crypto_contexts(&self) -> MslResult<()> {
        info!("Clear crypto contexts");
        logged("clear_crypto_contexts", self.inner.clear_crypto_contexts())
    }

    fn add_master_token(&self, master_token: MasterToken) -> MslResult<()> {
        info!(
            serial_number = master_token.serial_number(),
            sequence_number = master_token.sequence_number(),
            fingerprint = %master_token.fingerprint().short_hex(),
            "Add master token"
        );
        logged("add_master_token", self.inner.add_master_token(master_token))
    }

    fn get_master_token(&self) -> MslResult<Option<MasterToken>> {
        logged("get_master_token", self.inner.get_master_token())
    }

    fn master_token(&self, serial_number: u64) -> MslResult<Option<MasterToken>> {
        logged("master_token", self.inner.master_token(serial_number))
    }

    fn master_tokens(&self) -> MslResult<Vec<MasterToken>> {
        logged("master_tokens", self.inner.master_tokens())
    }

    fn remove_master_token(&self, master_token: &MasterToken) -> MslResult<()> {
        info!(
            serial_number = master_token.serial_number(),
            sequence_number = master_token.sequence_number(),
            "Remove master token"
        );
        logged(
            "remove_master_token",
            self.inner.remove_master_token(master_token),
        )
    }

    fn non_replayable_id(&self, master_token: &MasterToken) -> MslResult<u64> {
        let result = logged(
            "non_replayable_id",
            self.inner.non_replayable_id(master_token),
        );
        if let Ok(id) = &result {
            debug!(
                serial_number = master_token.serial_number(),
                non_replayable_id = *id,
                "Issued non-replayable ID"
            );
        }
        result
    }

    fn add_user_id_token(&self, user_id: &str, user_id_token: UserIdToken) -> MslResult<()> {
        info!(
            user_id,
            serial_number = user_id_token.serial_number(),
            master_token_serial_number = user_id_token.master_token_serial_number(),
            "Add user ID token"
        );
        logged(
            "add_user_id_token",
            self.inner.add_user_id_token(user_id, user_id_token),
        )
    }

    fn get_user_id_token(&self, user_id: &str) -> MslResult<Option<UserIdToken>> {
        logged("get_user_id_token", self.inner.get_user_id_token(user_id))
    }

    fn remove_user_id_token(&self, user_id_token: &UserIdToken) -> MslResult<()> {
        info!(
            serial_number = user_id_token.serial_number(),
            user = %user_id_token.user(),
            "Remove user ID token"
        );
        logged(
            "remove_user_id_token",
            self.inner.remove_user_id_token(user_id_token),
        )
    }

    fn clear_user_id_tokens(&self) -> MslResult<()> {
        info!("Clear user ID tokens");
        logged("clear_user_id_tokens", self.inner.clear_user_id_tokens())
    }

    fn add_service_tokens(&self, tokens: Vec<ServiceToken>) -> MslResult<()> {
        for token in &tokens {
            info!(
                name = token.name(),
                master_token_serial_number = ?token.master_token_serial_number(),
                user_id_token_serial_number = ?token.user_id_token_serial_number(),
                "Add service token"
            );
        }
        logged("add_service_tokens", self.inner.add_service_tokens(tokens))
    }

    fn get_service_tokens(
        &self,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<Vec<ServiceToken>> {
        let result = logged(
            "get_service_tokens",
            self.inner.get_service_tokens(master_token, user_id_token),
        );
        if let Ok(tokens) = &result {
            debug!(
                master_token_serial_number = ?serial(master_token),
                user_id_token_serial_number = ?user_id_token.map(UserIdToken::serial_number),
                count = tokens.len(),
                "Service token lookup"
            );
        }
        result
    }

    fn remove_service_tokens(
        &self,
        name: Option<&str>,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<()> {
        info!(
            name = ?name,
            master_token_serial_number = ?serial(master_token),
            user_id_token_serial_number = ?user_id_token.map(UserIdToken::serial_number),
            "Remove service tokens"
        );
        logged(
            "remove_service_tokens",
            self.inner
                .remove_service_tokens(name, master_token, user_id_token),
        )
    }

    fn clear_service_tokens(&self) -> MslResult<()> {
        info!("Clear service tokens");
        logged("clear_service_tokens", self.inner.clear_service_tokens())
    }

    fn clear(&self) -> MslResult<()> {
        info!("Clear trust store");
        logged("clear", self.inner.clear())
    }

    fn snapshot(&self) -> MslResult<StoreSnapshot> {
        let result = logged("snapshot", self.inner.snapshot());
        if let Ok(snapshot) = &result {
            debug!(
                master_tokens = snapshot.master_tokens.len(),
                user_id_tokens = snapshot.user_id_tokens.len(),
                service_tokens = snapshot.service_tokens.len(),
                "Took trust store snapshot"
            );
        }
        result
    }
}
