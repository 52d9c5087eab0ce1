//! Factories that need no key material of their own.

use std::sync::Arc;

use msl_core::{MslError, MslResult};
use msl_crypto::{NullCryptoContext, SharedCryptoContext};
use serde_json::Value;
use tracing::{debug, warn};

use crate::data::{EntityAuthData, SchemeParameters, UserAuthData};
use crate::factory::{EntityAuthFactory, SchemeContext, SchemeFactory, UserAuthFactory};
use crate::names;
use crate::user_id_token_auth::UserIdTokenAuthData;

/// Parameter naming the user whose user-ID token is presented.
pub const PARAM_USER_ID: &str = "user_id";

/// Entity authentication that asserts an identity without proof.
///
/// The resulting crypto context cannot protect anything; it only carries the
/// identity through to key exchange.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnauthenticatedFactory;

impl SchemeFactory for UnauthenticatedFactory {
    fn scheme(&self) -> &str {
        names::entity::NONE
    }
}

impl EntityAuthFactory for UnauthenticatedFactory {
    fn auth_data(
        &self,
        ctx: &SchemeContext,
        _params: &SchemeParameters,
    ) -> MslResult<EntityAuthData> {
        if ctx.entity_identity().is_empty() {
            return Err(MslError::entity_auth(
                names::entity::NONE,
                "entity identity is empty",
            ));
        }
        Ok(EntityAuthData {
            scheme: names::entity::NONE.into(),
            identity: ctx.entity_identity().to_string(),
            auth_data: Value::Object(serde_json::Map::new()),
        })
    }

    fn crypto_context(
        &self,
        _ctx: &SchemeContext,
        data: &EntityAuthData,
    ) -> MslResult<SharedCryptoContext> {
        if data.identity.is_empty() {
            return Err(MslError::entity_auth(
                names::entity::NONE,
                "entity identity is empty",
            ));
        }
        Ok(Arc::new(NullCryptoContext::new(data.identity.clone())))
    }
}

/// User authentication by a previously issued user-ID token.
///
/// Both sides resolve the token pair against the local trust store. The
/// crypto context is the one cached for the master token.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserIdTokenAuthFactory;

impl SchemeFactory for UserIdTokenAuthFactory {
    fn scheme(&self) -> &str {
        names::user::USER_ID_TOKEN
    }
}

impl UserAuthFactory for UserIdTokenAuthFactory {
    fn auth_data(&self, ctx: &SchemeContext, params: &SchemeParameters) -> MslResult<UserAuthData> {
        let scheme = names::user::USER_ID_TOKEN;
        let user_id = params
            .get_str(PARAM_USER_ID)
            .ok_or_else(|| MslError::user_auth(scheme, format!("missing {PARAM_USER_ID}")))?;

        let user_id_token = ctx
            .store()
            .get_user_id_token(user_id)?
            .ok_or_else(|| MslError::user_auth(scheme, format!("no user ID token for {user_id}")))?;
        let master_token = ctx
            .store()
            .master_token(user_id_token.master_token_serial_number())?
            .ok_or(MslError::MasterTokenNotFound {
                user_id_token_serial: user_id_token.serial_number(),
                bound_master_serial: user_id_token.master_token_serial_number(),
            })?;

        debug!(user_id = %user_id, serial = user_id_token.serial_number(), "Presenting user ID token");
        UserIdTokenAuthData::new(master_token, user_id_token)?.to_auth_data()
    }

    fn crypto_context(
        &self,
        ctx: &SchemeContext,
        data: &UserAuthData,
    ) -> MslResult<SharedCryptoContext> {
        let scheme = names::user::USER_ID_TOKEN;
        let auth = UserIdTokenAuthData::from_auth_data(data)?;
        let master_token = auth.master_token();

        let stored = ctx
            .store()
            .master_token(master_token.serial_number())?
            .filter(|stored| stored.id() == master_token.id())
            .ok_or(MslError::MasterTokenNotFound {
                user_id_token_serial: auth.user_id_token().serial_number(),
                bound_master_serial: master_token.serial_number(),
            })?;

        // The presented master token must be byte-for-byte the one we hold,
        // and the user-ID token must carry the issuer's signature.
        if stored != *master_token {
            warn!(master_token = %master_token.id(), "Presented master token differs from stored token");
            return Err(MslError::user_auth(
                scheme,
                format!("{} does not match the stored token", master_token.id()),
            ));
        }
        auth.user_id_token()
            .verify(stored.issuer_key())
            .map_err(|e| {
                warn!(error = %e, "Rejected user ID token");
                MslError::user_auth(scheme, format!("user ID token rejected: {e}"))
            })?;

        ctx.store().get_crypto_context(master_token)?.ok_or_else(|| {
            MslError::user_auth(
                scheme,
                format!("no crypto context for {}", master_token.id()),
            )
        })
    }
}
