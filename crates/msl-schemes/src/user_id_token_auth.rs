//! User authentication by presenting a master token and user-ID token pair.

use msl_core::{MslError, MslResult};
use msl_tokens::{MasterToken, UserIdToken, wire};
use serde_json::{Map, Value};

use crate::data::UserAuthData;
use crate::names;

const KEY_MASTER_TOKEN: &str = "mastertoken";
const KEY_USER_ID_TOKEN: &str = "useridtoken";

/// A master token and a user-ID token bound to it.
///
/// Construction and decoding both check the binding, so a value of this type
/// always holds a matching pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdTokenAuthData {
    master_token: MasterToken,
    user_id_token: UserIdToken,
}

impl UserIdTokenAuthData {
    /// Pair `user_id_token` with `master_token`.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::TokenMismatch`] if the user-ID token is bound to a
    /// different master token line.
    pub fn new(master_token: MasterToken, user_id_token: UserIdToken) -> MslResult<Self> {
        user_id_token.check_bound_to(&master_token)?;
        Ok(Self {
            master_token,
            user_id_token,
        })
    }

    /// The master token.
    #[must_use]
    pub fn master_token(&self) -> &MasterToken {
        &self.master_token
    }

    /// The user-ID token.
    #[must_use]
    pub fn user_id_token(&self) -> &UserIdToken {
        &self.user_id_token
    }

    /// Encode as [`UserAuthData`] for the `USER_ID_TOKEN` scheme.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Encoding`] if a token cannot be encoded.
    pub fn to_auth_data(&self) -> MslResult<UserAuthData> {
        let mut map = Map::new();
        map.insert(KEY_MASTER_TOKEN.into(), wire::to_value(&self.master_token)?);
        map.insert(KEY_USER_ID_TOKEN.into(), wire::to_value(&self.user_id_token)?);
        Ok(UserAuthData {
            scheme: names::user::USER_ID_TOKEN.into(),
            auth_data: Value::Object(map),
        })
    }

    /// Decode from [`UserAuthData`].
    ///
    /// # Errors
    ///
    /// - [`MslError::UserAuth`] if the data is for another scheme or a token
    ///   is malformed
    /// - [`MslError::Encoding`] if a token field is missing
    /// - [`MslError::TokenMismatch`] if the tokens do not belong together
    pub fn from_auth_data(data: &UserAuthData) -> MslResult<Self> {
        let scheme = names::user::USER_ID_TOKEN;
        if data.scheme != scheme {
            return Err(MslError::user_auth(
                &data.scheme,
                format!("not {scheme} authentication data"),
            ));
        }
        let field = |key: &str| {
            data.auth_data
                .get(key)
                .cloned()
                .ok_or_else(|| MslError::encoding(format!("{scheme} auth data is missing {key}")))
        };

        let master_token = wire::from_value::<MasterToken>(field(KEY_MASTER_TOKEN)?)
            .map_err(|e| MslError::user_auth(scheme, format!("master token invalid: {e}")))?;
        let user_id_token = wire::from_value::<UserIdToken>(field(KEY_USER_ID_TOKEN)?)
            .map_err(|e| MslError::user_auth(scheme, format!("user ID token invalid: {e}")))?;

        Self::new(master_token, user_id_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msl_core::ErrorKind;
    use msl_crypto::KeyPair;
    use msl_tokens::MslUser;

    fn pair(keypair: &KeyPair, mt_serial: u64) -> (MasterToken, UserIdToken) {
        let mt = MasterToken::builder("server", "client-1")
            .serial_number(mt_serial)
            .sign(keypair)
            .unwrap();
        let uit = UserIdToken::builder(&mt, MslUser::new("alice"))
            .serial_number(1)
            .sign(keypair)
            .unwrap();
        (mt, uit)
    }

    #[test]
    fn test_roundtrip_and_equality() {
        let keypair = KeyPair::generate();
        let (mt, uit) = pair(&keypair, 1);
        let data = UserIdTokenAuthData::new(mt, uit).unwrap();

        let encoded = data.to_auth_data().unwrap();
        assert_eq!(encoded.scheme, "USER_ID_TOKEN");
        let decoded = UserIdTokenAuthData::from_auth_data(&encoded).unwrap();
        assert_eq!(decoded, data);

        // Equality covers both tokens.
        let (other_mt, other_uit) = pair(&keypair, 1);
        let other = UserIdTokenAuthData::new(other_mt, other_uit).unwrap();
        assert_ne!(other, data);
    }

    #[test]
    fn test_rejects_mismatched_pair() {
        let keypair = KeyPair::generate();
        let (_, uit) = pair(&keypair, 1);
        let (other_mt, _) = pair(&keypair, 2);

        let err = UserIdTokenAuthData::new(other_mt, uit).unwrap_err();
        assert!(matches!(err, MslError::TokenMismatch { .. }));
    }

    #[test]
    fn test_missing_field_is_encoding_error() {
        let data = UserAuthData {
            scheme: "USER_ID_TOKEN".into(),
            auth_data: serde_json::json!({"mastertoken": {}}),
        };
        let err = UserIdTokenAuthData::from_auth_data(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.to_string().contains("useridtoken"));
    }

    #[test]
    fn test_invalid_master_token() {
        let keypair = KeyPair::generate();
        let (_, uit) = pair(&keypair, 1);
        let data = UserAuthData {
            scheme: "USER_ID_TOKEN".into(),
            auth_data: serde_json::json!({
                "mastertoken": "x",
                "useridtoken": wire::to_value(&uit).unwrap(),
            }),
        };
        let err = UserIdTokenAuthData::from_auth_data(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserAuthentication);
        assert!(err.to_string().contains("master token invalid"));
    }

    #[test]
    fn test_invalid_user_id_token() {
        let keypair = KeyPair::generate();
        let (mt, _) = pair(&keypair, 1);
        let data = UserAuthData {
            scheme: "USER_ID_TOKEN".into(),
            auth_data: serde_json::json!({
                "mastertoken": wire::to_value(&mt).unwrap(),
                "useridtoken": {"serial_number": 1},
            }),
        };
        let err = UserIdTokenAuthData::from_auth_data(&data).unwrap_err();
        assert!(err.to_string().contains("user ID token invalid"));
    }

    #[test]
    fn test_mismatched_pair_on_decode() {
        let keypair = KeyPair::generate();
        let (_, uit) = pair(&keypair, 1);
        let (other_mt, _) = pair(&keypair, 2);
        let data = UserAuthData {
            scheme: "USER_ID_TOKEN".into(),
            auth_data: serde_json::json!({
                "mastertoken": wire::to_value(&other_mt).unwrap(),
                "useridtoken": wire::to_value(&uit).unwrap(),
            }),
        };
        let err = UserIdTokenAuthData::from_auth_data(&data).unwrap_err();
        assert!(matches!(err, MslError::TokenMismatch { .. }));
    }

    #[test]
    fn test_rejects_other_scheme() {
        let data = UserAuthData {
            scheme: "EMAIL_PASSWORD".into(),
            auth_data: Value::Null,
        };
        let err = UserIdTokenAuthData::from_auth_data(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserAuthentication);
    }
}
