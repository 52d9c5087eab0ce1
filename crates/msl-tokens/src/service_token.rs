//! Service tokens - opaque application payloads.
//!
//! A service token may be unbound, bound to a master token line, or bound to
//! both a master token line and a user-ID token. A token bound to a user-ID
//! token is always bound to that token's master token line as well.

use std::fmt;

use msl_core::{MslError, MslResult, Timestamp, check_range};
use msl_crypto::{KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::master_token::MasterToken;
use crate::signing::SigningData;
use crate::user_id_token::UserIdToken;

/// A signed service token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ServiceTokenRepr")]
pub struct ServiceToken {
    name: String,
    #[serde(with = "base64_bytes")]
    data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    master_token_serial_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id_token_serial_number: Option<u64>,
    issued_at: Timestamp,
    issuer_key: PublicKey,
    signature: Signature,
}

#[derive(Deserialize)]
struct ServiceTokenRepr {
    name: String,
    #[serde(with = "base64_bytes")]
    data: Vec<u8>,
    #[serde(default)]
    master_token_serial_number: Option<u64>,
    #[serde(default)]
    user_id_token_serial_number: Option<u64>,
    issued_at: Timestamp,
    issuer_key: PublicKey,
    signature: Signature,
}

impl TryFrom<ServiceTokenRepr> for ServiceToken {
    type Error = MslError;

    fn try_from(r: ServiceTokenRepr) -> MslResult<Self> {
        let token = Self {
            name: r.name,
            data: r.data,
            master_token_serial_number: r.master_token_serial_number,
            user_id_token_serial_number: r.user_id_token_serial_number,
            issued_at: r.issued_at,
            issuer_key: r.issuer_key,
            signature: r.signature,
        };
        token.check()?;
        Ok(token)
    }
}

impl ServiceToken {
    /// Start building a service token.
    #[must_use]
    pub fn builder(name: impl Into<String>, data: impl Into<Vec<u8>>) -> ServiceTokenBuilder {
        ServiceTokenBuilder::new(name, data)
    }

    fn check(&self) -> MslResult<()> {
        if self.name.is_empty() {
            return Err(MslError::encoding("service token name is empty"));
        }
        if let Some(serial) = self.master_token_serial_number {
            check_range("service token master token serial number", serial)?;
        }
        if let Some(serial) = self.user_id_token_serial_number {
            check_range("service token user ID token serial number", serial)?;
            if self.master_token_serial_number.is_none() {
                return Err(MslError::encoding(format!(
                    "service token {} is bound to user ID token {serial} but not to a master token",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn signing_data(&self) -> Vec<u8> {
        SigningData::new("servicetoken")
            .str(&self.name)
            .bytes(&self.data)
            .opt_u64(self.master_token_serial_number)
            .opt_u64(self.user_id_token_serial_number)
            .timestamp(self.issued_at)
            .bytes(self.issuer_key.as_bytes())
            .finish()
    }

    /// Verify the token was signed by `issuer_key`.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Crypto`] if the key differs or the signature does
    /// not cover the token's fields.
    pub fn verify(&self, issuer_key: &PublicKey) -> MslResult<()> {
        if self.issuer_key != *issuer_key {
            return Err(MslError::Crypto(format!(
                "service token {} was issued by key {}",
                self.name,
                self.issuer_key.key_id_hex()
            )));
        }
        self.issuer_key
            .verify(&self.signing_data(), &self.signature)
            .map_err(|e| MslError::Crypto(format!("service token {}: {e}", self.name)))
    }

    /// Token name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Application payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bound master token serial number, if any.
    #[must_use]
    pub fn master_token_serial_number(&self) -> Option<u64> {
        self.master_token_serial_number
    }

    /// Bound user-ID token serial number, if any.
    #[must_use]
    pub fn user_id_token_serial_number(&self) -> Option<u64> {
        self.user_id_token_serial_number
    }

    /// When the token was issued.
    #[must_use]
    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Whether the token is bound to a master token line.
    #[must_use]
    pub fn is_master_token_bound(&self) -> bool {
        self.master_token_serial_number.is_some()
    }

    /// Whether the token is bound to a user-ID token.
    #[must_use]
    pub fn is_user_id_token_bound(&self) -> bool {
        self.user_id_token_serial_number.is_some()
    }

    /// Whether the token is bound to nothing.
    #[must_use]
    pub fn is_unbound(&self) -> bool {
        !self.is_master_token_bound() && !self.is_user_id_token_bound()
    }

    /// Whether the token is bound to `master_token`'s line.
    #[must_use]
    pub fn is_bound_to_master_token(&self, master_token: &MasterToken) -> bool {
        self.master_token_serial_number == Some(master_token.serial_number())
    }

    /// Whether the token is bound to `user_id_token`.
    #[must_use]
    pub fn is_bound_to_user_id_token(&self, user_id_token: &UserIdToken) -> bool {
        self.user_id_token_serial_number == Some(user_id_token.serial_number())
    }
}

impl fmt::Display for ServiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service token {}", self.name)?;
        if let Some(mt) = self.master_token_serial_number {
            write!(f, " [mt {mt}")?;
            if let Some(uit) = self.user_id_token_serial_number {
                write!(f, ", uit {uit}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Builder for service tokens.
#[derive(Debug, Clone)]
pub struct ServiceTokenBuilder {
    name: String,
    data: Vec<u8>,
    master_token_serial_number: Option<u64>,
    user_id_token: Option<(u64, u64)>,
    issued_at: Option<Timestamp>,
}

impl ServiceTokenBuilder {
    /// Create a new unbound service token builder.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            master_token_serial_number: None,
            user_id_token: None,
            issued_at: None,
        }
    }

    /// Bind to `master_token`'s line.
    #[must_use]
    pub fn bound_to_master_token(mut self, master_token: &MasterToken) -> Self {
        self.master_token_serial_number = Some(master_token.serial_number());
        self
    }

    /// Bind to `user_id_token` and to the master token line it is bound to.
    #[must_use]
    pub fn bound_to_user_id_token(mut self, user_id_token: &UserIdToken) -> Self {
        self.user_id_token = Some((
            user_id_token.serial_number(),
            user_id_token.master_token_serial_number(),
        ));
        self
    }

    /// Set the issue time. Defaults to now.
    #[must_use]
    pub fn issued_at(mut self, issued_at: Timestamp) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Validate the bindings and sign the token.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::TokenMismatch`] if the user-ID token is bound to a
    /// different master token than the one given, or [`MslError::Encoding`]
    /// if the name is empty.
    pub fn sign(self, issuer_key: &KeyPair) -> MslResult<ServiceToken> {
        let (master_token_serial_number, user_id_token_serial_number) =
            match (self.master_token_serial_number, self.user_id_token) {
                (Some(master), Some((uit, bound))) if master != bound => {
                    return Err(MslError::TokenMismatch {
                        user_id_token_serial: uit,
                        bound_master_serial: bound,
                        master_serial: master,
                    });
                },
                (_, Some((uit, bound))) => (Some(bound), Some(uit)),
                (master, None) => (master, None),
            };

        let mut token = ServiceToken {
            name: self.name,
            data: self.data,
            master_token_serial_number,
            user_id_token_serial_number,
            issued_at: self.issued_at.unwrap_or_else(Timestamp::now),
            issuer_key: issuer_key.public_key(),
            signature: Signature::from_bytes([0u8; 64]),
        };
        token.check()?;
        token.signature = issuer_key.sign(&token.signing_data());
        Ok(token)
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
