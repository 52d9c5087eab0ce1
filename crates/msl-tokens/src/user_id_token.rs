//! User-ID tokens - a user identity bound to one master token line.
//!
//! The binding is the master token's serial number, not a reference to the
//! token itself. A renewed master token (same serial, higher sequence) keeps
//! its user-ID tokens valid.

use std::fmt;

use chrono::Duration;
use msl_core::{MslError, MslResult, Timestamp, check_range};
use msl_crypto::{ContentHash, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::master_token::MasterToken;
use crate::signing::SigningData;
use crate::user::MslUser;

const DEFAULT_RENEWAL_SECS: i64 = 60 * 60;
const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

/// Scheme label used in user-authentication errors raised by the token itself.
const USER_ID_TOKEN_LABEL: &str = "useridtoken";

/// A signed user-ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserIdTokenRepr")]
pub struct UserIdToken {
    serial_number: u64,
    master_token_serial_number: u64,
    user: MslUser,
    issued_at: Timestamp,
    renewal_window: Timestamp,
    expiration: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issuer_data: Option<Value>,
    issuer_key: PublicKey,
    signature: Signature,
}

#[derive(Deserialize)]
struct UserIdTokenRepr {
    serial_number: u64,
    master_token_serial_number: u64,
    user: MslUser,
    issued_at: Timestamp,
    renewal_window: Timestamp,
    expiration: Timestamp,
    #[serde(default)]
    issuer_data: Option<Value>,
    issuer_key: PublicKey,
    signature: Signature,
}

impl TryFrom<UserIdTokenRepr> for UserIdToken {
    type Error = MslError;

    fn try_from(r: UserIdTokenRepr) -> MslResult<Self> {
        let token = Self {
            serial_number: r.serial_number,
            master_token_serial_number: r.master_token_serial_number,
            user: r.user,
            issued_at: r.issued_at,
            renewal_window: r.renewal_window,
            expiration: r.expiration,
            issuer_data: r.issuer_data,
            issuer_key: r.issuer_key,
            signature: r.signature,
        };
        token.check()?;
        Ok(token)
    }
}

impl UserIdToken {
    /// Start building a user-ID token for `user`, bound to `master_token`.
    #[must_use]
    pub fn builder(master_token: &MasterToken, user: MslUser) -> UserIdTokenBuilder {
        UserIdTokenBuilder::new(master_token, user)
    }

    fn check(&self) -> MslResult<()> {
        check_range("user ID token serial number", self.serial_number)?;
        check_range(
            "user ID token master token serial number",
            self.master_token_serial_number,
        )?;
        if self.user.id.is_empty() {
            return Err(MslError::encoding("user ID token user is empty"));
        }
        if self.expiration < self.issued_at {
            return Err(MslError::encoding(format!(
                "user ID token {}: expiration precedes issue time",
                self.serial_number
            )));
        }
        if self.renewal_window > self.expiration {
            return Err(MslError::encoding(format!(
                "user ID token {}: renewal window is after expiration",
                self.serial_number
            )));
        }
        Ok(())
    }

    fn signing_data(&self) -> Vec<u8> {
        SigningData::new(USER_ID_TOKEN_LABEL)
            .u64(self.serial_number)
            .u64(self.master_token_serial_number)
            .str(&self.user.id)
            .timestamp(self.issued_at)
            .timestamp(self.renewal_window)
            .timestamp(self.expiration)
            .opt_json(self.issuer_data.as_ref())
            .bytes(self.issuer_key.as_bytes())
            .finish()
    }

    /// Verify the token was signed by `issuer_key`.
    ///
    /// # Errors
    ///
    /// Returns a user-authentication error if the key differs or the signature
    /// does not cover the token's fields.
    pub fn verify(&self, issuer_key: &PublicKey) -> MslResult<()> {
        if self.issuer_key != *issuer_key {
            return Err(MslError::user_auth(
                USER_ID_TOKEN_LABEL,
                format!(
                    "user ID token {} was issued by key {}, expected {}",
                    self.serial_number,
                    self.issuer_key.key_id_hex(),
                    issuer_key.key_id_hex()
                ),
            ));
        }
        self.issuer_key
            .verify(&self.signing_data(), &self.signature)
            .map_err(|e| {
                MslError::user_auth(
                    USER_ID_TOKEN_LABEL,
                    format!("user ID token {}: {e}", self.serial_number),
                )
            })
    }

    /// Check this token may be used alongside `master_token`.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::TokenMismatch`] if the token was issued under a
    /// different master token line.
    pub fn check_bound_to(&self, master_token: &MasterToken) -> MslResult<()> {
        if self.is_bound_to(master_token) {
            Ok(())
        } else {
            Err(MslError::TokenMismatch {
                user_id_token_serial: self.serial_number,
                bound_master_serial: self.master_token_serial_number,
                master_serial: master_token.serial_number(),
            })
        }
    }

    /// Whether this token was issued under `master_token`'s line.
    #[must_use]
    pub fn is_bound_to(&self, master_token: &MasterToken) -> bool {
        self.master_token_serial_number == master_token.serial_number()
    }

    /// Digest of the signed fields, for log lines.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::hash(&self.signing_data())
    }

    /// Serial number of this token.
    #[must_use]
    pub fn serial_number(&self) -> u64 {
        self.serial_number
    }

    /// Serial number of the master token line this token is bound to.
    #[must_use]
    pub fn master_token_serial_number(&self) -> u64 {
        self.master_token_serial_number
    }

    /// The authenticated user.
    #[must_use]
    pub fn user(&self) -> &MslUser {
        &self.user
    }

    /// When the token was issued.
    #[must_use]
    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Start of the renewal window.
    #[must_use]
    pub fn renewal_window(&self) -> Timestamp {
        self.renewal_window
    }

    /// When the token expires.
    #[must_use]
    pub fn expiration(&self) -> Timestamp {
        self.expiration
    }

    /// Opaque issuer payload.
    #[must_use]
    pub fn issuer_data(&self) -> Option<&Value> {
        self.issuer_data.as_ref()
    }

    /// Key that signed this token.
    #[must_use]
    pub fn issuer_key(&self) -> &PublicKey {
        &self.issuer_key
    }

    /// Whether the renewal window has opened at `now`.
    #[must_use]
    pub fn is_renewable(&self, now: Timestamp) -> bool {
        self.renewal_window <= now
    }

    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration <= now
    }
}

impl fmt::Display for UserIdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user ID token {} for {} (master token {})",
            self.serial_number, self.user, self.master_token_serial_number
        )
    }
}

/// Builder for user-ID tokens.
#[derive(Debug, Clone)]
pub struct UserIdTokenBuilder {
    master_token_serial_number: u64,
    user: MslUser,
    serial_number: u64,
    issued_at: Option<Timestamp>,
    renewal_window: Option<Timestamp>,
    expiration: Option<Timestamp>,
    renew_after: Duration,
    ttl: Duration,
    issuer_data: Option<Value>,
}

impl UserIdTokenBuilder {
    /// Create a builder for `user` bound to `master_token`.
    #[must_use]
    pub fn new(master_token: &MasterToken, user: MslUser) -> Self {
        Self {
            master_token_serial_number: master_token.serial_number(),
            user,
            serial_number: 0,
            issued_at: None,
            renewal_window: None,
            expiration: None,
            renew_after: Duration::seconds(DEFAULT_RENEWAL_SECS),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            issuer_data: None,
        }
    }

    /// Set the serial number.
    #[must_use]
    pub fn serial_number(mut self, serial_number: u64) -> Self {
        self.serial_number = serial_number;
        self
    }

    /// Set the issue time. Defaults to now.
    #[must_use]
    pub fn issued_at(mut self, issued_at: Timestamp) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Set an absolute renewal window.
    #[must_use]
    pub fn renewal_window(mut self, renewal_window: Timestamp) -> Self {
        self.renewal_window = Some(renewal_window);
        self
    }

    /// Set an absolute expiration.
    #[must_use]
    pub fn expiration(mut self, expiration: Timestamp) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Open the renewal window `after` the issue time.
    #[must_use]
    pub fn renew_after(mut self, after: Duration) -> Self {
        self.renew_after = after;
        self.renewal_window = None;
        self
    }

    /// Expire the token `ttl` after the issue time.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self.expiration = None;
        self
    }

    /// Attach an opaque issuer payload.
    #[must_use]
    pub fn issuer_data(mut self, data: Value) -> Self {
        self.issuer_data = Some(data);
        self
    }

    /// Validate the fields and sign the token.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Encoding`] if a number is out of range, the user is
    /// empty or the times are inconsistent.
    pub fn sign(self, issuer_key: &KeyPair) -> MslResult<UserIdToken> {
        let issued_at = self.issued_at.unwrap_or_else(Timestamp::now);
        let mut token = UserIdToken {
            serial_number: self.serial_number,
            master_token_serial_number: self.master_token_serial_number,
            user: self.user,
            issued_at,
            renewal_window: self
                .renewal_window
                .unwrap_or_else(|| issued_at.offset(self.renew_after)),
            expiration: self
                .expiration
                .unwrap_or_else(|| issued_at.offset(self.ttl)),
            issuer_data: self.issuer_data,
            issuer_key: issuer_key.public_key(),
            signature: Signature::from_bytes([0u8; 64]),
        };
        token.check()?;
        token.signature = issuer_key.sign(&token.signing_data());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msl_core::{ErrorKind, MAX_LONG_VALUE};

    fn master_token(keypair: &KeyPair, serial: u64, seq: u64) -> MasterToken {
        MasterToken::builder("server", "client-1")
            .serial_number(serial)
            .sequence_number(seq)
            .sign(keypair)
            .unwrap()
    }

    #[test]
    fn test_binding_is_by_serial_number() {
        let keypair = KeyPair::generate();
        let mt = master_token(&keypair, 5, 1);
        let uit = UserIdToken::builder(&mt, MslUser::new("alice"))
            .serial_number(10)
            .sign(&keypair)
            .unwrap();

        assert!(uit.is_bound_to(&mt));
        assert_eq!(uit.master_token_serial_number(), 5);

        // A renewal keeps the binding.
        let renewed = mt.renewed().sign(&keypair).unwrap();
        assert!(uit.check_bound_to(&renewed).is_ok());

        let other = master_token(&keypair, 6, 1);
        let err = uit.check_bound_to(&other).unwrap_err();
        assert!(matches!(err, MslError::TokenMismatch {
            user_id_token_serial: 10,
            bound_master_serial: 5,
            master_serial: 6,
        }));
        assert_eq!(err.kind(), ErrorKind::UserAuthentication);
    }

    #[test]
    fn test_verify_detects_tampered_user() {
        let keypair = KeyPair::generate();
        let mt = master_token(&keypair, 1, 1);
        let uit = UserIdToken::builder(&mt, MslUser::new("alice"))
            .sign(&keypair)
            .unwrap();
        assert!(uit.verify(&keypair.public_key()).is_ok());

        let mut json = serde_json::to_value(&uit).unwrap();
        json["user"]["id"] = Value::from("mallory");
        let tampered: UserIdToken = serde_json::from_value(json).unwrap();
        let err = tampered.verify(&keypair.public_key()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserAuthentication);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let keypair = KeyPair::generate();
        let mt = master_token(&keypair, 1, 1);

        let err = UserIdToken::builder(&mt, MslUser::new(""))
            .sign(&keypair)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        let err = UserIdToken::builder(&mt, MslUser::new("alice"))
            .serial_number(MAX_LONG_VALUE.saturating_add(1))
            .sign(&keypair)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        let now = Timestamp::now();
        let err = UserIdToken::builder(&mt, MslUser::new("alice"))
            .issued_at(now)
            .renewal_window(now.offset(Duration::hours(3)))
            .expiration(now.offset(Duration::hours(2)))
            .sign(&keypair)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn test_renewal_predicates() {
        let keypair = KeyPair::generate();
        let mt = master_token(&keypair, 1, 1);
        let now = Timestamp::now();
        let uit = UserIdToken::builder(&mt, MslUser::new("alice"))
            .issued_at(now)
            .renew_after(Duration::minutes(5))
            .ttl(Duration::minutes(10))
            .sign(&keypair)
            .unwrap();

        assert!(!uit.is_renewable(now));
        assert!(uit.is_renewable(now.offset(Duration::minutes(5))));
        assert!(uit.is_expired(now.offset(Duration::minutes(10))));
    }

    #[test]
    fn test_display() {
        let keypair = KeyPair::generate();
        let mt = master_token(&keypair, 2, 1);
        let uit = UserIdToken::builder(&mt, MslUser::new("alice"))
            .serial_number(9)
            .sign(&keypair)
            .unwrap();
        assert_eq!(
            uit.to_string(),
            "user ID token 9 for alice (master token 2)"
        );
    }
}
