//! Master tokens - an entity's authenticated session state.
//!
//! A master token is identified by its serial number (the token "line") and
//! versioned by its sequence number. Renewal never mutates a token: it issues a
//! new one with the same serial number and a higher sequence number.

use std::fmt;

use chrono::Duration;
use msl_core::{MslError, MslResult, Timestamp, check_range};
use msl_crypto::{ContentHash, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signing::SigningData;

/// Default time from issuance until a master token may be renewed.
const DEFAULT_RENEWAL_SECS: i64 = 60 * 60;

/// Default time from issuance until a master token expires.
const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

/// Identity fields of a master token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MasterTokenId {
    /// Serial number of the token line.
    pub serial_number: u64,
    /// Sequence number within the line.
    pub sequence_number: u64,
}

impl fmt::Display for MasterTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "master token {}:{}",
            self.serial_number, self.sequence_number
        )
    }
}

/// A signed master token.
///
/// Equality covers every field. Decoding runs the same consistency checks as
/// [`MasterTokenBuilder::sign`], so a decoded token is always well formed; its
/// signature is checked separately with [`MasterToken::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MasterTokenRepr")]
pub struct MasterToken {
    serial_number: u64,
    sequence_number: u64,
    issued_at: Timestamp,
    renewal_window: Timestamp,
    expiration: Timestamp,
    issuer: String,
    identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issuer_data: Option<Value>,
    issuer_key: PublicKey,
    signature: Signature,
}

/// Unchecked decode target for [`MasterToken`].
#[derive(Deserialize)]
struct MasterTokenRepr {
    serial_number: u64,
    sequence_number: u64,
    issued_at: Timestamp,
    renewal_window: Timestamp,
    expiration: Timestamp,
    issuer: String,
    identity: String,
    #[serde(default)]
    issuer_data: Option<Value>,
    issuer_key: PublicKey,
    signature: Signature,
}

impl TryFrom<MasterTokenRepr> for MasterToken {
    type Error = MslError;

    fn try_from(r: MasterTokenRepr) -> MslResult<Self> {
        let token = Self {
            serial_number: r.serial_number,
            sequence_number: r.sequence_number,
            issued_at: r.issued_at,
            renewal_window: r.renewal_window,
            expiration: r.expiration,
            issuer: r.issuer,
            identity: r.identity,
            issuer_data: r.issuer_data,
            issuer_key: r.issuer_key,
            signature: r.signature,
        };
        token.check()?;
        Ok(token)
    }
}

impl MasterToken {
    /// Start building a master token for `identity`, issued by `issuer`.
    #[must_use]
    pub fn builder(issuer: impl Into<String>, identity: impl Into<String>) -> MasterTokenBuilder {
        MasterTokenBuilder::new(issuer, identity)
    }

    /// Internal consistency checks shared by the builder and the decoder.
    fn check(&self) -> MslResult<()> {
        check_range("master token serial number", self.serial_number)?;
        check_range("master token sequence number", self.sequence_number)?;
        if self.identity.is_empty() {
            return Err(MslError::encoding("master token identity is empty"));
        }
        if self.issuer.is_empty() {
            return Err(MslError::encoding("master token issuer is empty"));
        }
        if self.expiration < self.issued_at {
            return Err(MslError::encoding(format!(
                "{}: expiration {} precedes issue time {}",
                self.id(),
                self.expiration,
                self.issued_at
            )));
        }
        if self.renewal_window > self.expiration {
            return Err(MslError::encoding(format!(
                "{}: renewal window {} is after expiration {}",
                self.id(),
                self.renewal_window,
                self.expiration
            )));
        }
        Ok(())
    }

    fn signing_data(&self) -> Vec<u8> {
        SigningData::new("mastertoken")
            .u64(self.serial_number)
            .u64(self.sequence_number)
            .timestamp(self.issued_at)
            .timestamp(self.renewal_window)
            .timestamp(self.expiration)
            .str(&self.issuer)
            .str(&self.identity)
            .opt_json(self.issuer_data.as_ref())
            .bytes(self.issuer_key.as_bytes())
            .finish()
    }

    /// Verify the token was signed by `issuer_key`.
    ///
    /// # Errors
    ///
    /// Returns an entity-authentication error if the token names a different
    /// issuer key or the signature does not cover its fields.
    pub fn verify(&self, issuer_key: &PublicKey) -> MslResult<()> {
        if self.issuer_key != *issuer_key {
            return Err(MslError::entity_auth(
                &self.identity,
                format!(
                    "{} was issued by key {}, expected {}",
                    self.id(),
                    self.issuer_key.key_id_hex(),
                    issuer_key.key_id_hex()
                ),
            ));
        }
        self.issuer_key
            .verify(&self.signing_data(), &self.signature)
            .map_err(|e| MslError::entity_auth(&self.identity, format!("{}: {e}", self.id())))
    }

    /// Serial and sequence number.
    #[must_use]
    pub fn id(&self) -> MasterTokenId {
        MasterTokenId {
            serial_number: self.serial_number,
            sequence_number: self.sequence_number,
        }
    }

    /// Digest of the signed fields, for log lines.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::hash(&self.signing_data())
    }

    /// Serial number of the token line.
    #[must_use]
    pub fn serial_number(&self) -> u64 {
        self.serial_number
    }

    /// Sequence number within the line.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
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

    /// Identity of the issuing entity.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Identity of the entity this token authenticates.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
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

    /// The token signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
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

    /// Whether both tokens belong to the same line.
    #[must_use]
    pub fn same_line(&self, other: &Self) -> bool {
        self.serial_number == other.serial_number
    }

    /// Whether this token supersedes `other` in the same line.
    #[must_use]
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.same_line(other) && self.sequence_number > other.sequence_number
    }

    /// A builder for the next token in this line.
    ///
    /// Carries over serial number, issuer, identity and issuer data, and bumps
    /// the sequence number. Times restart from now with the default lifetimes.
    #[must_use]
    pub fn renewed(&self) -> MasterTokenBuilder {
        let mut builder = MasterTokenBuilder::new(&self.issuer, &self.identity)
            .serial_number(self.serial_number)
            .sequence_number(self.sequence_number.saturating_add(1));
        builder.issuer_data = self.issuer_data.clone();
        builder
    }
}

impl fmt::Display for MasterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.identity)
    }
}

/// Builder for master tokens.
#[derive(Debug, Clone)]
pub struct MasterTokenBuilder {
    issuer: String,
    identity: String,
    serial_number: u64,
    sequence_number: u64,
    issued_at: Option<Timestamp>,
    renewal_window: Option<Timestamp>,
    expiration: Option<Timestamp>,
    renew_after: Duration,
    ttl: Duration,
    issuer_data: Option<Value>,
}

impl MasterTokenBuilder {
    /// Create a new master token builder.
    #[must_use]
    pub fn new(issuer: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            identity: identity.into(),
            serial_number: 0,
            sequence_number: 0,
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

    /// Set the sequence number.
    #[must_use]
    pub fn sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = sequence_number;
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
    /// Returns [`MslError::Encoding`] if a number is out of range, the
    /// identity or issuer is empty, the expiration precedes the issue time or
    /// the renewal window is after the expiration.
    pub fn sign(self, issuer_key: &KeyPair) -> MslResult<MasterToken> {
        let issued_at = self.issued_at.unwrap_or_else(Timestamp::now);
        let mut token = MasterToken {
            serial_number: self.serial_number,
            sequence_number: self.sequence_number,
            issued_at,
            renewal_window: self
                .renewal_window
                .unwrap_or_else(|| issued_at.offset(self.renew_after)),
            expiration: self
                .expiration
                .unwrap_or_else(|| issued_at.offset(self.ttl)),
            issuer: self.issuer,
            identity: self.identity,
            issuer_data: self.issuer_data,
            issuer_key: issuer_key.public_key(),
            signature: Signature::from_bytes([0u8; 64]),
        };
        token.check()?;
        token.signature = issuer_key.sign(&token.signing_data());
        Ok(token)
    }
}
