//! Error taxonomy for the trust-management core.
//!
//! Every failure raised by the token model, the trust store and the scheme
//! resolver is an [`MslError`]. Callers that only need to branch on the
//! broad category use [`MslError::kind`].

use std::fmt;

use thiserror::Error;

/// The three independent scheme families a resolver routes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeFamily {
    /// Entity authentication schemes.
    EntityAuthentication,
    /// User authentication schemes.
    UserAuthentication,
    /// Key exchange schemes.
    KeyExchange,
}

impl fmt::Display for SchemeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntityAuthentication => write!(f, "entity authentication"),
            Self::UserAuthentication => write!(f, "user authentication"),
            Self::KeyExchange => write!(f, "key exchange"),
        }
    }
}

/// Broad error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token or authentication data structure.
    Encoding,
    /// Entity authentication failed or is misconfigured.
    EntityAuthentication,
    /// User authentication failed, including user-ID token mismatches.
    UserAuthentication,
    /// Key exchange failed or the mechanism is unsupported.
    KeyExchange,
    /// Durable snapshot unreadable, unwritable or version-incompatible.
    Persistence,
    /// Requested scheme or setting absent from the active configuration.
    Configuration,
    /// A crypto context operation failed.
    Crypto,
    /// Unrecoverable condition; the operation was aborted.
    Fatal,
    /// Internal failure such as a poisoned lock.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Encoding => "encoding",
            Self::EntityAuthentication => "entity-authentication",
            Self::UserAuthentication => "user-authentication",
            Self::KeyExchange => "key-exchange",
            Self::Persistence => "persistence",
            Self::Configuration => "configuration",
            Self::Crypto => "crypto",
            Self::Fatal => "fatal",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Errors raised by the trust-management core.
#[derive(Debug, Error)]
pub enum MslError {
    // Encoding
    /// A token or authentication data structure is malformed.
    #[error("encoding error: {message}")]
    Encoding {
        /// What was wrong with the structure.
        message: String,
    },

    /// Two tokens share identity fields but differ in payload.
    #[error("{token} identity collision: identity fields match a stored token but payload differs")]
    IdentityCollision {
        /// Display form of the offending token identity.
        token: String,
    },

    /// A token references a master token or user-ID token absent from the store.
    #[error("{token} is bound to {binding}, which is not in the store")]
    BindingNotFound {
        /// Display form of the token being added.
        token: String,
        /// Display form of the missing binding.
        binding: String,
    },

    // Entity authentication
    /// Entity authentication failed.
    #[error("entity authentication failed ({scheme}): {message}")]
    EntityAuth {
        /// Scheme name.
        scheme: String,
        /// Failure detail.
        message: String,
    },

    /// A master token older than the stored one for the same serial number was offered.
    #[error(
        "stale master token: serial {serial_number} sequence {offered} is older than stored sequence {stored}"
    )]
    StaleMasterToken {
        /// Serial number shared by both tokens.
        serial_number: u64,
        /// Sequence number that was offered.
        offered: u64,
        /// Sequence number already stored.
        stored: u64,
    },

    // User authentication
    /// User authentication failed.
    #[error("user authentication failed ({scheme}): {message}")]
    UserAuth {
        /// Scheme name.
        scheme: String,
        /// Failure detail.
        message: String,
    },

    /// A user-ID token was presented alongside a master token of another line.
    #[error(
        "user ID token {user_id_token_serial} is bound to master token {bound_master_serial}, not {master_serial}"
    )]
    TokenMismatch {
        /// Serial number of the user-ID token.
        user_id_token_serial: u64,
        /// Master token serial number the user-ID token was issued under.
        bound_master_serial: u64,
        /// Master token serial number it was presented with.
        master_serial: u64,
    },

    /// A user-ID token's master token is not present in the store.
    #[error("user ID token {user_id_token_serial} is bound to master token {bound_master_serial}, which is not in the store")]
    MasterTokenNotFound {
        /// Serial number of the user-ID token.
        user_id_token_serial: u64,
        /// Master token serial number the user-ID token was issued under.
        bound_master_serial: u64,
    },

    // Key exchange
    /// Key exchange failed.
    #[error("key exchange failed ({scheme}): {message}")]
    KeyExchange {
        /// Scheme name.
        scheme: String,
        /// Failure detail.
        message: String,
    },

    // Persistence
    /// The durable snapshot could not be read or written.
    #[error("trust store persistence error: {0}")]
    Persistence(String),

    /// The durable snapshot was written by an incompatible format version.
    #[error("incompatible snapshot version {found}; this build reads {expected}")]
    SnapshotVersion {
        /// Version found in the snapshot.
        found: String,
        /// Version this build understands.
        expected: String,
    },

    // Configuration
    /// The requested scheme is not registered.
    #[error("unsupported {family} scheme {scheme}; supported: {supported:?}")]
    SchemeNotSupported {
        /// Scheme family that was searched.
        family: SchemeFamily,
        /// Requested scheme name.
        scheme: String,
        /// Registered scheme names.
        supported: Vec<String>,
    },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    // Crypto
    /// A crypto context operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    // Fatal
    /// The non-replayable ID counter for a serial number is exhausted.
    #[error("non-replayable ID space exhausted for master token serial {serial_number}")]
    CounterExhausted {
        /// Master token serial number.
        serial_number: u64,
    },

    // Internal
    /// Internal failure, e.g. a poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MslError {
    /// Shorthand for an [`MslError::Encoding`] error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Shorthand for an [`MslError::EntityAuth`] error.
    pub fn entity_auth(scheme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EntityAuth {
            scheme: scheme.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an [`MslError::UserAuth`] error.
    pub fn user_auth(scheme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UserAuth {
            scheme: scheme.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an [`MslError::KeyExchange`] error.
    pub fn key_exchange(scheme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KeyExchange {
            scheme: scheme.into(),
            message: message.into(),
        }
    }

    /// The broad category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encoding { .. }
            | Self::IdentityCollision { .. }
            | Self::BindingNotFound { .. } => ErrorKind::Encoding,
            Self::EntityAuth { .. } | Self::StaleMasterToken { .. } => {
                ErrorKind::EntityAuthentication
            },
            Self::UserAuth { .. }
            | Self::TokenMismatch { .. }
            | Self::MasterTokenNotFound { .. } => ErrorKind::UserAuthentication,
            Self::KeyExchange { .. } => ErrorKind::KeyExchange,
            Self::Persistence(_) | Self::SnapshotVersion { .. } => ErrorKind::Persistence,
            Self::SchemeNotSupported { .. } | Self::Configuration(_) => ErrorKind::Configuration,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::CounterExhausted { .. } => ErrorKind::Fatal,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call can succeed without changing its input.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Whether the error is unrecoverable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Result type for trust-management operations.
pub type MslResult<T> = Result<T, MslError>;
