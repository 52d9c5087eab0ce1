//! Cryptographic error types.

use thiserror::Error;

use crate::context::CryptoOperation;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid signature length.
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid public key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// The context holds no private key, so it cannot sign.
    #[error("crypto context {context} has no private key")]
    MissingPrivateKey {
        /// Context identifier.
        context: String,
    },

    /// The context does not implement the requested operation.
    #[error("crypto context {context} does not support {operation}")]
    UnsupportedOperation {
        /// Context identifier.
        context: String,
        /// Requested operation.
        operation: CryptoOperation,
    },

    /// Invalid base64 encoding.
    #[error("invalid base64 encoding")]
    InvalidBase64Encoding,
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
