//! The crypto context capability.
//!
//! A crypto context performs cryptographic operations with one derived key
//! set. The trust store caches one context per master token serial number;
//! contexts are never serialized.

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::hash::ContentHash;
use crate::keypair::{KeyPair, PublicKey};
use crate::signature::Signature;

/// Domain separation label for MAC keys derived from shared secrets.
const MAC_KEY_DOMAIN: &str = "msl-trust 2024 mac context key";

/// Operations a crypto context may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptoOperation {
    /// Encrypt application data.
    Encrypt,
    /// Decrypt application data.
    Decrypt,
    /// Wrap key material.
    Wrap,
    /// Unwrap key material.
    Unwrap,
    /// Sign data.
    Sign,
    /// Verify a signature.
    Verify,
}

impl fmt::Display for CryptoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Wrap => "wrap",
            Self::Unwrap => "unwrap",
            Self::Sign => "sign",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Capability object performing cryptographic operations over one key set.
///
/// Implementations must be cheap to share: the trust store hands out
/// [`SharedCryptoContext`] handles and never clones the key material.
pub trait CryptoContext: Send + Sync + fmt::Debug {
    /// Identifier used in diagnostics. Never contains key material.
    fn id(&self) -> &str;

    /// Encrypt `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedOperation`] if the context cannot encrypt.
    fn encrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Decrypt `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedOperation`] if the context cannot decrypt.
    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Wrap key material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedOperation`] if the context cannot wrap.
    fn wrap_key(&self, key: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Unwrap key material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedOperation`] if the context cannot unwrap.
    fn unwrap_key(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Sign `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the context holds no signing key.
    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Check `signature` over `data`. A well-formed but wrong signature is
    /// `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot verify at all.
    fn verify(&self, data: &[u8], signature: &[u8]) -> CryptoResult<bool>;
}

/// Shared handle to a crypto context.
pub type SharedCryptoContext = Arc<dyn CryptoContext>;

fn unsupported<T>(context: &str, operation: CryptoOperation) -> CryptoResult<T> {
    Err(CryptoError::UnsupportedOperation {
        context: context.to_string(),
        operation,
    })
}

/// A context that performs no cryptography.
///
/// Encryption and wrapping are the identity, signatures are empty and every
/// signature verifies. Used for unauthenticated entities on trusted networks.
#[derive(Debug, Clone)]
pub struct NullCryptoContext {
    id: String,
}

impl NullCryptoContext {
    /// Create a null context labelled `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for NullCryptoContext {
    fn default() -> Self {
        Self::new("null")
    }
}

impl CryptoContext for NullCryptoContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn encrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn wrap_key(&self, key: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(key.to_vec())
    }

    fn unwrap_key(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn sign(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn verify(&self, _data: &[u8], _signature: &[u8]) -> CryptoResult<bool> {
        Ok(true)
    }
}

/// Ed25519 sign/verify context.
///
/// Built either from a full [`KeyPair`] (local entity, can sign) or from a
/// remote entity's [`PublicKey`] (verify only).
pub struct SigningCryptoContext {
    id: String,
    keypair: Option<KeyPair>,
    public_key: PublicKey,
}

impl SigningCryptoContext {
    /// Context that can sign and verify.
    #[must_use]
    pub fn new(id: impl Into<String>, keypair: KeyPair) -> Self {
        let public_key = keypair.public_key();
        Self {
            id: id.into(),
            keypair: Some(keypair),
            public_key,
        }
    }

    /// Context that can only verify.
    #[must_use]
    pub fn verify_only(id: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            id: id.into(),
            keypair: None,
            public_key,
        }
    }

    /// The verification key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Whether this context holds a private key.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.keypair.is_some()
    }
}

impl fmt::Debug for SigningCryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCryptoContext")
            .field("id", &self.id)
            .field("public_key", &self.public_key)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

impl CryptoContext for SigningCryptoContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn encrypt(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Encrypt)
    }

    fn decrypt(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Decrypt)
    }

    fn wrap_key(&self, _key: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Wrap)
    }

    fn unwrap_key(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Unwrap)
    }

    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let keypair = self
            .keypair
            .as_ref()
            .ok_or_else(|| CryptoError::MissingPrivateKey {
                context: self.id.clone(),
            })?;
        Ok(keypair.sign(data).as_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        let Ok(signature) = Signature::try_from_slice(signature) else {
            return Ok(false);
        };
        match self.public_key.verify(data, &signature) {
            Ok(()) => Ok(true),
            Err(CryptoError::SignatureVerificationFailed) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Keyed BLAKE3 MAC context for session integrity.
pub struct MacCryptoContext {
    id: String,
    key: Zeroizing<[u8; 32]>,
}

impl MacCryptoContext {
    /// Context using `key` directly.
    #[must_use]
    pub fn new(id: impl Into<String>, key: [u8; 32]) -> Self {
        Self {
            id: id.into(),
            key: Zeroizing::new(key),
        }
    }

    /// Context keyed by a MAC key derived from shared secret material.
    #[must_use]
    pub fn derive(id: impl Into<String>, secret: &[u8]) -> Self {
        Self::new(id, *ContentHash::derive(MAC_KEY_DOMAIN, secret).as_bytes())
    }
}

impl fmt::Debug for MacCryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacCryptoContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl CryptoContext for MacCryptoContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn encrypt(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Encrypt)
    }

    fn decrypt(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Decrypt)
    }

    fn wrap_key(&self, _key: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Wrap)
    }

    fn unwrap_key(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        unsupported(&self.id, CryptoOperation::Unwrap)
    }

    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(blake3::keyed_hash(&self.key, data).as_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        let expected = blake3::keyed_hash(&self.key, data);
        Ok(expected.as_bytes()[..].ct_eq(signature).into())
    }
}
