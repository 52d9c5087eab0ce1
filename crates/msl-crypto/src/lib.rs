//! MSL Crypto - the crypto context capability and the primitives behind it.
//!
//! This crate provides:
//! - The [`CryptoContext`] capability (encrypt, decrypt, wrap, unwrap, sign,
//!   verify) that the trust store caches per master token
//! - Reference contexts: [`NullCryptoContext`], [`SigningCryptoContext`] and
//!   [`MacCryptoContext`]
//! - Ed25519 key pairs and signatures used to sign issued tokens
//! - BLAKE3 content hashing for token fingerprints and key derivation
//!
//! Concrete ciphers (AES, RSA, ECC, Diffie-Hellman) are supplied by scheme
//! plugins implementing [`CryptoContext`]; nothing in the trust core calls an
//! algorithm-specific API.
//!
//! # Example
//!
//! ```
//! use msl_crypto::{CryptoContext, KeyPair, SigningCryptoContext};
//!
//! let ctx = SigningCryptoContext::new("entity-1", KeyPair::generate());
//! let sig = ctx.sign(b"payload").unwrap();
//! assert!(ctx.verify(b"payload", &sig).unwrap());
//! assert!(ctx.encrypt(b"payload").is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod hash;
mod keypair;
mod signature;

pub use context::{
    CryptoContext, CryptoOperation, MacCryptoContext, NullCryptoContext, SharedCryptoContext,
    SigningCryptoContext,
};
pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
