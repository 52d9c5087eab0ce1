//! Crypto context cache.
//!
//! One slot per master token serial number. Renewing a master token keeps its
//! serial number, so the renewed token reuses the slot and must re-`set` it.

use std::collections::HashMap;

use msl_crypto::SharedCryptoContext;

/// Crypto contexts keyed by master token serial number.
///
/// Not synchronized on its own; the trust store guards it with its lock.
#[derive(Debug, Default, Clone)]
pub struct CryptoContextCache {
    contexts: HashMap<u64, SharedCryptoContext>,
}

impl CryptoContextCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `context` with `serial_number`, returning the context it replaced.
    pub fn set(
        &mut self,
        serial_number: u64,
        context: SharedCryptoContext,
    ) -> Option<SharedCryptoContext> {
        self.contexts.insert(serial_number, context)
    }

    /// The context for `serial_number`, if any. A miss is not an error.
    #[must_use]
    pub fn get(&self, serial_number: u64) -> Option<SharedCryptoContext> {
        self.contexts.get(&serial_number).cloned()
    }

    /// Remove the context for `serial_number`, returning it.
    pub fn remove(&mut self, serial_number: u64) -> Option<SharedCryptoContext> {
        self.contexts.remove(&serial_number)
    }

    /// Remove every context.
    pub fn clear(&mut self) {
        self.contexts.clear();
    }

    /// Number of cached contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
