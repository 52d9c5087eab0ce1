//! Scheme registries.

use std::sync::Arc;

use msl_core::{MslError, MslResult, SchemeFamily};
use tracing::debug;

use crate::factory::{EntityAuthFactory, KeyExchangeFactory, SchemeFactory, UserAuthFactory};

/// Factories of one scheme family, keyed by scheme name.
///
/// Registration order is kept so diagnostics list schemes in a stable order.
pub struct SchemeRegistry<F: ?Sized> {
    family: SchemeFamily,
    factories: Vec<Arc<F>>,
}

/// Entity authentication factories.
pub type EntityAuthRegistry = SchemeRegistry<dyn EntityAuthFactory>;

/// User authentication factories.
pub type UserAuthRegistry = SchemeRegistry<dyn UserAuthFactory>;

/// Key exchange factories.
pub type KeyExchangeRegistry = SchemeRegistry<dyn KeyExchangeFactory>;

impl<F: ?Sized + SchemeFactory> SchemeRegistry<F> {
    /// Create an empty registry for `family`.
    #[must_use]
    pub fn new(family: SchemeFamily) -> Self {
        Self {
            family,
            factories: Vec::new(),
        }
    }

    /// The family this registry serves.
    #[must_use]
    pub fn family(&self) -> SchemeFamily {
        self.family
    }

    /// Register a factory.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Configuration`] if a factory for the same scheme is
    /// already registered.
    pub fn register(&mut self, factory: Arc<F>) -> MslResult<()> {
        let scheme = factory.scheme().to_string();
        if self.contains(&scheme) {
            return Err(MslError::Configuration(format!(
                "{} scheme {scheme} is already registered",
                self.family
            )));
        }
        debug!(family = %self.family, scheme = %scheme, "Registered scheme factory");
        self.factories.push(factory);
        Ok(())
    }

    /// The factory for `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::SchemeNotSupported`] listing the registered schemes
    /// if `scheme` is unknown.
    pub fn get(&self, scheme: &str) -> MslResult<Arc<F>> {
        self.find(scheme)
            .ok_or_else(|| MslError::SchemeNotSupported {
                family: self.family,
                scheme: scheme.to_string(),
                supported: self.names(),
            })
    }

    /// The factory for `scheme`, if registered.
    #[must_use]
    pub fn find(&self, scheme: &str) -> Option<Arc<F>> {
        self.factories
            .iter()
            .find(|f| f.scheme() == scheme)
            .cloned()
    }

    /// Whether `scheme` is registered.
    #[must_use]
    pub fn contains(&self, scheme: &str) -> bool {
        self.factories.iter().any(|f| f.scheme() == scheme)
    }

    /// Registered scheme names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.factories
            .iter()
            .map(|f| f.scheme().to_string())
            .collect()
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factories are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<F: ?Sized> std::fmt::Debug for SchemeRegistry<F>
where
    F: SchemeFactory,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeRegistry")
            .field("family", &self.family)
            .field("schemes", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msl_core::ErrorKind;

    struct Named(&'static str);

    impl SchemeFactory for Named {
        fn scheme(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry: SchemeRegistry<dyn SchemeFactory> =
            SchemeRegistry::new(SchemeFamily::EntityAuthentication);
        registry.register(Arc::new(Named("PSK"))).unwrap();
        registry.register(Arc::new(Named("RSA"))).unwrap();

        assert_eq!(registry.get("RSA").unwrap().scheme(), "RSA");
        assert_eq!(registry.names(), vec!["PSK", "RSA"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_rejects_duplicate() {
        let mut registry: SchemeRegistry<dyn SchemeFactory> =
            SchemeRegistry::new(SchemeFamily::UserAuthentication);
        registry.register(Arc::new(Named("EMAIL_PASSWORD"))).unwrap();
        let err = registry
            .register(Arc::new(Named("EMAIL_PASSWORD")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_unknown_scheme_lists_alternatives() {
        let mut registry: SchemeRegistry<dyn SchemeFactory> =
            SchemeRegistry::new(SchemeFamily::KeyExchange);
        registry.register(Arc::new(Named("A"))).unwrap();
        registry.register(Arc::new(Named("B"))).unwrap();

        match registry.get("C") {
            Err(MslError::SchemeNotSupported {
                family,
                scheme,
                supported,
            }) => {
                assert_eq!(family, SchemeFamily::KeyExchange);
                assert_eq!(scheme, "C");
                assert_eq!(supported, vec!["A", "B"]);
            },
            Err(other) => panic!("expected SchemeNotSupported, got {other}"),
            Ok(_) => panic!("expected SchemeNotSupported"),
        }
        assert!(registry.find("C").is_none());
    }
}
