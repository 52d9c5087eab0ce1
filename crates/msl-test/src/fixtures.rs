//! Test fixtures for tokens and stores.

use std::sync::Arc;

use msl_crypto::KeyPair;
use msl_schemes::SchemeContext;
use msl_store::{SimpleTrustStore, TrustStore};
use msl_tokens::{MasterToken, MslUser, ServiceToken, UserIdToken};

/// Issuer name used by every fixture token.
pub const TEST_ISSUER: &str = "test-issuer";

/// Entity identity used by every fixture master token.
pub const TEST_ENTITY: &str = "test-entity";

/// A deterministic issuer key pair. Every call returns the same key.
#[must_use]
pub fn test_keypair() -> KeyPair {
    KeyPair::from_secret_key(&[0x42; 32]).expect("32-byte secret")
}

/// A master token for `serial`:`seq`, issued to [`TEST_ENTITY`].
#[must_use]
pub fn master_token(serial: u64, seq: u64) -> MasterToken {
    MasterToken::builder(TEST_ISSUER, TEST_ENTITY)
        .serial_number(serial)
        .sequence_number(seq)
        .sign(&test_keypair())
        .expect("valid master token fixture")
}

/// A user-ID token with `serial` for `user`, bound to `master_token`.
#[must_use]
pub fn user_id_token(master_token: &MasterToken, serial: u64, user: &str) -> UserIdToken {
    UserIdToken::builder(master_token, MslUser::new(user))
        .serial_number(serial)
        .sign(&test_keypair())
        .expect("valid user ID token fixture")
}

/// A service token named `name` with optional bindings.
///
/// A user-ID token binding implies the master token binding it carries.
#[must_use]
pub fn service_token(
    name: &str,
    master_token: Option<&MasterToken>,
    user_id_token: Option<&UserIdToken>,
) -> ServiceToken {
    let mut builder = ServiceToken::builder(name, name.as_bytes().to_vec());
    if let Some(mt) = master_token {
        builder = builder.bound_to_master_token(mt);
    }
    if let Some(uit) = user_id_token {
        builder = builder.bound_to_user_id_token(uit);
    }
    builder
        .sign(&test_keypair())
        .expect("valid service token fixture")
}

/// An empty in-memory store behind the store interface.
#[must_use]
pub fn test_store() -> Arc<dyn TrustStore> {
    Arc::new(SimpleTrustStore::new())
}

/// A store holding `master_token(serial, 1)` and return both.
#[must_use]
pub fn store_with_master_token(serial: u64) -> (Arc<dyn TrustStore>, MasterToken) {
    let store = test_store();
    let mt = master_token(serial, 1);
    store
        .add_master_token(mt.clone())
        .expect("add master token fixture");
    (store, mt)
}

/// A scheme context for [`TEST_ENTITY`] over `store`.
#[must_use]
pub fn test_context(store: Arc<dyn TrustStore>) -> SchemeContext {
    SchemeContext::new(TEST_ENTITY, store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_consistent() {
        let mt = master_token(3, 2);
        assert_eq!(mt.serial_number(), 3);
        assert_eq!(mt.sequence_number(), 2);
        assert!(mt.verify(&test_keypair().public_key()).is_ok());

        let uit = user_id_token(&mt, 9, "alice");
        assert!(uit.is_bound_to(&mt));

        let st = service_token("prefs", Some(&mt), Some(&uit));
        assert!(st.is_bound_to_master_token(&mt));
        assert!(st.is_bound_to_user_id_token(&uit));
        assert!(service_token("anon", None, None).is_unbound());
    }

    #[test]
    fn test_store_with_master_token() {
        let (store, mt) = store_with_master_token(4);
        assert_eq!(store.get_master_token().unwrap(), Some(mt));
    }
}
