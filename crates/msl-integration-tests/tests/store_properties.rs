//! Trust store properties exercised across the token, store and snapshot
//! crates.

#![allow(clippy::arithmetic_side_effects)]

use std::collections::BTreeSet;
use std::sync::Arc;

use msl_core::{ErrorKind, MslError};
use msl_crypto::SharedCryptoContext;
use msl_store::{
    LoggingTrustStore, MemorySnapshotBackend, SimpleTrustStore, StoreOptions, TrustStore,
    load_store, save_store,
};
use msl_test::{RecordingCryptoContext, master_token, service_token, user_id_token};
use msl_tokens::MasterToken;
use msl_tokens::wire;

fn context(id: &str) -> SharedCryptoContext {
    RecordingCryptoContext::shared(id).0
}

#[test]
fn master_token_survives_the_wire() {
    for (serial, seq) in [(0, 0), (1, 1), (42, 7), (msl_core::MAX_LONG_VALUE, 3)] {
        let mt = master_token(serial, seq);
        let decoded: MasterToken = wire::decode(&wire::encode(&mt).unwrap()).unwrap();

        assert_eq!(decoded, mt);
        assert_eq!(decoded.id(), mt.id());
        assert_eq!(decoded.identity(), mt.identity());
        assert_eq!(decoded.expiration(), mt.expiration());
        assert!(decoded.verify(&msl_test::test_keypair().public_key()).is_ok());
    }
}

#[test]
fn concurrent_non_replayable_ids_are_gapless() {
    const THREADS: usize = 8;
    const CALLS_PER_THREAD: usize = 200;

    let store = Arc::new(SimpleTrustStore::new());
    let mt = master_token(1, 1);
    store.add_master_token(mt.clone()).unwrap();

    let ids: Vec<u64> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = Arc::clone(&store);
                let mt = &mt;
                s.spawn(move || {
                    (0..CALLS_PER_THREAD)
                        .map(|_| store.non_replayable_id(mt).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let total = THREADS * CALLS_PER_THREAD;
    let distinct: BTreeSet<u64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), total);
    assert_eq!(distinct.len(), total);
    assert_eq!(distinct.first(), Some(&0));
    assert_eq!(distinct.last(), Some(&(total as u64 - 1)));
}

#[test]
fn user_id_token_without_master_token_is_rejected() {
    let store = SimpleTrustStore::new();
    let present = master_token(1, 1);
    store.add_master_token(present.clone()).unwrap();
    store
        .add_user_id_token("alice", user_id_token(&present, 10, "alice"))
        .unwrap();

    let absent = master_token(2, 1);
    let err = store
        .add_user_id_token("bob", user_id_token(&absent, 11, "bob"))
        .unwrap_err();

    assert!(matches!(
        err,
        MslError::MasterTokenNotFound {
            user_id_token_serial: 11,
            bound_master_serial: 2
        }
    ));
    assert_eq!(err.kind(), ErrorKind::UserAuthentication);
    assert!(store.get_user_id_token("bob").unwrap().is_none());
    assert!(store.get_user_id_token("alice").unwrap().is_some());
}

#[test]
fn crypto_context_last_write_wins() {
    let store = SimpleTrustStore::new();
    let mt = master_token(1, 1);
    store.add_master_token(mt.clone()).unwrap();

    store.set_crypto_context(&mt, context("first")).unwrap();
    store.set_crypto_context(&mt, context("second")).unwrap();

    let ctx = store.get_crypto_context(&mt).unwrap().unwrap();
    assert_eq!(ctx.id(), "second");
}

#[test]
fn counter_continues_across_renewal() {
    let store = LoggingTrustStore::new(SimpleTrustStore::new());
    let mt1 = master_token(1, 1);
    store.add_master_token(mt1.clone()).unwrap();
    store.set_crypto_context(&mt1, context("ctx1")).unwrap();

    let ids: Vec<u64> = (0..3)
        .map(|_| store.non_replayable_id(&mt1).unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);

    let renewed = master_token(1, 2);
    store.add_master_token(renewed.clone()).unwrap();
    store.set_crypto_context(&renewed, context("ctx1'")).unwrap();

    assert_eq!(store.non_replayable_id(&renewed).unwrap(), 3);
    assert_eq!(store.get_master_token().unwrap(), Some(renewed.clone()));
    assert_eq!(
        store.get_crypto_context(&renewed).unwrap().unwrap().id(),
        "ctx1'"
    );
}

#[test]
fn counter_starts_at_configured_floor() {
    let store = SimpleTrustStore::with_options(StoreOptions {
        non_replayable_floor: 100,
    })
    .unwrap();
    let mt = master_token(5, 1);
    store.add_master_token(mt.clone()).unwrap();

    assert_eq!(store.non_replayable_id(&mt).unwrap(), 100);
    assert_eq!(store.non_replayable_id(&mt).unwrap(), 101);
}

#[test]
fn removing_and_clearing_crypto_contexts() {
    let store = SimpleTrustStore::new();
    let tokens: Vec<MasterToken> = (1..=3).map(|serial| master_token(serial, 1)).collect();
    for mt in &tokens {
        store.add_master_token(mt.clone()).unwrap();
        store
            .set_crypto_context(mt, context(&format!("ctx{}", mt.serial_number())))
            .unwrap();
    }

    store.remove_crypto_context(&tokens[0]).unwrap();
    assert!(store.get_crypto_context(&tokens[0]).unwrap().is_none());
    assert!(store.get_crypto_context(&tokens[1]).unwrap().is_some());

    store.clear_crypto_contexts().unwrap();
    for mt in &tokens {
        assert!(store.get_crypto_context(mt).unwrap().is_none());
    }
    // Tokens themselves are untouched.
    assert_eq!(store.master_tokens().unwrap().len(), 3);
}

#[test]
fn empty_store_roundtrips_through_snapshot() {
    let backend = MemorySnapshotBackend::new();
    save_store(&SimpleTrustStore::new(), &backend).unwrap();

    let loaded = load_store(&backend, StoreOptions::default()).unwrap();
    assert!(loaded.get_master_token().unwrap().is_none());
    assert!(loaded.master_tokens().unwrap().is_empty());
    assert!(loaded.snapshot().unwrap().is_empty());
}

#[test]
fn populated_store_reloads_without_crypto_contexts() {
    let store = SimpleTrustStore::new();
    let mt = master_token(7, 1);
    let uit = user_id_token(&mt, 70, "alice");
    store.add_master_token(mt.clone()).unwrap();
    store.set_crypto_context(&mt, context("session")).unwrap();
    store.add_user_id_token("alice", uit.clone()).unwrap();
    store
        .add_service_tokens(vec![
            service_token("prefs", Some(&mt), Some(&uit)),
            service_token("locale", None, None),
        ])
        .unwrap();
    store.non_replayable_id(&mt).unwrap();

    let backend = MemorySnapshotBackend::new();
    save_store(&store, &backend).unwrap();
    let loaded = load_store(&backend, StoreOptions::default()).unwrap();

    assert_eq!(loaded.get_master_token().unwrap(), Some(mt.clone()));
    assert_eq!(loaded.get_user_id_token("alice").unwrap(), Some(uit.clone()));
    assert_eq!(
        loaded.get_service_tokens(Some(&mt), Some(&uit)).unwrap().len(),
        2
    );
    assert!(loaded.get_crypto_context(&mt).unwrap().is_none());
    assert_eq!(loaded.non_replayable_id(&mt).unwrap(), 1);
}

#[test]
fn removing_master_token_drops_dependents() {
    let store = SimpleTrustStore::new();
    let mt = master_token(1, 1);
    let uit = user_id_token(&mt, 2, "alice");
    store.add_master_token(mt.clone()).unwrap();
    store.set_crypto_context(&mt, context("ctx")).unwrap();
    store.add_user_id_token("alice", uit.clone()).unwrap();
    store
        .add_service_tokens(vec![service_token("bound", Some(&mt), None)])
        .unwrap();

    store.remove_master_token(&mt).unwrap();

    assert!(store.get_master_token().unwrap().is_none());
    assert!(store.get_crypto_context(&mt).unwrap().is_none());
    assert!(store.get_user_id_token("alice").unwrap().is_none());
    assert!(store.get_service_tokens(Some(&mt), None).unwrap().is_empty());
}

#[test]
fn user_id_token_renewal_drops_old_bound_service_tokens() {
    let store = SimpleTrustStore::new();
    let mt = master_token(1, 1);
    let uit1 = user_id_token(&mt, 1, "alice");
    store.add_master_token(mt.clone()).unwrap();
    store.add_user_id_token("alice", uit1.clone()).unwrap();
    store
        .add_service_tokens(vec![service_token("session", Some(&mt), Some(&uit1))])
        .unwrap();

    let uit2 = user_id_token(&mt, 2, "alice");
    store.add_user_id_token("alice", uit2.clone()).unwrap();

    assert_eq!(store.get_user_id_token("alice").unwrap(), Some(uit2));
    assert!(
        store
            .get_service_tokens(Some(&mt), Some(&uit1))
            .unwrap()
            .is_empty()
    );

    let backend = MemorySnapshotBackend::new();
    save_store(&store, &backend).unwrap();
    let loaded = load_store(&backend, StoreOptions::default()).unwrap();
    assert!(loaded.get_user_id_token("alice").unwrap().is_some());
    assert!(loaded.snapshot().unwrap().service_tokens.is_empty());
}
