//! In-memory trust store.
//!
//! All state sits behind one [`RwLock`]. Mutations take the write lock for
//! their whole duration, so a reader never sees a half-applied change.
//! Non-replayable IDs are issued under the read lock through an atomic
//! counter; only the first ID for a serial number takes the write lock to
//! create its counter.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use msl_core::{MAX_LONG_VALUE, MslError, MslResult, check_range};
use msl_crypto::SharedCryptoContext;
use msl_tokens::{MasterToken, ServiceToken, UserIdToken};
use tracing::{debug, warn};

use crate::cache::CryptoContextCache;
use crate::counter::NonReplayableCounter;
use crate::snapshot::StoreSnapshot;
use crate::store::TrustStore;

/// Construction options for [`SimpleTrustStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// First non-replayable ID issued for a serial number with no saved counter.
    pub non_replayable_floor: u64,
}

/// Service token key: name plus its master token and user-ID token bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceTokenKey {
    /// Token name.
    pub name: String,
    /// Bound master token serial number, `None` if unbound.
    pub master_token_serial_number: Option<u64>,
    /// Bound user-ID token serial number, `None` if unbound.
    pub user_id_token_serial_number: Option<u64>,
}

impl From<&ServiceToken> for ServiceTokenKey {
    fn from(token: &ServiceToken) -> Self {
        Self {
            name: token.name().to_string(),
            master_token_serial_number: token.master_token_serial_number(),
            user_id_token_serial_number: token.user_id_token_serial_number(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    master_tokens: BTreeMap<u64, MasterToken>,
    crypto_contexts: CryptoContextCache,
    user_id_tokens: HashMap<String, UserIdToken>,
    service_tokens: BTreeMap<ServiceTokenKey, ServiceToken>,
    counters: HashMap<u64, NonReplayableCounter>,
}

impl StoreState {
    /// Drop every service token bound to user-ID token `serial_number`.
    fn drop_user_bound_service_tokens(&mut self, serial_number: u64) {
        self.service_tokens
            .retain(|key, _| key.user_id_token_serial_number != Some(serial_number));
    }

    fn find_user_id_token(&self, serial_number: u64) -> Option<&UserIdToken> {
        self.user_id_tokens
            .values()
            .find(|t| t.serial_number() == serial_number)
    }

    /// Check every binding of `token` resolves to a stored token.
    fn check_service_token_bindings(&self, token: &ServiceToken) -> MslResult<()> {
        if let Some(serial) = token.master_token_serial_number()
            && !self.master_tokens.contains_key(&serial)
        {
            return Err(MslError::BindingNotFound {
                token: token.to_string(),
                binding: format!("master token {serial}"),
            });
        }
        if let Some(serial) = token.user_id_token_serial_number() {
            let Some(uit) = self.find_user_id_token(serial) else {
                return Err(MslError::BindingNotFound {
                    token: token.to_string(),
                    binding: format!("user ID token {serial}"),
                });
            };
            let master_serial = token.master_token_serial_number().unwrap_or_default();
            if uit.master_token_serial_number() != master_serial {
                return Err(MslError::TokenMismatch {
                    user_id_token_serial: serial,
                    bound_master_serial: uit.master_token_serial_number(),
                    master_serial,
                });
            }
        }
        Ok(())
    }
}

/// The in-memory [`TrustStore`].
#[derive(Debug, Default)]
pub struct SimpleTrustStore {
    state: RwLock<StoreState>,
    options: StoreOptions,
}

impl SimpleTrustStore {
    /// Create an empty store with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Configuration`] if the non-replayable floor is out
    /// of range.
    pub fn with_options(options: StoreOptions) -> MslResult<Self> {
        check_range("non-replayable floor", options.non_replayable_floor)
            .map_err(|e| MslError::Configuration(e.to_string()))?;
        Ok(Self {
            state: RwLock::new(StoreState::default()),
            options,
        })
    }

    /// Rebuild a store from a snapshot. Crypto contexts start out absent.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Persistence`] if the snapshot breaks a store
    /// invariant: duplicate master token lines, a user-ID token or service
    /// token without its master token, or a counter out of range.
    pub fn from_snapshot(snapshot: StoreSnapshot, options: StoreOptions) -> MslResult<Self> {
        let store = Self::with_options(options)?;
        let invalid = |e: MslError| MslError::Persistence(format!("invalid snapshot: {e}"));
        {
            let mut state = store.write()?;

            for mt in snapshot.master_tokens {
                let serial = mt.serial_number();
                if state.master_tokens.insert(serial, mt).is_some() {
                    return Err(MslError::Persistence(format!(
                        "invalid snapshot: duplicate master token {serial}"
                    )));
                }
            }

            for (user_id, uit) in snapshot.user_id_tokens {
                if !state
                    .master_tokens
                    .contains_key(&uit.master_token_serial_number())
                {
                    return Err(invalid(MslError::MasterTokenNotFound {
                        user_id_token_serial: uit.serial_number(),
                        bound_master_serial: uit.master_token_serial_number(),
                    }));
                }
                state.user_id_tokens.insert(user_id, uit);
            }

            for st in snapshot.service_tokens {
                state.check_service_token_bindings(&st).map_err(invalid)?;
                state.service_tokens.insert(ServiceTokenKey::from(&st), st);
            }

            for (serial, next) in snapshot.non_replayable_ids {
                // One past the maximum marks an exhausted counter.
                if next > MAX_LONG_VALUE.saturating_add(1) {
                    return Err(MslError::Persistence(format!(
                        "invalid snapshot: non-replayable ID {next} for master token {serial} is out of range"
                    )));
                }
                state
                    .counters
                    .insert(serial, NonReplayableCounter::new(serial, next));
            }
        }
        Ok(store)
    }

    /// The options this store was built with.
    #[must_use]
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    fn read(&self) -> MslResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| MslError::Internal(format!("trust store lock poisoned: {e}")))
    }

    fn write(&self) -> MslResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| MslError::Internal(format!("trust store lock poisoned: {e}")))
    }
}

impl TrustStore for SimpleTrustStore {
    fn set_crypto_context(
        &self,
        master_token: &MasterToken,
        context: SharedCryptoContext,
    ) -> MslResult<()> {
        let mut state = self.write()?;
        if let Some(previous) = state
            .crypto_contexts
            .set(master_token.serial_number(), context)
        {
            debug!(
                serial_number = master_token.serial_number(),
                replaced = previous.id(),
                "Crypto context replaced"
            );
        }
        Ok(())
    }

    fn get_crypto_context(
        &self,
        master_token: &MasterToken,
    ) -> MslResult<Option<SharedCryptoContext>> {
        Ok(self
            .read()?
            .crypto_contexts
            .get(master_token.serial_number()))
    }

    fn remove_crypto_context(&self, master_token: &MasterToken) -> MslResult<()> {
        self.write()?
            .crypto_contexts
            .remove(master_token.serial_number());
        Ok(())
    }

    fn clear_crypto_contexts(&self) -> MslResult<()> {
        self.write()?.crypto_contexts.clear();
        Ok(())
    }

    fn add_master_token(&self, master_token: MasterToken) -> MslResult<()> {
        let mut state = self.write()?;
        let serial = master_token.serial_number();

        if let Some(stored) = state.master_tokens.get(&serial) {
            if stored.sequence_number() > master_token.sequence_number() {
                warn!(
                    serial_number = serial,
                    offered = master_token.sequence_number(),
                    stored = stored.sequence_number(),
                    "Rejected stale master token"
                );
                return Err(MslError::StaleMasterToken {
                    serial_number: serial,
                    offered: master_token.sequence_number(),
                    stored: stored.sequence_number(),
                });
            }
            if stored.sequence_number() == master_token.sequence_number() {
                if *stored == master_token {
                    return Ok(());
                }
                return Err(MslError::IdentityCollision {
                    token: master_token.id().to_string(),
                });
            }
        }

        state.master_tokens.insert(serial, master_token);
        Ok(())
    }

    fn get_master_token(&self) -> MslResult<Option<MasterToken>> {
        Ok(self
            .read()?
            .master_tokens
            .values()
            .max_by_key(|mt| (mt.renewal_window(), mt.sequence_number(), mt.serial_number()))
            .cloned())
    }

    fn master_token(&self, serial_number: u64) -> MslResult<Option<MasterToken>> {
        Ok(self.read()?.master_tokens.get(&serial_number).cloned())
    }

    fn master_tokens(&self) -> MslResult<Vec<MasterToken>> {
        Ok(self.read()?.master_tokens.values().cloned().collect())
    }

    fn remove_master_token(&self, master_token: &MasterToken) -> MslResult<()> {
        let mut state = self.write()?;
        let serial = master_token.serial_number();

        // Only the exact stored token; a caller holding an older token of the
        // line must not drop its renewal.
        match state.master_tokens.get(&serial) {
            Some(stored) if stored.id() == master_token.id() => {},
            _ => return Ok(()),
        }

        state.master_tokens.remove(&serial);
        state.crypto_contexts.remove(serial);

        let orphaned: Vec<u64> = state
            .user_id_tokens
            .values()
            .filter(|uit| uit.master_token_serial_number() == serial)
            .map(UserIdToken::serial_number)
            .collect();
        state
            .user_id_tokens
            .retain(|_, uit| uit.master_token_serial_number() != serial);
        for uit_serial in orphaned {
            state.drop_user_bound_service_tokens(uit_serial);
        }
        state
            .service_tokens
            .retain(|key, _| key.master_token_serial_number != Some(serial));

        Ok(())
    }

    fn non_replayable_id(&self, master_token: &MasterToken) -> MslResult<u64> {
        let serial = master_token.serial_number();
        {
            let state = self.read()?;
            if let Some(counter) = state.counters.get(&serial) {
                return counter.next_id();
            }
        }

        let mut state = self.write()?;
        let floor = self.options.non_replayable_floor;
        state
            .counters
            .entry(serial)
            .or_insert_with(|| NonReplayableCounter::new(serial, floor))
            .next_id()
    }

    fn add_user_id_token(&self, user_id: &str, user_id_token: UserIdToken) -> MslResult<()> {
        let mut state = self.write()?;

        if !state
            .master_tokens
            .contains_key(&user_id_token.master_token_serial_number())
        {
            return Err(MslError::MasterTokenNotFound {
                user_id_token_serial: user_id_token.serial_number(),
                bound_master_serial: user_id_token.master_token_serial_number(),
            });
        }

        let collides = state.user_id_tokens.iter().any(|(other_user, stored)| {
            other_user != user_id
                && stored.serial_number() == user_id_token.serial_number()
                && stored.master_token_serial_number()
                    == user_id_token.master_token_serial_number()
                && *stored != user_id_token
        });
        if collides {
            return Err(MslError::IdentityCollision {
                token: user_id_token.to_string(),
            });
        }

        let serial = user_id_token.serial_number();
        if let Some(replaced) = state
            .user_id_tokens
            .insert(user_id.to_string(), user_id_token)
            && replaced.serial_number() != serial
            && state.find_user_id_token(replaced.serial_number()).is_none()
        {
            debug!(
                user_id = %user_id,
                replaced = replaced.serial_number(),
                serial_number = serial,
                "User ID token replaced; dropping service tokens bound to the old token"
            );
            state.drop_user_bound_service_tokens(replaced.serial_number());
        }
        Ok(())
    }

    fn get_user_id_token(&self, user_id: &str) -> MslResult<Option<UserIdToken>> {
        Ok(self.read()?.user_id_tokens.get(user_id).cloned())
    }

    fn remove_user_id_token(&self, user_id_token: &UserIdToken) -> MslResult<()> {
        let mut state = self.write()?;
        let before = state.user_id_tokens.len();
        state.user_id_tokens.retain(|_, stored| stored != user_id_token);
        if state.user_id_tokens.len() != before {
            state.drop_user_bound_service_tokens(user_id_token.serial_number());
        }
        Ok(())
    }

    fn clear_user_id_tokens(&self) -> MslResult<()> {
        let mut state = self.write()?;
        state.user_id_tokens.clear();
        state
            .service_tokens
            .retain(|key, _| key.user_id_token_serial_number.is_none());
        Ok(())
    }

    fn add_service_tokens(&self, tokens: Vec<ServiceToken>) -> MslResult<()> {
        let mut state = self.write()?;
        for token in &tokens {
            state.check_service_token_bindings(token)?;
        }
        for token in tokens {
            state
                .service_tokens
                .insert(ServiceTokenKey::from(&token), token);
        }
        Ok(())
    }

    fn get_service_tokens(
        &self,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<Vec<ServiceToken>> {
        if let Some(uit) = user_id_token {
            let Some(mt) = master_token else {
                return Err(MslError::MasterTokenNotFound {
                    user_id_token_serial: uit.serial_number(),
                    bound_master_serial: uit.master_token_serial_number(),
                });
            };
            uit.check_bound_to(mt)?;
        }

        let mt_serial = master_token.map(MasterToken::serial_number);
        let uit_serial = user_id_token.map(UserIdToken::serial_number);

        Ok(self
            .read()?
            .service_tokens
            .iter()
            .filter(|(key, _)| match (key.master_token_serial_number, key.user_id_token_serial_number) {
                (None, _) => true,
                (Some(mt), None) => Some(mt) == mt_serial,
                (Some(mt), Some(uit)) => Some(mt) == mt_serial && Some(uit) == uit_serial,
            })
            .map(|(_, token)| token.clone())
            .collect())
    }

    fn remove_service_tokens(
        &self,
        name: Option<&str>,
        master_token: Option<&MasterToken>,
        user_id_token: Option<&UserIdToken>,
    ) -> MslResult<()> {
        if let (Some(mt), Some(uit)) = (master_token, user_id_token) {
            uit.check_bound_to(mt)?;
        }

        let mt_serial = master_token.map(MasterToken::serial_number);
        let uit_serial = user_id_token.map(UserIdToken::serial_number);

        self.write()?.service_tokens.retain(|key, _| {
            let matches = name.is_none_or(|n| key.name == n)
                && mt_serial.is_none_or(|s| key.master_token_serial_number == Some(s))
                && uit_serial.is_none_or(|s| key.user_id_token_serial_number == Some(s));
            !matches
        });
        Ok(())
    }

    fn clear_service_tokens(&self) -> MslResult<()> {
        self.write()?.service_tokens.clear();
        Ok(())
    }

    fn clear(&self) -> MslResult<()> {
        let mut state = self.write()?;
        state.master_tokens.clear();
        state.crypto_contexts.clear();
        state.user_id_tokens.clear();
        state.service_tokens.clear();
        Ok(())
    }

    fn snapshot(&self) -> MslResult<StoreSnapshot> {
        let state = self.read()?;
        Ok(StoreSnapshot {
            master_tokens: state.master_tokens.values().cloned().collect(),
            user_id_tokens: state
                .user_id_tokens
                .iter()
                .map(|(user, uit)| (user.clone(), uit.clone()))
                .collect(),
            service_tokens: state.service_tokens.values().cloned().collect(),
            non_replayable_ids: state
                .counters
                .iter()
                .map(|(serial, counter)| (*serial, counter.peek()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msl_core::ErrorKind;
    use msl_crypto::{KeyPair, NullCryptoContext};
    use msl_tokens::{MslUser, ServiceTokenBuilder};
    use std::sync::Arc;

    fn test_keypair() -> KeyPair {
        KeyPair::from_secret_key(&[7u8; 32]).unwrap()
    }

    fn master_token(serial: u64, seq: u64) -> MasterToken {
        MasterToken::builder("server", "client-1")
            .serial_number(serial)
            .sequence_number(seq)
            .sign(&test_keypair())
            .unwrap()
    }

    fn user_id_token(mt: &MasterToken, serial: u64, user: &str) -> UserIdToken {
        UserIdToken::builder(mt, MslUser::new(user))
            .serial_number(serial)
            .sign(&test_keypair())
            .unwrap()
    }

    fn service_token(
        name: &str,
        mt: Option<&MasterToken>,
        uit: Option<&UserIdToken>,
    ) -> ServiceToken {
        let mut builder = ServiceTokenBuilder::new(name, name.as_bytes().to_vec());
        if let Some(mt) = mt {
            builder = builder.bound_to_master_token(mt);
        }
        if let Some(uit) = uit {
            builder = builder.bound_to_user_id_token(uit);
        }
        builder.sign(&test_keypair()).unwrap()
    }

    fn ctx(id: &str) -> SharedCryptoContext {
        Arc::new(NullCryptoContext::new(id))
    }

    #[test]
    fn test_crypto_context_last_write_wins() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();

        store.set_crypto_context(&mt, ctx("first")).unwrap();
        store.set_crypto_context(&mt, ctx("second")).unwrap();
        assert_eq!(store.get_crypto_context(&mt).unwrap().unwrap().id(), "second");

        store.remove_crypto_context(&mt).unwrap();
        assert!(store.get_crypto_context(&mt).unwrap().is_none());
    }

    #[test]
    fn test_renewal_reuses_crypto_context_slot() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        store.set_crypto_context(&mt, ctx("one")).unwrap();

        let renewed = mt.renewed().sign(&test_keypair()).unwrap();
        store.add_master_token(renewed.clone()).unwrap();
        assert_eq!(store.get_crypto_context(&renewed).unwrap().unwrap().id(), "one");
        assert_eq!(store.master_token(1).unwrap().unwrap(), renewed);
    }

    #[test]
    fn test_rejects_stale_master_token() {
        let store = SimpleTrustStore::new();
        store.add_master_token(master_token(1, 5)).unwrap();

        let err = store.add_master_token(master_token(1, 4)).unwrap_err();
        assert!(matches!(err, MslError::StaleMasterToken {
            serial_number: 1,
            offered: 4,
            stored: 5
        }));
        assert_eq!(store.master_token(1).unwrap().unwrap().sequence_number(), 5);
    }

    #[test]
    fn test_identity_collision() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        // Re-adding the identical token is a no-op.
        store.add_master_token(mt).unwrap();

        let different = MasterToken::builder("server", "someone-else")
            .serial_number(1)
            .sequence_number(1)
            .sign(&test_keypair())
            .unwrap();
        let err = store.add_master_token(different).unwrap_err();
        assert!(matches!(err, MslError::IdentityCollision { .. }));
    }

    #[test]
    fn test_get_master_token_returns_newest() {
        let store = SimpleTrustStore::new();
        assert!(store.get_master_token().unwrap().is_none());

        let keypair = test_keypair();
        let now = msl_core::Timestamp::now();
        let older = MasterToken::builder("server", "client-1")
            .serial_number(10)
            .issued_at(now)
            .sign(&keypair)
            .unwrap();
        let newer = MasterToken::builder("server", "client-1")
            .serial_number(2)
            .issued_at(now.offset(chrono::Duration::minutes(5)))
            .sign(&keypair)
            .unwrap();
        store.add_master_token(older).unwrap();
        store.add_master_token(newer.clone()).unwrap();

        assert_eq!(store.get_master_token().unwrap().unwrap(), newer);
        assert_eq!(store.master_tokens().unwrap().len(), 2);
    }

    #[test]
    fn test_user_id_token_requires_master_token() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        let uit = user_id_token(&mt, 1, "alice");

        let err = store.add_user_id_token("alice", uit.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserAuthentication);
        assert!(store.get_user_id_token("alice").unwrap().is_none());

        store.add_master_token(mt).unwrap();
        store.add_user_id_token("alice", uit.clone()).unwrap();
        assert_eq!(store.get_user_id_token("alice").unwrap().unwrap(), uit);
    }

    #[test]
    fn test_user_id_token_collision_across_users() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        store
            .add_user_id_token("alice", user_id_token(&mt, 7, "alice"))
            .unwrap();

        let err = store
            .add_user_id_token("bob", user_id_token(&mt, 7, "bob"))
            .unwrap_err();
        assert!(matches!(err, MslError::IdentityCollision { .. }));

        // Replacing a user's own token is a renewal.
        store
            .add_user_id_token("alice", user_id_token(&mt, 7, "alice"))
            .unwrap();
    }

    #[test]
    fn test_non_replayable_ids_survive_renewal_and_removal() {
        let store = SimpleTrustStore::with_options(StoreOptions {
            non_replayable_floor: 100,
        })
        .unwrap();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();

        assert_eq!(store.non_replayable_id(&mt).unwrap(), 100);
        assert_eq!(store.non_replayable_id(&mt).unwrap(), 101);

        let renewed = mt.renewed().sign(&test_keypair()).unwrap();
        store.add_master_token(renewed.clone()).unwrap();
        assert_eq!(store.non_replayable_id(&renewed).unwrap(), 102);

        store.remove_master_token(&renewed).unwrap();
        assert_eq!(store.non_replayable_id(&renewed).unwrap(), 103);

        store.clear().unwrap();
        assert_eq!(store.non_replayable_id(&renewed).unwrap(), 104);

        // Independent line starts at the floor.
        assert_eq!(store.non_replayable_id(&master_token(2, 1)).unwrap(), 100);
    }

    #[test]
    fn test_rejects_out_of_range_floor() {
        let result = SimpleTrustStore::with_options(StoreOptions {
            non_replayable_floor: u64::MAX,
        });
        assert!(matches!(result, Err(MslError::Configuration(_))));
    }

    #[test]
    fn test_remove_master_token_cascades() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        let other = master_token(2, 1);
        store.add_master_token(mt.clone()).unwrap();
        store.add_master_token(other.clone()).unwrap();
        store.set_crypto_context(&mt, ctx("one")).unwrap();

        let uit = user_id_token(&mt, 1, "alice");
        store.add_user_id_token("alice", uit.clone()).unwrap();
        store
            .add_service_tokens(vec![
                service_token("unbound", None, None),
                service_token("mt", Some(&mt), None),
                service_token("uit", Some(&mt), Some(&uit)),
                service_token("other", Some(&other), None),
            ])
            .unwrap();

        // An older token of the line does not remove the stored one.
        let renewed = mt.renewed().sign(&test_keypair()).unwrap();
        store.add_master_token(renewed.clone()).unwrap();
        store.remove_master_token(&mt).unwrap();
        assert!(store.master_token(1).unwrap().is_some());

        store.remove_master_token(&renewed).unwrap();
        assert!(store.master_token(1).unwrap().is_none());
        assert!(store.get_crypto_context(&mt).unwrap().is_none());
        assert!(store.get_user_id_token("alice").unwrap().is_none());

        let names: Vec<String> = store
            .get_service_tokens(Some(&other), None)
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["other", "unbound"]);
    }

    #[test]
    fn test_service_token_binding_must_exist() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);

        let err = store
            .add_service_tokens(vec![
                service_token("ok", None, None),
                service_token("bound", Some(&mt), None),
            ])
            .unwrap_err();
        assert!(matches!(err, MslError::BindingNotFound { .. }));
        // All or nothing.
        assert!(store.get_service_tokens(None, None).unwrap().is_empty());

        store.add_master_token(mt.clone()).unwrap();
        let uit = user_id_token(&mt, 3, "alice");
        let err = store
            .add_service_tokens(vec![service_token("uit", Some(&mt), Some(&uit))])
            .unwrap_err();
        assert!(err.to_string().contains("user ID token 3"));
    }

    #[test]
    fn test_get_service_tokens_filters_by_binding() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        let other = master_token(2, 1);
        store.add_master_token(mt.clone()).unwrap();
        store.add_master_token(other.clone()).unwrap();
        let uit = user_id_token(&mt, 1, "alice");
        store.add_user_id_token("alice", uit.clone()).unwrap();
        store
            .add_service_tokens(vec![
                service_token("unbound", None, None),
                service_token("mt", Some(&mt), None),
                service_token("uit", Some(&mt), Some(&uit)),
                service_token("other", Some(&other), None),
            ])
            .unwrap();

        let names = |tokens: Vec<ServiceToken>| {
            let mut names: Vec<String> = tokens.iter().map(|t| t.name().to_string()).collect();
            names.sort();
            names
        };

        assert_eq!(names(store.get_service_tokens(None, None).unwrap()), vec![
            "unbound"
        ]);
        assert_eq!(
            names(store.get_service_tokens(Some(&mt), None).unwrap()),
            vec!["mt", "unbound"]
        );
        assert_eq!(
            names(store.get_service_tokens(Some(&mt), Some(&uit)).unwrap()),
            vec!["mt", "uit", "unbound"]
        );

        let err = store.get_service_tokens(None, Some(&uit)).unwrap_err();
        assert!(matches!(err, MslError::MasterTokenNotFound { .. }));
        let err = store.get_service_tokens(Some(&other), Some(&uit)).unwrap_err();
        assert!(matches!(err, MslError::TokenMismatch { .. }));
    }

    #[test]
    fn test_remove_service_tokens_by_filter() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        store
            .add_service_tokens(vec![
                service_token("a", None, None),
                service_token("a", Some(&mt), None),
                service_token("b", Some(&mt), None),
            ])
            .unwrap();

        store.remove_service_tokens(Some("a"), None, None).unwrap();
        let remaining = store.get_service_tokens(Some(&mt), None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name(), "b");

        store.remove_service_tokens(None, Some(&mt), None).unwrap();
        assert!(store.get_service_tokens(Some(&mt), None).unwrap().is_empty());
    }

    #[test]
    fn test_remove_user_id_token_cascades_to_service_tokens() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        let uit = user_id_token(&mt, 1, "alice");
        store.add_user_id_token("alice", uit.clone()).unwrap();
        store
            .add_service_tokens(vec![
                service_token("mt", Some(&mt), None),
                service_token("uit", Some(&mt), Some(&uit)),
            ])
            .unwrap();

        store.remove_user_id_token(&uit).unwrap();
        assert!(store.get_user_id_token("alice").unwrap().is_none());
        let remaining = store.get_service_tokens(Some(&mt), None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name(), "mt");
    }

    #[test]
    fn test_replacing_user_id_token_drops_old_bound_service_tokens() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        let old = user_id_token(&mt, 1, "alice");
        store.add_user_id_token("alice", old.clone()).unwrap();
        store
            .add_service_tokens(vec![
                service_token("mt", Some(&mt), None),
                service_token("uit", Some(&mt), Some(&old)),
            ])
            .unwrap();

        let new = user_id_token(&mt, 2, "alice");
        store.add_user_id_token("alice", new.clone()).unwrap();

        assert_eq!(store.get_user_id_token("alice").unwrap(), Some(new));
        let remaining = store.get_service_tokens(Some(&mt), Some(&old)).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name(), "mt");

        // The snapshot must stay loadable after the replacement.
        SimpleTrustStore::from_snapshot(store.snapshot().unwrap(), StoreOptions::default())
            .unwrap();
    }

    #[test]
    fn test_re_adding_same_user_id_token_keeps_bound_service_tokens() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        let uit = user_id_token(&mt, 1, "alice");
        store.add_user_id_token("alice", uit.clone()).unwrap();
        store
            .add_service_tokens(vec![service_token("uit", Some(&mt), Some(&uit))])
            .unwrap();

        store.add_user_id_token("alice", uit.clone()).unwrap();
        assert_eq!(
            store.get_service_tokens(Some(&mt), Some(&uit)).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_service_token_replaced_by_key() {
        let store = SimpleTrustStore::new();
        let keypair = KeyPair::generate();
        let first = ServiceTokenBuilder::new("prefs", b"1".to_vec())
            .sign(&keypair)
            .unwrap();
        let second = ServiceTokenBuilder::new("prefs", b"2".to_vec())
            .sign(&keypair)
            .unwrap();
        store.add_service_tokens(vec![first]).unwrap();
        store.add_service_tokens(vec![second]).unwrap();

        let tokens = store.get_service_tokens(None, None).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].data(), b"2");
    }

    #[test]
    fn test_snapshot_roundtrip_drops_crypto_contexts() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        store.set_crypto_context(&mt, ctx("one")).unwrap();
        let uit = user_id_token(&mt, 1, "alice");
        store.add_user_id_token("alice", uit.clone()).unwrap();
        store
            .add_service_tokens(vec![service_token("uit", Some(&mt), Some(&uit))])
            .unwrap();
        store.non_replayable_id(&mt).unwrap();
        store.non_replayable_id(&mt).unwrap();

        let bytes = store.snapshot().unwrap().to_bytes().unwrap();
        let restored = SimpleTrustStore::from_snapshot(
            StoreSnapshot::from_bytes(&bytes).unwrap(),
            StoreOptions::default(),
        )
        .unwrap();

        assert_eq!(restored.master_token(1).unwrap().unwrap(), mt);
        assert!(restored.get_crypto_context(&mt).unwrap().is_none());
        assert_eq!(restored.get_user_id_token("alice").unwrap().unwrap(), uit);
        assert_eq!(
            restored.get_service_tokens(Some(&mt), Some(&uit)).unwrap().len(),
            1
        );
        assert_eq!(restored.non_replayable_id(&mt).unwrap(), 2);
    }

    #[test]
    fn test_from_snapshot_rejects_orphaned_user_id_token() {
        let mt = master_token(1, 1);
        let mut snapshot = StoreSnapshot::default();
        snapshot
            .user_id_tokens
            .insert("alice".into(), user_id_token(&mt, 1, "alice"));

        let err = SimpleTrustStore::from_snapshot(snapshot, StoreOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_clear_user_id_tokens_keeps_master_bound_service_tokens() {
        let store = SimpleTrustStore::new();
        let mt = master_token(1, 1);
        store.add_master_token(mt.clone()).unwrap();
        let uit = user_id_token(&mt, 1, "alice");
        store.add_user_id_token("alice", uit.clone()).unwrap();
        store
            .add_service_tokens(vec![
                service_token("mt", Some(&mt), None),
                service_token("uit", Some(&mt), Some(&uit)),
            ])
            .unwrap();

        store.clear_user_id_tokens().unwrap();
        let remaining = store.get_service_tokens(Some(&mt), None).unwrap();
        assert_eq!(remaining.len(), 1);
        store.clear_service_tokens().unwrap();
        assert!(store.get_service_tokens(Some(&mt), None).unwrap().is_empty());
    }
}
