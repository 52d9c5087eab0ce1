//! Mock factories and crypto contexts for testing.
//!
//! Every mock records its invocations so tests can assert which factory ran,
//! how often, and in what order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use msl_core::{MslError, MslResult};
use msl_crypto::{CryptoContext, CryptoOperation, CryptoResult, SharedCryptoContext};
use msl_schemes::{
    EntityAuthData, EntityAuthFactory, KeyExchangeFactory, KeyRequestData, KeyResponseData,
    SchemeContext, SchemeFactory, SchemeParameters, UserAuthData, UserAuthFactory,
};
use msl_tokens::MasterToken;
use serde_json::{Value, json};

use crate::fixtures::{TEST_ISSUER, test_keypair};

/// Shared, ordered record of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `call`.
    pub fn record(&self, call: impl Into<String>) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call.into());
        }
    }

    /// All recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// How many recorded calls equal `call`.
    #[must_use]
    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .map(|g| g.iter().filter(|c| *c == call).count())
            .unwrap_or_default()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().map(|g| g.is_empty()).unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// RecordingCryptoContext
// ---------------------------------------------------------------------------

/// A pass-through crypto context that records each operation.
///
/// Behaves like the null context: encryption and wrapping are the identity,
/// signatures are the context ID, and verification compares against it.
#[derive(Debug, Clone)]
pub struct RecordingCryptoContext {
    id: String,
    operations: Arc<Mutex<Vec<CryptoOperation>>>,
}

impl RecordingCryptoContext {
    /// Create a context labelled `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a context and return it as a shared handle alongside a clone
    /// that observes the same operation log.
    #[must_use]
    pub fn shared(id: impl Into<String>) -> (SharedCryptoContext, Self) {
        let ctx = Self::new(id);
        (Arc::new(ctx.clone()), ctx)
    }

    /// Operations performed so far, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<CryptoOperation> {
        self.operations
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    fn record(&self, op: CryptoOperation) {
        if let Ok(mut guard) = self.operations.lock() {
            guard.push(op);
        }
    }
}

impl CryptoContext for RecordingCryptoContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn encrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.record(CryptoOperation::Encrypt);
        Ok(data.to_vec())
    }

    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.record(CryptoOperation::Decrypt);
        Ok(data.to_vec())
    }

    fn wrap_key(&self, key: &[u8]) -> CryptoResult<Vec<u8>> {
        self.record(CryptoOperation::Wrap);
        Ok(key.to_vec())
    }

    fn unwrap_key(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.record(CryptoOperation::Unwrap);
        Ok(data.to_vec())
    }

    fn sign(&self, _data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.record(CryptoOperation::Sign);
        Ok(self.id.as_bytes().to_vec())
    }

    fn verify(&self, _data: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        self.record(CryptoOperation::Verify);
        Ok(signature == self.id.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Entity authentication
// ---------------------------------------------------------------------------

/// Mock entity authentication factory.
#[derive(Debug, Clone)]
pub struct MockEntityAuthFactory {
    scheme: String,
    fail: bool,
    log: CallLog,
}

impl MockEntityAuthFactory {
    /// A factory for `scheme` that always succeeds.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            fail: false,
            log: CallLog::new(),
        }
    }

    /// Make authentication fail with an entity-authentication error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Record calls into `log` instead of a private log.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// The call log.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl SchemeFactory for MockEntityAuthFactory {
    fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl EntityAuthFactory for MockEntityAuthFactory {
    fn auth_data(
        &self,
        ctx: &SchemeContext,
        params: &SchemeParameters,
    ) -> MslResult<EntityAuthData> {
        self.log.record(format!("{}:auth_data", self.scheme));
        Ok(EntityAuthData {
            scheme: self.scheme.clone(),
            identity: ctx.entity_identity().to_string(),
            auth_data: serde_json::to_value(params).unwrap_or(Value::Null),
        })
    }

    fn crypto_context(
        &self,
        _ctx: &SchemeContext,
        data: &EntityAuthData,
    ) -> MslResult<SharedCryptoContext> {
        self.log.record(format!("{}:crypto_context", self.scheme));
        if self.fail {
            return Err(MslError::entity_auth(&self.scheme, "mock rejection"));
        }
        Ok(Arc::new(RecordingCryptoContext::new(data.identity.clone())))
    }
}

// ---------------------------------------------------------------------------
// User authentication
// ---------------------------------------------------------------------------

/// Mock user authentication factory.
#[derive(Debug, Clone)]
pub struct MockUserAuthFactory {
    scheme: String,
    fail: bool,
    log: CallLog,
}

impl MockUserAuthFactory {
    /// A factory for `scheme` that always succeeds.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            fail: false,
            log: CallLog::new(),
        }
    }

    /// Make authentication fail with a user-authentication error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Record calls into `log` instead of a private log.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// The call log.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl SchemeFactory for MockUserAuthFactory {
    fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl UserAuthFactory for MockUserAuthFactory {
    fn auth_data(&self, _ctx: &SchemeContext, params: &SchemeParameters) -> MslResult<UserAuthData> {
        self.log.record(format!("{}:auth_data", self.scheme));
        Ok(UserAuthData {
            scheme: self.scheme.clone(),
            auth_data: serde_json::to_value(params).unwrap_or(Value::Null),
        })
    }

    fn crypto_context(
        &self,
        _ctx: &SchemeContext,
        data: &UserAuthData,
    ) -> MslResult<SharedCryptoContext> {
        self.log.record(format!("{}:crypto_context", self.scheme));
        if self.fail {
            return Err(MslError::user_auth(&self.scheme, "mock rejection"));
        }
        Ok(Arc::new(RecordingCryptoContext::new(data.scheme.clone())))
    }
}

// ---------------------------------------------------------------------------
// Key exchange
// ---------------------------------------------------------------------------

/// Mock key exchange factory.
///
/// Responses carry a fresh master token signed by [`test_keypair`], issued to
/// the requesting entity with increasing serial numbers starting at 1.
#[derive(Debug)]
pub struct MockKeyExchangeFactory {
    scheme: String,
    fail: bool,
    next_serial: AtomicU64,
    log: CallLog,
}

impl MockKeyExchangeFactory {
    /// A factory for `scheme` that always succeeds.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            fail: false,
            next_serial: AtomicU64::new(1),
            log: CallLog::new(),
        }
    }

    /// Make negotiation fail with a key-exchange error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Record calls into `log` instead of a private log.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// The call log.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl SchemeFactory for MockKeyExchangeFactory {
    fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl KeyExchangeFactory for MockKeyExchangeFactory {
    fn request_data(
        &self,
        ctx: &SchemeContext,
        mechanism: Option<&str>,
        _params: &SchemeParameters,
    ) -> MslResult<KeyRequestData> {
        self.log.record(format!("{}:request_data", self.scheme));
        Ok(KeyRequestData {
            scheme: self.scheme.clone(),
            mechanism: mechanism.map(str::to_string),
            data: json!({ "identity": ctx.entity_identity() }),
        })
    }

    fn generate_response(
        &self,
        ctx: &SchemeContext,
        request: &KeyRequestData,
    ) -> MslResult<(KeyResponseData, SharedCryptoContext)> {
        self.log.record(format!("{}:generate_response", self.scheme));
        if self.fail {
            return Err(MslError::key_exchange(&self.scheme, "mock negotiation failure"));
        }

        let identity = request
            .data
            .get("identity")
            .and_then(Value::as_str)
            .unwrap_or(ctx.entity_identity());
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let master_token = MasterToken::builder(TEST_ISSUER, identity)
            .serial_number(serial)
            .sign(&test_keypair())?;

        let crypto: SharedCryptoContext =
            Arc::new(RecordingCryptoContext::new(format!("{}:{serial}", self.scheme)));
        Ok((
            KeyResponseData {
                scheme: self.scheme.clone(),
                master_token,
                data: Value::Null,
            },
            crypto,
        ))
    }

    fn crypto_context(
        &self,
        _ctx: &SchemeContext,
        _request: &KeyRequestData,
        response: &KeyResponseData,
    ) -> MslResult<SharedCryptoContext> {
        self.log.record(format!("{}:crypto_context", self.scheme));
        Ok(Arc::new(RecordingCryptoContext::new(format!(
            "{}:{}",
            self.scheme,
            response.master_token.serial_number()
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{test_context, test_store};

    #[test]
    fn test_recording_context() {
        let (shared, observer) = RecordingCryptoContext::shared("ctx");
        let sig = shared.sign(b"data").unwrap();
        assert!(shared.verify(b"data", &sig).unwrap());
        assert_eq!(shared.encrypt(b"x").unwrap(), b"x");
        assert_eq!(
            observer.operations(),
            vec![
                CryptoOperation::Sign,
                CryptoOperation::Verify,
                CryptoOperation::Encrypt
            ]
        );
    }

    #[test]
    fn test_key_exchange_mock_issues_serials() {
        let factory = MockKeyExchangeFactory::new("MOCK");
        let ctx = test_context(test_store());
        let request = factory
            .request_data(&ctx, None, &SchemeParameters::new())
            .unwrap();

        let (first, _) = factory.generate_response(&ctx, &request).unwrap();
        let (second, crypto) = factory.generate_response(&ctx, &request).unwrap();
        assert_eq!(first.master_token.serial_number(), 1);
        assert_eq!(second.master_token.serial_number(), 2);
        assert_eq!(crypto.id(), "MOCK:2");
        assert_eq!(factory.log().count("MOCK:generate_response"), 2);
    }

    #[test]
    fn test_shared_log_orders_calls() {
        let log = CallLog::new();
        let a = MockEntityAuthFactory::new("A").with_log(log.clone());
        let b = MockEntityAuthFactory::new("B").with_log(log.clone()).failing();
        let ctx = test_context(test_store());

        let data = a.auth_data(&ctx, &SchemeParameters::new()).unwrap();
        assert!(b.crypto_context(&ctx, &data).is_err());
        assert_eq!(log.calls(), vec!["A:auth_data", "B:crypto_context"]);
    }
}
