//! Prelude module - commonly used types for convenient import.
//!
//! Use `use msl_test::prelude::*;` to import all essential types.

// Fixtures
pub use crate::{
    master_token, service_token, store_with_master_token, test_context, test_keypair, test_store,
    user_id_token,
};

// Mocks
pub use crate::{
    CallLog, MockEntityAuthFactory, MockKeyExchangeFactory, MockUserAuthFactory,
    RecordingCryptoContext,
};

// Harness
pub use crate::init_test_logging;
