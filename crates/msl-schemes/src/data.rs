//! Scheme data objects exchanged between peers.
//!
//! Each object names its scheme and carries the scheme-specific payload as
//! opaque JSON. Only the owning factory interprets the payload.

use std::collections::BTreeMap;

use msl_tokens::{MasterToken, WireObject};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity authentication data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAuthData {
    /// Scheme name.
    pub scheme: String,
    /// Identity of the entity being authenticated.
    pub identity: String,
    /// Scheme-specific payload.
    #[serde(default)]
    pub auth_data: Value,
}

/// User authentication data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAuthData {
    /// Scheme name.
    pub scheme: String,
    /// Scheme-specific payload.
    #[serde(default)]
    pub auth_data: Value,
}

/// Key exchange request data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequestData {
    /// Scheme name.
    pub scheme: String,
    /// Scheme mechanism, for schemes that have more than one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,
    /// Scheme-specific payload.
    #[serde(default)]
    pub data: Value,
}

/// Key exchange response data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyResponseData {
    /// Scheme name.
    pub scheme: String,
    /// The master token issued by the exchange.
    pub master_token: MasterToken,
    /// Scheme-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl WireObject for EntityAuthData {
    const KIND: &'static str = "entity authentication data";
}

impl WireObject for UserAuthData {
    const KIND: &'static str = "user authentication data";
}

impl WireObject for KeyRequestData {
    const KIND: &'static str = "key request data";
}

impl WireObject for KeyResponseData {
    const KIND: &'static str = "key response data";
}

/// Raw parameters a factory reads when producing scheme data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemeParameters(BTreeMap<String, Value>);

impl SchemeParameters {
    /// Empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// A parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A string parameter value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Whether no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msl_crypto::KeyPair;
    use msl_tokens::wire;

    #[test]
    fn test_parameters() {
        let params = SchemeParameters::new()
            .with("user_id", "alice")
            .with("attempts", 3);

        assert_eq!(params.get_str("user_id"), Some("alice"));
        assert_eq!(params.get("attempts"), Some(&Value::from(3)));
        assert_eq!(params.get_str("attempts"), None);
        assert!(params.get("missing").is_none());
        assert!(SchemeParameters::new().is_empty());
    }

    #[test]
    fn test_key_response_wire_roundtrip() {
        let mt = MasterToken::builder("server", "client-1")
            .serial_number(3)
            .sign(&KeyPair::generate())
            .unwrap();
        let response = KeyResponseData {
            scheme: "SYMMETRIC_WRAPPED".into(),
            master_token: mt,
            data: serde_json::json!({"keyid": "PSK"}),
        };

        let decoded: KeyResponseData = wire::decode(&wire::encode(&response).unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_malformed_entity_auth_data() {
        let err = wire::decode::<EntityAuthData>(br#"{"scheme": "PSK"}"#).unwrap_err();
        assert!(err.to_string().contains("malformed entity authentication data"));
    }
}
