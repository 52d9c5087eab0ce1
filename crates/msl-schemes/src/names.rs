//! Well-known scheme names.
//!
//! Schemes are identified by plain strings so deployments can register their
//! own. These constants cover the names the protocol defines.

/// Entity authentication schemes.
pub mod entity {
    /// No authentication; the entity identity is taken at face value.
    pub const NONE: &str = "NONE";
    /// Pre-shared keys.
    pub const PSK: &str = "PSK";
    /// Model group keys.
    pub const MGK: &str = "MGK";
    /// RSA signatures.
    pub const RSA: &str = "RSA";
    /// ECC signatures.
    pub const ECC: &str = "ECC";
    /// X.509 certificates.
    pub const X509: &str = "X509";
}

/// User authentication schemes.
pub mod user {
    /// Email address and password.
    pub const EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
    /// A previously issued user-ID token with its master token.
    pub const USER_ID_TOKEN: &str = "USER_ID_TOKEN";
}

/// Key exchange schemes.
pub mod key_exchange {
    /// Ephemeral asymmetric key wrapping.
    pub const ASYMMETRIC_WRAPPED: &str = "ASYMMETRIC_WRAPPED";
    /// Wrapping under existing symmetric keys.
    pub const SYMMETRIC_WRAPPED: &str = "SYMMETRIC_WRAPPED";
    /// Diffie-Hellman.
    pub const DIFFIE_HELLMAN: &str = "DIFFIE_HELLMAN";
    /// JSON Web Encryption ladder.
    pub const JWE_LADDER: &str = "JWE_LADDER";
    /// JSON Web Key ladder.
    pub const JWK_LADDER: &str = "JWK_LADDER";
}
