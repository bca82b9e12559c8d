//! Builder patterns for test tokens
//!
//! Tokens are signed with a throwaway HMAC key. The code under test decodes
//! them without verification, so only the payload matters.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

const TEST_SIGNING_SECRET: &[u8] = b"tenant-auth-test-signing-secret";

/// Builder for creating test JWTs
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("backend-test-client")
///     .with_scope("https://api.example.org/scopes/backend")
///     .expires_in(3600)
///     .build_jwt();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    scope: String,
    exp: i64,
    iat: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            scope: String::new(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the subject (user/service)
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the scope (space-separated)
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    /// Set expiration in seconds from now
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> serde_json::Value {
        json!({
            "sub": self.sub,
            "scope": self.scope,
            "exp": self.exp,
            "iat": self.iat,
        })
    }

    /// Build a compact HS256 JWT carrying the claims
    pub fn build_jwt(self) -> String {
        encode(
            &Header::default(),
            &self.build(),
            &EncodingKey::from_secret(TEST_SIGNING_SECRET),
        )
        .expect("HS256 encoding of JSON claims cannot fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
