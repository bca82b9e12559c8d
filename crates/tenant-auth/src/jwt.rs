//! Unverified JWT payload decoding.
//!
//! Tokens handled here were either issued to us by the identity provider over
//! TLS or already verified by the upstream authorizer, so this module only
//! reads claims. It does NOT check signatures and must not be used to make
//! trust decisions on tokens from untrusted callers.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - The `sub` claim is redacted in Debug output
//! - The raw token is held as a `SecretString`

use crate::secret::{ExposeSecret, SecretString};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted JWT size in bytes (8KB).
///
/// Oversized tokens are rejected before any base64 or JSON work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a token payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Token size exceeds `MAX_JWT_SIZE_BYTES`.
    #[error("Token exceeds maximum size")]
    TokenTooLarge,

    /// Token is not a three-part JWT with a base64url JSON payload.
    #[error("Token is malformed")]
    MalformedToken,

    /// Token payload has no numeric `exp` claim.
    #[error("Token has no expiry claim")]
    MissingExpiry,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claims read from an access token payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Space-separated scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// Payload shape before `exp` presence is enforced.
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// An access token together with its decoded claims.
#[derive(Clone)]
pub struct DecodedToken {
    token: SecretString,
    claims: TokenClaims,
}

impl DecodedToken {
    /// The raw token, for use in an `Authorization` header.
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// The decoded claims.
    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Expiration timestamp (Unix epoch seconds).
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

impl fmt::Debug for DecodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedToken")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a token's payload claims without verifying its signature.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - wrong structure, bad base64 or invalid JSON
/// - `MissingExpiry` - payload lacks a numeric `exp`
pub fn decode_unverified(token: SecretString) -> Result<DecodedToken, JwtError> {
    let raw = token.expose_secret();

    if raw.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "tenant_auth.jwt",
            token_size = raw.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "tenant_auth.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtError::MalformedToken);
    }

    let payload_part = parts.get(1).ok_or(JwtError::MalformedToken)?;
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "tenant_auth.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtError::MalformedToken
    })?;

    let raw_claims: RawClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "tenant_auth.jwt", error = %e, "Failed to parse JWT payload JSON");
        JwtError::MalformedToken
    })?;

    let exp = raw_claims.exp.ok_or(JwtError::MissingExpiry)?;

    Ok(DecodedToken {
        token,
        claims: TokenClaims {
            exp,
            iat: raw_claims.iat,
            sub: raw_claims.sub,
            scope: raw_claims.scope,
        },
    })
}

// =============================================================================
// Tests
// =============================================================================
