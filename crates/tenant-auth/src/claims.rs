//! Read-only access to claims an upstream authorizer attached to a request.
//!
//! The gateway places verified token claims at
//! `requestContext.authorizer.claims` in the request event. This crate never
//! writes them and never re-verifies them; they are trusted because only the
//! upstream trust boundary can populate that location.
//!
//! Claim names:
//!
//! | claim             | meaning                                        |
//! |-------------------|------------------------------------------------|
//! | `cognito:groups`  | grant list, comma-joined string or JSON array  |
//! | `custom:username` | login name                                     |
//! | `custom:personId` | person identifier                              |
//! | `scope`           | space-separated OAuth scopes                   |
//! | `client_id`       | OAuth client that obtained the token           |

use crate::error::{AuthError, Result};
use crate::rights::{parse_grant, parse_grant_list, RightGrant};
use serde_json::{Map, Value};
use std::fmt;

/// JSON pointer to the claims object inside a gateway request event.
pub const CLAIMS_POINTER: &str = "/requestContext/authorizer/claims";

/// Claim holding the caller's grant list.
pub const GROUPS_CLAIM: &str = "cognito:groups";

/// Claim holding the caller's login name.
pub const USERNAME_CLAIM: &str = "custom:username";

/// Claim holding the caller's person identifier.
pub const PERSON_ID_CLAIM: &str = "custom:personId";

/// Claim holding the token's OAuth scopes.
pub const SCOPE_CLAIM: &str = "scope";

/// Claim holding the OAuth client id.
pub const CLIENT_ID_CLAIM: &str = "client_id";

/// Claims object of one request.
#[derive(Clone, Default)]
pub struct ClaimsBag {
    claims: Map<String, Value>,
}

impl ClaimsBag {
    /// Claims from a full gateway request event. Missing claims yield an
    /// empty bag.
    #[must_use]
    pub fn from_event(event: &Value) -> Self {
        event
            .pointer(CLAIMS_POINTER)
            .map_or_else(Self::default, |claims| Self::from_claims(claims.clone()))
    }

    /// Claims from an already extracted claims object. Non-objects yield an
    /// empty bag.
    #[must_use]
    pub fn from_claims(claims: Value) -> Self {
        match claims {
            Value::Object(claims) => Self { claims },
            _ => Self::default(),
        }
    }

    /// Whether no claims are present at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// A non-empty string claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingClaim` if the claim is absent, empty or not
    /// a string.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.claims
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::MissingClaim(name.to_string()))
    }

    /// The caller's grants.
    ///
    /// Accepts either a comma-joined string or a JSON array of grant strings.
    ///
    /// # Errors
    ///
    /// - `MissingClaim` - no grant claim, or it has an unexpected JSON type
    /// - `Rights` - an entry is malformed
    pub fn grants(&self) -> Result<Vec<RightGrant>> {
        match self.claims.get(GROUPS_CLAIM) {
            Some(Value::String(csv)) => Ok(parse_grant_list(csv)?),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| -> Result<RightGrant> {
                    let raw = entry
                        .as_str()
                        .ok_or_else(|| AuthError::MissingClaim(GROUPS_CLAIM.to_string()))?;
                    Ok(parse_grant(raw.trim())?)
                })
                .collect(),
            _ => Err(AuthError::MissingClaim(GROUPS_CLAIM.to_string())),
        }
    }

    /// Space-separated scopes of the `scope` claim; empty if absent.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.get_str(SCOPE_CLAIM)
            .map(|scope| scope.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Lists claim names only; values may identify the caller.
impl fmt::Debug for ClaimsBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsBag")
            .field("claims", &self.claims.keys().collect::<Vec<_>>())
            .finish()
    }
}
