//! Error types for request authorization.
//!
//! `Unauthorized` is the expected outcome for callers without tenant context.
//! `MissingClaim` is a normal branch condition that sends resolution to the
//! identity provider.

use crate::identity::LookupError;
use crate::rights::RightsError;
use thiserror::Error;

/// Errors produced while resolving a request's tenant or identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No tenant or identity could be resolved for the caller.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A claim was absent from the request's claims bag.
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    /// A claim or userinfo field held malformed rights data.
    #[error(transparent)]
    Rights(#[from] RightsError),

    /// The identity provider lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Result type alias using `AuthError`
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::Unauthorized("no tenant".to_string());
        assert!(err.to_string().contains("no tenant"));

        let err = AuthError::MissingClaim("cognito:groups".to_string());
        assert!(err.to_string().contains("cognito:groups"));

        let err = AuthError::from(RightsError::InvalidRight("fly".to_string()));
        assert!(err.to_string().contains("fly"));

        let err = AuthError::from(LookupError::UnexpectedStatus { status: 503 });
        assert!(err.to_string().contains("503"));
    }
}
