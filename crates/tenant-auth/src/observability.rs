//! Metrics and log-correlation helpers.
//!
//! All metrics follow Prometheus naming conventions:
//! - `tenant_auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `status`: success, error
//! - `error_type`: bounded by `TokenError` variants
//! - `path`: offline, online, none
//! - `result`: granted, denied
//!
//! Only the facade is used here; the embedding service installs an exporter.

use metrics::{counter, histogram};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Which resolution path decided an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationPath {
    /// Decided from claims attached to the request.
    Offline,
    /// Decided from the identity provider's userinfo response.
    Online,
    /// Neither path produced evidence (fail-closed).
    None,
}

impl AuthorizationPath {
    /// Metric label value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthorizationPath::Offline => "offline",
            AuthorizationPath::Online => "online",
            AuthorizationPath::None => "none",
        }
    }
}

/// Record a token endpoint round trip.
///
/// Metric: `tenant_auth_token_fetch_total`, `tenant_auth_token_fetch_duration_seconds`
/// Labels: `status`
pub fn record_token_fetch(status: &str, duration: Duration) {
    histogram!("tenant_auth_token_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("tenant_auth_token_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a token fetch failure by error type.
///
/// Metric: `tenant_auth_token_fetch_failures_total`
/// Labels: `error_type`
pub fn record_token_fetch_failure(error_type: &str) {
    counter!("tenant_auth_token_fetch_failures_total",
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Record the outcome of a permission check.
///
/// Metric: `tenant_auth_authorization_total`
/// Labels: `path`, `result`
pub fn record_authorization(path: AuthorizationPath, granted: bool) {
    let result = if granted { "granted" } else { "denied" };

    counter!("tenant_auth_authorization_total",
        "path" => path.as_str(),
        "result" => result
    )
    .increment(1);
}

/// Record a userinfo lookup.
///
/// Metric: `tenant_auth_identity_lookup_total`
/// Labels: `status`
pub fn record_identity_lookup(status: &str) {
    counter!("tenant_auth_identity_lookup_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Hash a value for correlation in logs (SHA-256, first 8 hex chars).
///
/// Used for client ids, which are useful to correlate across log lines but
/// should not appear in plaintext. Not a substitute for protecting secrets.
#[must_use]
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}
