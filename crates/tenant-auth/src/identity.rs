//! Identity provider userinfo lookup.
//!
//! The online half of authorization: when a request's embedded claims do not
//! settle a question, the resolver forwards the caller's own `Authorization`
//! header to `{identity_provider}/oauth2/userinfo` and reads the answer from
//! the response.
//!
//! [`IdentityLookup`] is the seam; [`HttpIdentityLookup`] is the real
//! implementation and [`mock::MockIdentityLookup`] the test double.

use crate::credentials::USERINFO_PATH;
use crate::observability::record_identity_lookup;
use crate::rights::{parse_grant_list, RightGrant, RightsError};
use crate::secret::{ExposeSecret, SecretString};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors from a userinfo lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The endpoint could not be reached or the header could not be sent.
    #[error("Userinfo request failed: {0}")]
    HttpError(String),

    /// The endpoint answered with a status other than 200.
    #[error("Userinfo endpoint returned status {status}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The 200 response body is not the expected JSON.
    #[error("Invalid userinfo response: {0}")]
    InvalidResponse(String),
}

/// Claims returned by the userinfo endpoint.
///
/// Identity fields are redacted in Debug output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Subject identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Tenant the user is currently acting under.
    #[serde(
        rename = "custom:currentTenant",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_tenant: Option<String>,

    /// Comma-joined `right@tenant` grant list.
    #[serde(
        rename = "custom:accessRights",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub access_rights: Option<String>,

    /// Login name.
    #[serde(
        rename = "custom:username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,

    /// Person identifier in the tenant's registry.
    #[serde(
        rename = "custom:personId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub person_id: Option<String>,
}

impl UserInfo {
    /// Parse the grant list; an absent list is empty.
    ///
    /// # Errors
    ///
    /// Returns the first malformed entry's error.
    pub fn grants(&self) -> Result<Vec<RightGrant>, RightsError> {
        self.access_rights
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), parse_grant_list)
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("UserInfo")
            .field("sub", &redact(&self.sub))
            .field("current_tenant", &self.current_tenant)
            .field("access_rights", &self.access_rights)
            .field("username", &redact(&self.username))
            .field("person_id", &redact(&self.person_id))
            .finish()
    }
}

/// Fetches the caller's live identity from the identity provider.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Look up the caller identified by `authorization`, the caller's original
    /// `Authorization` header value, forwarded verbatim.
    async fn user_info(&self, authorization: &SecretString) -> Result<UserInfo, LookupError>;
}

/// [`IdentityLookup`] over HTTP.
#[derive(Clone)]
pub struct HttpIdentityLookup {
    http_client: reqwest::Client,
    userinfo_url: String,
}

impl fmt::Debug for HttpIdentityLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpIdentityLookup")
            .field("userinfo_url", &self.userinfo_url)
            .finish_non_exhaustive()
    }
}

impl HttpIdentityLookup {
    /// Lookup against `{identity_provider_uri}/oauth2/userinfo`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, identity_provider_uri: &str) -> Self {
        Self {
            http_client,
            userinfo_url: format!(
                "{}{USERINFO_PATH}",
                identity_provider_uri.trim_end_matches('/')
            ),
        }
    }

    /// Full URL of the userinfo endpoint.
    #[must_use]
    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }

    async fn request_user_info(&self, authorization: &SecretString) -> Result<UserInfo, LookupError> {
        let mut header = HeaderValue::from_str(authorization.expose_secret())
            .map_err(|e| LookupError::HttpError(format!("Invalid Authorization header: {e}")))?;
        header.set_sensitive(true);

        let response = self
            .http_client
            .get(&self.userinfo_url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "tenant_auth.identity", error = %e, "Userinfo request failed");
                LookupError::HttpError(e.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                target: "tenant_auth.identity",
                status = %status,
                "Userinfo endpoint returned unexpected status"
            );
            return Err(LookupError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        response.json::<UserInfo>().await.map_err(|e| {
            warn!(target: "tenant_auth.identity", error = %e, "Failed to parse userinfo response");
            LookupError::InvalidResponse(e.to_string())
        })
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityLookup {
    #[instrument(skip_all)]
    async fn user_info(&self, authorization: &SecretString) -> Result<UserInfo, LookupError> {
        let result = self.request_user_info(authorization).await;
        record_identity_lookup(if result.is_ok() { "success" } else { "error" });
        result
    }
}

/// Mock identity lookup for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed result and counts calls.
    pub struct MockIdentityLookup {
        response: Result<UserInfo, LookupError>,
        call_count: AtomicUsize,
    }

    impl MockIdentityLookup {
        /// Mock that always answers with `user_info`.
        #[must_use]
        pub fn returning(user_info: UserInfo) -> Self {
            Self {
                response: Ok(user_info),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Mock that always fails with `error`.
        #[must_use]
        pub fn failing(error: LookupError) -> Self {
            Self {
                response: Err(error),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Number of lookups made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityLookup for MockIdentityLookup {
        async fn user_info(&self, _authorization: &SecretString) -> Result<UserInfo, LookupError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }
}
