//! Outbound HTTP client that signs every request with a bearer token.
//!
//! Two mutually exclusive modes:
//!
//! - **Static token**: a fixed bearer string, typically an end user's token
//!   forwarded so the downstream service acts on that user's behalf. Never
//!   refreshed.
//! - **Backend credentials**: a token obtained with the client credentials
//!   grant via [`TokenAuthenticator`], cached in an [`ExpiringValueCache`].
//!
//! # Hidden token refresh
//!
//! In backend mode, [`CredentialedHttpClient::send`] may make one extra POST to
//! the identity provider's token endpoint BEFORE the visible request: on first
//! use, and whenever the cached token is within its expiry margin. Tests that
//! count outbound calls must account for it. Nothing is retried: a failed token
//! fetch or transport error is returned to the caller as-is.

use crate::authenticator::{TokenAuthenticator, TokenError};
use crate::cache::ExpiringValueCache;
use crate::credentials::Credentials;
use crate::secret::{ExposeSecret, SecretString};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

// =============================================================================
// Error Types
// =============================================================================

/// Errors returned by [`CredentialedHttpClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// A backend token could not be obtained.
    #[error("Failed to obtain access token: {0}")]
    Token(#[from] TokenError),

    /// The request has a streaming body and cannot be cloned.
    #[error("Request cannot be cloned")]
    UnclonableRequest,

    /// The token cannot be encoded as a header value.
    #[error("Invalid authorization header: {0}")]
    InvalidHeader(String),

    /// The request could not be built or sent.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

// =============================================================================
// Client
// =============================================================================

enum TokenSource {
    Static(SecretString),
    Backend(ExpiringValueCache<TokenAuthenticator>),
}

/// Bearer-signing wrapper around a `reqwest::Client`.
///
/// Cloning is cheap and clones share one token cache.
#[derive(Clone)]
pub struct CredentialedHttpClient {
    http_client: reqwest::Client,
    source: Arc<TokenSource>,
}

impl fmt::Debug for CredentialedHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.source.as_ref() {
            TokenSource::Static(_) => "static",
            TokenSource::Backend(_) => "backend",
        };
        f.debug_struct("CredentialedHttpClient")
            .field("mode", &mode)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl CredentialedHttpClient {
    /// Client that always sends `token`.
    #[must_use]
    pub fn with_static_token(http_client: reqwest::Client, token: SecretString) -> Self {
        Self {
            http_client,
            source: Arc::new(TokenSource::Static(token)),
        }
    }

    /// Client that obtains and refreshes a backend token from `credentials`.
    ///
    /// The token exchange uses the same `reqwest::Client`.
    #[must_use]
    pub fn with_backend_credentials(http_client: reqwest::Client, credentials: Credentials) -> Self {
        let authenticator = TokenAuthenticator::new(credentials, http_client.clone());
        Self::with_authenticator(http_client, authenticator)
    }

    /// Backend-mode client over a preconfigured authenticator.
    #[must_use]
    pub fn with_authenticator(
        http_client: reqwest::Client,
        authenticator: TokenAuthenticator,
    ) -> Self {
        Self {
            http_client,
            source: Arc::new(TokenSource::Backend(ExpiringValueCache::new(authenticator))),
        }
    }

    /// The underlying transport, for building requests.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// The bearer token the next request would carry.
    ///
    /// In backend mode this fetches or refreshes the token when needed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Token` if a backend token cannot be obtained.
    pub async fn bearer_token(&self) -> Result<SecretString, ClientError> {
        match self.source.as_ref() {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Backend(cache) => {
                let decoded = cache.get_value().await.map_err(|e| {
                    warn!(target: "tenant_auth.http_client", error = %e, "Backend token unavailable");
                    e
                })?;
                Ok(decoded.token().clone())
            }
        }
    }

    /// Send a copy of `request` with `Authorization: Bearer <token>` set.
    ///
    /// The caller's request is not modified; any Authorization header on the
    /// copy is replaced. Non-2xx responses are returned, not turned into errors.
    ///
    /// # Errors
    ///
    /// - `Token` - backend token could not be obtained (request not sent)
    /// - `UnclonableRequest` - the request body is a stream
    /// - `InvalidHeader` - the token is not a valid header value
    /// - `Transport` - the request failed in transit
    #[instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
    pub async fn send(&self, request: &reqwest::Request) -> Result<reqwest::Response, ClientError> {
        let mut signed = request.try_clone().ok_or(ClientError::UnclonableRequest)?;

        let token = self.bearer_token().await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        signed.headers_mut().insert(AUTHORIZATION, value);

        let response = self.http_client.execute(signed).await.map_err(|e| {
            debug!(target: "tenant_auth.http_client", error = %e, "Outbound request failed");
            ClientError::Transport(e)
        })?;

        debug!(
            target: "tenant_auth.http_client",
            status = %response.status(),
            "Outbound request completed"
        );

        Ok(response)
    }

    /// Build `builder` and [`send`](Self::send) it.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus `Transport` if the request cannot be built.
    pub async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let request = builder.build()?;
        self.send(&request).await
    }
}
