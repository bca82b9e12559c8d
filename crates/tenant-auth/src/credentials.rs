//! Backend client credentials for the OAuth 2.0 client credentials grant.
//!
//! The client id and secret are not stored by value. Each is a provider
//! function invoked on every token fetch, so rotated secrets (for example a
//! re-read environment variable or secrets-manager value) take effect on the
//! next refresh without rebuilding the client.

use crate::secret::SecretString;
use std::fmt;
use std::sync::Arc;

/// Path of the token endpoint, relative to the identity provider base URI.
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Path of the userinfo endpoint, relative to the identity provider base URI.
pub const USERINFO_PATH: &str = "/oauth2/userinfo";

/// Function producing a secret on demand; `None` when it is unavailable.
pub type SecretProvider = Arc<dyn Fn() -> Option<SecretString> + Send + Sync>;

/// Client id/secret providers plus the identity provider they authenticate to.
#[derive(Clone)]
pub struct Credentials {
    client_id: SecretProvider,
    client_secret: SecretProvider,
    identity_provider_uri: String,
}

impl Credentials {
    /// Create credentials from two provider functions.
    ///
    /// A trailing `/` on `identity_provider_uri` is dropped.
    pub fn new<I, S>(client_id: I, client_secret: S, identity_provider_uri: &str) -> Self
    where
        I: Fn() -> Option<SecretString> + Send + Sync + 'static,
        S: Fn() -> Option<SecretString> + Send + Sync + 'static,
    {
        Self {
            client_id: Arc::new(client_id),
            client_secret: Arc::new(client_secret),
            identity_provider_uri: identity_provider_uri.trim_end_matches('/').to_string(),
        }
    }

    /// Credentials with fixed values.
    #[must_use]
    pub fn from_static(
        client_id: SecretString,
        client_secret: SecretString,
        identity_provider_uri: &str,
    ) -> Self {
        Self::new(
            move || Some(client_id.clone()),
            move || Some(client_secret.clone()),
            identity_provider_uri,
        )
    }

    /// Credentials read from the named environment variables at each use.
    #[must_use]
    pub fn from_env_vars(id_var: String, secret_var: String, identity_provider_uri: &str) -> Self {
        Self::new(
            move || std::env::var(&id_var).ok().map(SecretString::from),
            move || std::env::var(&secret_var).ok().map(SecretString::from),
            identity_provider_uri,
        )
    }

    /// Read the client id now.
    #[must_use]
    pub fn client_id(&self) -> Option<SecretString> {
        (self.client_id)()
    }

    /// Read the client secret now.
    #[must_use]
    pub fn client_secret(&self) -> Option<SecretString> {
        (self.client_secret)()
    }

    /// Identity provider base URI, without a trailing `/`.
    #[must_use]
    pub fn identity_provider_uri(&self) -> &str {
        &self.identity_provider_uri
    }

    /// Full URL of the token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}{TOKEN_PATH}", self.identity_provider_uri)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &"[REDACTED]")
            .field("client_secret", &"[REDACTED]")
            .field("identity_provider_uri", &self.identity_provider_uri)
            .finish()
    }
}
