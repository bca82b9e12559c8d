//! Explicit configuration for the authorization components.
//!
//! Configuration is loaded from environment variables once and passed to
//! constructors. Backend client secrets are never stored here; only the
//! names of the variables holding them are, and those are read at each
//! token fetch.

use crate::authenticator::{TokenAuthenticator, DEFAULT_EXPIRY_MARGIN, MAX_EXPIRY_MARGIN};
use crate::credentials::Credentials;
use crate::http_client::CredentialedHttpClient;
use crate::identity::HttpIdentityLookup;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default name of the variable holding the backend client id.
pub const DEFAULT_CLIENT_ID_VAR: &str = "BACKEND_CLIENT_ID";

/// Default name of the variable holding the backend client secret.
pub const DEFAULT_CLIENT_SECRET_VAR: &str = "BACKEND_CLIENT_SECRET";

/// Default HTTP timeout for identity provider and outbound calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Authorization configuration.
#[derive(Clone)]
pub struct Config {
    /// Identity provider base URI, without trailing `/`.
    pub identity_provider_uri: String,

    /// Name of the variable holding the backend client id.
    pub client_id_var: String,

    /// Name of the variable holding the backend client secret.
    pub client_secret_var: String,

    /// Time before `exp` at which a backend token counts as expired.
    pub token_expiry_margin: Duration,

    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
}

/// Custom Debug implementation that hides the credential variable names.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("identity_provider_uri", &self.identity_provider_uri)
            .field("client_id_var", &"[REDACTED]")
            .field("client_secret_var", &"[REDACTED]")
            .field("token_expiry_margin", &self.token_expiry_margin)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `IDENTITY_PROVIDER_URI` is missing or any
    /// value fails validation.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw_uri = vars
            .get("IDENTITY_PROVIDER_URI")
            .ok_or_else(|| ConfigError::MissingEnvVar("IDENTITY_PROVIDER_URI".to_string()))?;
        let identity_provider_uri = raw_uri.trim_end_matches('/').to_string();
        url::Url::parse(&identity_provider_uri).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "IDENTITY_PROVIDER_URI must be a valid URL, got '{raw_uri}': {e}"
            ))
        })?;

        let client_id_var = vars
            .get("BACKEND_CLIENT_ID_VAR")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CLIENT_ID_VAR.to_string());

        let client_secret_var = vars
            .get("BACKEND_CLIENT_SECRET_VAR")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CLIENT_SECRET_VAR.to_string());

        let token_expiry_margin = if let Some(value_str) = vars.get("TOKEN_EXPIRY_MARGIN_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "TOKEN_EXPIRY_MARGIN_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?;

            if value > MAX_EXPIRY_MARGIN.as_secs() {
                return Err(ConfigError::InvalidValue(format!(
                    "TOKEN_EXPIRY_MARGIN_SECONDS must not exceed {} seconds, got {value}",
                    MAX_EXPIRY_MARGIN.as_secs()
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_EXPIRY_MARGIN
        };

        let http_timeout = if let Some(value_str) = vars.get("HTTP_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "HTTP_TIMEOUT_SECONDS must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidValue(
                    "HTTP_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_HTTP_TIMEOUT
        };

        Ok(Self {
            identity_provider_uri,
            client_id_var,
            client_secret_var,
            token_expiry_margin,
            http_timeout,
        })
    }

    /// Build the reqwest transport with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the TLS backend fails to
    /// initialize.
    pub fn build_http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }

    /// Backend credentials read from the configured variables at each use.
    #[must_use]
    pub fn backend_credentials(&self) -> Credentials {
        Credentials::from_env_vars(
            self.client_id_var.clone(),
            self.client_secret_var.clone(),
            &self.identity_provider_uri,
        )
    }

    /// Userinfo lookup against the configured identity provider.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the transport cannot be built.
    pub fn identity_lookup(&self) -> Result<HttpIdentityLookup, ConfigError> {
        Ok(HttpIdentityLookup::new(
            self.build_http_client()?,
            &self.identity_provider_uri,
        ))
    }

    /// Backend-mode outbound client using the configured credentials and
    /// expiry margin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the transport cannot be built.
    pub fn backend_client(&self) -> Result<CredentialedHttpClient, ConfigError> {
        let http_client = self.build_http_client()?;
        let authenticator = TokenAuthenticator::new(self.backend_credentials(), http_client.clone())
            .with_expiry_margin(self.token_expiry_margin);
        Ok(CredentialedHttpClient::with_authenticator(
            http_client,
            authenticator,
        ))
    }
}
