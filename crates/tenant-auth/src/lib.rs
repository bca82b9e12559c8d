//! Tenant-scoped authorization and outbound service credentials.
//!
//! Two halves share this crate:
//!
//! - **Inbound**: [`resolver::RequestAuthorization`] decides whether the caller
//!   of a request holds a [`rights::Right`] for a tenant, trusting the claims an
//!   upstream authorizer attached to the request first and asking the identity
//!   provider's userinfo endpoint only when those claims are missing.
//! - **Outbound**: [`http_client::CredentialedHttpClient`] signs requests with a
//!   bearer token, either a fixed end-user token or a backend token obtained via
//!   the OAuth 2.0 client credentials grant and refreshed lazily on use.

#![warn(clippy::pedantic)]

/// Module for the permission model (rights, tenants, grants)
pub mod rights;

/// Module for the lazily refreshed single-slot cache
pub mod cache;

/// Module for unverified JWT payload decoding
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for backend client credentials
pub mod credentials;

/// Module for OAuth 2.0 client credentials token acquisition
pub mod authenticator;

/// Module for the bearer-signing outbound HTTP client
pub mod http_client;

/// Module for the identity provider userinfo lookup
pub mod identity;

/// Module for access to upstream-populated request claims
pub mod claims;

/// Module for per-request authorization resolution
pub mod resolver;

/// Module for explicit configuration
pub mod config;

/// Module for shared authorization error types
pub mod error;

/// Module for metrics and log correlation helpers
pub mod observability;

pub use authenticator::{TokenAuthenticator, TokenError};
pub use cache::{ExpiringValueCache, ValueSource};
pub use config::{Config, ConfigError};
pub use credentials::Credentials;
pub use error::AuthError;
pub use http_client::{ClientError, CredentialedHttpClient};
pub use identity::{HttpIdentityLookup, IdentityLookup, LookupError, UserInfo};
pub use resolver::RequestAuthorization;
pub use rights::{Right, RightGrant, RightsError, TenantId};
