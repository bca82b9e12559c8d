//! Secret types for client secrets and bearer tokens.
//!
//! Re-exports [`secrecy`] so the rest of the crate (and its callers) name one
//! place for secret handling. `SecretString` redacts itself in `Debug`, so a
//! struct deriving `Debug` over a secret field cannot leak it through `{:?}`
//! or `tracing`, and the value is zeroized on drop.
//!
//! Use `SecretString` for:
//! - OAuth client ids and secrets read from the environment
//! - Backend access tokens returned by the token endpoint
//! - End-user bearer tokens handed to a static-token client
//!
//! # Example
//!
//! ```rust
//! use tenant_auth::secret::{ExposeSecret, SecretString};
//!
//! let token = SecretString::from("eyJhbGciOi...");
//! assert!(format!("{token:?}").contains("REDACTED"));
//!
//! let header = format!("Bearer {}", token.expose_secret());
//! assert!(header.starts_with("Bearer "));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
