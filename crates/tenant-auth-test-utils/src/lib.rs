//! # Tenant Auth Test Utilities
//!
//! Shared test utilities for the `tenant-auth` crate.
//!
//! This crate provides:
//! - Test data builders (`TestTokenBuilder`, `RequestEventBuilder`, `UserInfoBuilder`)
//! - A mock identity provider (`MockIdentityProvider`) serving the token and
//!   userinfo endpoints
//! - Fixed test IDs (tenants, client credentials)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tenant_auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let idp = MockIdentityProvider::start().await;
//!     idp.issue_token(&TestTokenBuilder::new().expires_in(3600).build_jwt()).await;
//!
//!     let event = RequestEventBuilder::new()
//!         .with_grant("user", TEST_TENANT_A)
//!         .build();
//! }
//! ```

pub mod identity_provider;
pub mod request_builders;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use identity_provider::*;
pub use request_builders::*;
pub use test_ids::*;
pub use token_builders::*;
