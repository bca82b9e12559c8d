//! Fixed test IDs for deterministic tests

// Tenants
pub const TEST_TENANT_A: &str = "https://example.org/tenants/a";
pub const TEST_TENANT_B: &str = "https://example.org/tenants/b";

// Backend client credentials
pub const TEST_CLIENT_ID: &str = "backend-test-client";
pub const TEST_CLIENT_SECRET: &str = "test-secret-do-not-use-in-production";

// Callers
pub const TEST_USERNAME: &str = "alice@example.org";
pub const TEST_PERSON_ID: &str = "person-100";
pub const TEST_CALLER_AUTHORIZATION: &str = "Bearer caller-test-token";

// Scopes
pub const SCOPE_OPENID: &str = "openid";
pub const SCOPE_BACKEND: &str = "https://api.example.org/scopes/backend";
