//! Mock identity provider for integration tests
//!
//! Wraps a `wiremock::MockServer` serving `/oauth2/token` and
//! `/oauth2/userinfo`.

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token endpoint path.
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Userinfo endpoint path.
pub const USERINFO_PATH: &str = "/oauth2/userinfo";

/// Mock identity provider
///
/// # Example
/// ```rust,ignore
/// let idp = MockIdentityProvider::start().await;
/// idp.issue_token(&TestTokenBuilder::new().build_jwt()).await;
/// let credentials = Credentials::from_static(id, secret, &idp.uri());
/// ```
pub struct MockIdentityProvider {
    server: MockServer,
}

impl MockIdentityProvider {
    /// Start a mock server on a random local port
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URI to configure as the identity provider
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// The underlying server, for custom mocks
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Answer every token request with `access_token`
    pub async fn issue_token(&self, access_token: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer `count` token requests with `access_token`, then fall through
    /// to later mocks
    pub async fn issue_token_times(&self, access_token: &str, count: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "Bearer"
            })))
            .up_to_n_times(count)
            .expect(count)
            .mount(&self.server)
            .await;
    }

    /// Reject every token request with `status`
    pub async fn reject_token(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": "invalid_client"
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer userinfo requests carrying `authorization` with `body`
    pub async fn serve_userinfo(&self, authorization: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .and(header("authorization", authorization))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer userinfo requests with `status`
    pub async fn fail_userinfo(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received on `endpoint_path`
    pub async fn request_count(&self, endpoint_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == endpoint_path)
            .count()
    }
}
