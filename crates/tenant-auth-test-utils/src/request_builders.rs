//! Builders for inbound gateway request events and userinfo bodies.

use serde_json::{json, Map, Value};

/// Builder for a gateway request event carrying authorizer claims.
///
/// # Example
/// ```rust,ignore
/// let event = RequestEventBuilder::new()
///     .with_grant("user", TEST_TENANT_A)
///     .with_grant("approve_request", TEST_TENANT_A)
///     .with_authorization(TEST_CALLER_AUTHORIZATION)
///     .build();
/// ```
#[derive(Default)]
pub struct RequestEventBuilder {
    grants: Vec<String>,
    claims: Map<String, Value>,
    authorization: Option<String>,
}

impl RequestEventBuilder {
    /// Event without claims or headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `right@tenant` entry to the `cognito:groups` claim
    pub fn with_grant(mut self, right: &str, tenant: &str) -> Self {
        self.grants.push(format!("{right}@{tenant}"));
        self
    }

    /// Set an arbitrary string claim
    pub fn with_claim(mut self, name: &str, value: &str) -> Self {
        self.claims
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    /// Set the `custom:username` claim
    pub fn with_username(self, username: &str) -> Self {
        self.with_claim("custom:username", username)
    }

    /// Set the `custom:personId` claim
    pub fn with_person_id(self, person_id: &str) -> Self {
        self.with_claim("custom:personId", person_id)
    }

    /// Set the `scope` claim
    pub fn with_scope(self, scope: &str) -> Self {
        self.with_claim("scope", scope)
    }

    /// Set the `Authorization` header
    pub fn with_authorization(mut self, value: &str) -> Self {
        self.authorization = Some(value.to_string());
        self
    }

    /// Build the event JSON
    pub fn build(self) -> Value {
        let mut claims = self.claims;
        if !self.grants.is_empty() {
            claims.insert(
                "cognito:groups".to_string(),
                Value::String(self.grants.join(",")),
            );
        }

        let headers = self
            .authorization
            .map(|value| json!({ "Authorization": value }))
            .unwrap_or_else(|| json!({}));

        json!({
            "httpMethod": "GET",
            "path": "/",
            "headers": headers,
            "requestContext": { "authorizer": { "claims": claims } }
        })
    }
}

/// Builder for a userinfo endpoint response body.
#[derive(Default)]
pub struct UserInfoBuilder {
    fields: Map<String, Value>,
    grants: Vec<String>,
}

impl UserInfoBuilder {
    /// Response with only a subject
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder
            .fields
            .insert("sub".to_string(), Value::String("test-subject".to_string()));
        builder
    }

    /// Set `custom:currentTenant`
    pub fn current_tenant(mut self, tenant: &str) -> Self {
        self.fields.insert(
            "custom:currentTenant".to_string(),
            Value::String(tenant.to_string()),
        );
        self
    }

    /// Add a `right@tenant` entry to `custom:accessRights`
    pub fn with_grant(mut self, right: &str, tenant: &str) -> Self {
        self.grants.push(format!("{right}@{tenant}"));
        self
    }

    /// Set `custom:username`
    pub fn username(mut self, username: &str) -> Self {
        self.fields.insert(
            "custom:username".to_string(),
            Value::String(username.to_string()),
        );
        self
    }

    /// Build the response JSON
    pub fn build(self) -> Value {
        let mut fields = self.fields;
        if !self.grants.is_empty() {
            fields.insert(
                "custom:accessRights".to_string(),
                Value::String(self.grants.join(",")),
            );
        }
        Value::Object(fields)
    }
}
