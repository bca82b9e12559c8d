//! Per-request authorization resolution.
//!
//! A [`RequestAuthorization`] answers two questions about the caller of one
//! inbound request: which tenant they are acting under, and whether they hold
//! a given [`Right`] for it. Every answer is tried offline first, from the
//! claims an upstream authorizer attached to the request, and only then
//! online, by forwarding the caller's `Authorization` header to the identity
//! provider's userinfo endpoint.
//!
//! The userinfo response is memoized for the lifetime of the value, so a
//! request makes at most one successful lookup. Nothing is shared between
//! requests.

use crate::claims::{ClaimsBag, CLIENT_ID_CLAIM, PERSON_ID_CLAIM, USERNAME_CLAIM};
use crate::error::{AuthError, Result};
use crate::identity::{IdentityLookup, UserInfo};
use crate::observability::{record_authorization, AuthorizationPath};
use crate::rights::{rights_for_tenant, Right, RightGrant, TenantId};
use crate::secret::SecretString;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

/// Scope carried by tokens issued to backend clients.
pub const DEFAULT_BACKEND_SCOPE: &str = "https://api.example.org/scopes/backend";

/// Authorization state of one inbound request.
pub struct RequestAuthorization {
    claims: ClaimsBag,
    authorization: Option<SecretString>,
    identity: Arc<dyn IdentityLookup>,
    backend_scope: String,
    user_info: OnceCell<UserInfo>,
}

impl fmt::Debug for RequestAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAuthorization")
            .field("claims", &self.claims)
            .field("has_authorization", &self.authorization.is_some())
            .field("backend_scope", &self.backend_scope)
            .field("user_info_cached", &self.user_info.initialized())
            .finish_non_exhaustive()
    }
}

impl RequestAuthorization {
    /// Authorization for a request with the given claims and raw
    /// `Authorization` header.
    #[must_use]
    pub fn new(
        claims: ClaimsBag,
        authorization: Option<SecretString>,
        identity: Arc<dyn IdentityLookup>,
    ) -> Self {
        Self {
            claims,
            authorization,
            identity,
            backend_scope: DEFAULT_BACKEND_SCOPE.to_string(),
            user_info: OnceCell::new(),
        }
    }

    /// Authorization for a gateway request event, reading claims from
    /// `requestContext.authorizer.claims` and the header from `headers`
    /// (header name matched case-insensitively).
    #[must_use]
    pub fn from_event(event: &Value, identity: Arc<dyn IdentityLookup>) -> Self {
        let authorization = event
            .get("headers")
            .and_then(Value::as_object)
            .and_then(|headers| {
                headers
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            })
            .and_then(|(_, value)| value.as_str())
            .map(|value| SecretString::from(value.to_string()));

        Self::new(ClaimsBag::from_event(event), authorization, identity)
    }

    /// Override the scope that marks backend clients.
    #[must_use]
    pub fn with_backend_scope(mut self, scope: impl Into<String>) -> Self {
        self.backend_scope = scope.into();
        self
    }

    /// The request's claims.
    #[must_use]
    pub fn claims(&self) -> &ClaimsBag {
        &self.claims
    }

    /// The tenant the caller logged in under.
    ///
    /// Offline, this is the tenant of the caller's `user` grant. Online, it is
    /// the userinfo `custom:currentTenant` field.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` if neither path yields a tenant, or
    /// `AuthError::Rights` if the online tenant is malformed.
    #[instrument(skip_all)]
    pub async fn current_tenant(&self) -> Result<TenantId> {
        match self.offline_tenant() {
            Ok(tenant) => return Ok(tenant),
            Err(e) => {
                debug!(target: "tenant_auth.resolver", reason = %e, "No offline tenant, asking identity provider");
            }
        }

        let info = self.user_info().await.map_err(|e| {
            debug!(target: "tenant_auth.resolver", error = %e, "Online tenant lookup failed");
            AuthError::Unauthorized("no tenant context for caller".to_string())
        })?;

        match info.current_tenant.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Ok(TenantId::parse(raw.trim())?),
            _ => Err(AuthError::Unauthorized(
                "no tenant context for caller".to_string(),
            )),
        }
    }

    /// Whether the caller holds `right` for their current tenant.
    ///
    /// Never fails: any error resolving the tenant or looking up grants
    /// denies.
    #[instrument(skip_all, fields(right = %right))]
    pub async fn is_authorized(&self, right: Right) -> bool {
        match self.current_tenant().await {
            Ok(tenant) => self.is_authorized_for(right, &tenant).await,
            Err(e) => {
                warn!(
                    target: "tenant_auth.resolver",
                    right = %right,
                    error = %e,
                    "Could not resolve current tenant, denying"
                );
                record_authorization(AuthorizationPath::None, false);
                false
            }
        }
    }

    /// Whether the caller holds `right` for an explicit `tenant`.
    ///
    /// Offline grants short-circuit; the identity provider is asked only when
    /// they do not contain the grant. Lookup failures deny.
    #[instrument(skip_all, fields(right = %right, tenant = %tenant))]
    pub async fn is_authorized_for(&self, right: Right, tenant: &TenantId) -> bool {
        let wanted = RightGrant::new(right, tenant.clone());

        match self.claims.grants() {
            Ok(grants) if grants.contains(&wanted) => {
                record_authorization(AuthorizationPath::Offline, true);
                return true;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(target: "tenant_auth.resolver", reason = %e, "Offline grants unavailable");
            }
        }

        let granted = match self.online_grants().await {
            Ok(grants) => grants.contains(&wanted),
            Err(e) => {
                debug!(target: "tenant_auth.resolver", error = %e, "Online grant lookup failed, denying");
                false
            }
        };

        let path = if granted {
            AuthorizationPath::Online
        } else {
            AuthorizationPath::None
        };
        record_authorization(path, granted);
        granted
    }

    /// Elevated rights the caller holds for their current tenant.
    ///
    /// Uses the offline grant list when the claims carry one, otherwise the
    /// userinfo grant list.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant cannot be resolved or neither grant
    /// list can be read.
    pub async fn access_rights(&self) -> Result<Vec<Right>> {
        let tenant = self.current_tenant().await?;
        let grants = match self.claims.grants() {
            Ok(grants) => grants,
            Err(_) => self.online_grants().await?,
        };
        Ok(rights_for_tenant(&grants, &tenant))
    }

    /// The caller's login name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingClaim` if neither the claims nor userinfo
    /// carry it, or the lookup error.
    pub async fn username(&self) -> Result<String> {
        if let Ok(username) = self.claims.get_str(USERNAME_CLAIM) {
            return Ok(username.to_string());
        }
        self.user_info()
            .await?
            .username
            .clone()
            .ok_or_else(|| AuthError::MissingClaim(USERNAME_CLAIM.to_string()))
    }

    /// The caller's person identifier.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingClaim` if neither the claims nor userinfo
    /// carry it, or the lookup error.
    pub async fn person_id(&self) -> Result<String> {
        if let Ok(person_id) = self.claims.get_str(PERSON_ID_CLAIM) {
            return Ok(person_id.to_string());
        }
        self.user_info()
            .await?
            .person_id
            .clone()
            .ok_or_else(|| AuthError::MissingClaim(PERSON_ID_CLAIM.to_string()))
    }

    /// Whether the token was issued to a backend client. Offline only.
    #[must_use]
    pub fn is_backend_client(&self) -> bool {
        self.claims.scopes().contains(&self.backend_scope.as_str())
    }

    /// OAuth client id of the caller's token. Offline only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingClaim` if the claim is absent.
    pub fn client_id(&self) -> Result<&str> {
        self.claims.get_str(CLIENT_ID_CLAIM)
    }

    fn offline_tenant(&self) -> Result<TenantId> {
        self.claims
            .grants()?
            .into_iter()
            .find(|grant| grant.right() == Right::User)
            .map(|grant| grant.tenant().clone())
            .ok_or_else(|| AuthError::Unauthorized("no user grant in claims".to_string()))
    }

    async fn online_grants(&self) -> Result<Vec<RightGrant>> {
        Ok(self.user_info().await?.grants()?)
    }

    async fn user_info(&self) -> Result<&UserInfo> {
        self.user_info
            .get_or_try_init(|| async {
                let authorization = self.authorization.as_ref().ok_or_else(|| {
                    AuthError::Unauthorized("request has no Authorization header".to_string())
                })?;
                let info = self.identity.user_info(authorization).await?;
                Ok::<_, AuthError>(info)
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::identity::mock::MockIdentityLookup;
    use crate::identity::LookupError;
    use serde_json::json;

    const TENANT_A: &str = "https://example.org/tenants/a";
    const TENANT_B: &str = "https://example.org/tenants/b";

    fn tenant(raw: &str) -> TenantId {
        TenantId::parse(raw).unwrap()
    }

    fn bearer() -> Option<SecretString> {
        Some(SecretString::from("Bearer caller-token"))
    }

    fn claims_with_groups(groups: &str) -> ClaimsBag {
        ClaimsBag::from_claims(json!({ "cognito:groups": groups }))
    }

    fn unused_lookup() -> Arc<MockIdentityLookup> {
        Arc::new(MockIdentityLookup::failing(LookupError::HttpError(
            "not expected".to_string(),
        )))
    }

    #[tokio::test]
    async fn test_offline_tenant_from_user_grant() {
        let lookup = unused_lookup();
        let auth = RequestAuthorization::new(
            claims_with_groups(&format!("publish_files@{TENANT_B},user@{TENANT_A}")),
            bearer(),
            lookup.clone(),
        );

        assert_eq!(auth.current_tenant().await.unwrap(), tenant(TENANT_A));
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_online_tenant_when_claims_missing() {
        let lookup = Arc::new(MockIdentityLookup::returning(UserInfo {
            current_tenant: Some(TENANT_B.to_string()),
            ..UserInfo::default()
        }));
        let auth = RequestAuthorization::new(ClaimsBag::default(), bearer(), lookup.clone());

        assert_eq!(auth.current_tenant().await.unwrap(), tenant(TENANT_B));
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_tenant_anywhere_is_unauthorized() {
        let lookup = Arc::new(MockIdentityLookup::returning(UserInfo::default()));
        let auth = RequestAuthorization::new(ClaimsBag::default(), bearer(), lookup);

        assert!(matches!(
            auth.current_tenant().await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_unauthorized() {
        let lookup = Arc::new(MockIdentityLookup::failing(LookupError::UnexpectedStatus {
            status: 401,
        }));
        let auth = RequestAuthorization::new(ClaimsBag::default(), bearer(), lookup);

        assert!(matches!(
            auth.current_tenant().await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_grant_short_circuits() {
        let lookup = unused_lookup();
        let auth = RequestAuthorization::new(
            claims_with_groups(&format!("user@{TENANT_A},approve_request@{TENANT_A}")),
            bearer(),
            lookup.clone(),
        );

        assert!(auth.is_authorized(Right::ApproveRequest).await);
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_online_fallback_uses_single_lookup() {
        let lookup = Arc::new(MockIdentityLookup::returning(UserInfo {
            current_tenant: Some(TENANT_A.to_string()),
            access_rights: Some(format!("approve_request@{TENANT_A}")),
            ..UserInfo::default()
        }));
        let auth = RequestAuthorization::new(ClaimsBag::default(), bearer(), lookup.clone());

        assert!(auth.is_authorized(Right::ApproveRequest).await);
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_closed_on_network_error() {
        let lookup = Arc::new(MockIdentityLookup::failing(LookupError::HttpError(
            "connection refused".to_string(),
        )));
        let auth = RequestAuthorization::new(ClaimsBag::default(), bearer(), lookup);

        for right in Right::ALL {
            assert!(!auth.is_authorized(right).await);
        }
    }

    #[tokio::test]
    async fn test_missing_header_fails_closed_without_lookup() {
        let lookup = unused_lookup();
        let auth = RequestAuthorization::new(ClaimsBag::default(), None, lookup.clone());

        assert!(!auth.is_authorized(Right::User).await);
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_grant_for_other_tenant_is_denied() {
        let lookup = Arc::new(MockIdentityLookup::returning(UserInfo::default()));
        let auth = RequestAuthorization::new(
            claims_with_groups(&format!("user@{TENANT_A},administer@{TENANT_B}")),
            bearer(),
            lookup,
        );

        assert!(!auth.is_authorized(Right::Administer).await);
        assert!(
            auth.is_authorized_for(Right::Administer, &tenant(TENANT_B))
                .await
        );
    }

    #[tokio::test]
    async fn test_reject_request_literal_scenario() {
        let claims = claims_with_groups("reject_request@https://example.org/t1");

        let lookup_t1 = Arc::new(MockIdentityLookup::returning(UserInfo {
            current_tenant: Some("https://example.org/t1".to_string()),
            ..UserInfo::default()
        }));
        let auth = RequestAuthorization::new(claims.clone(), bearer(), lookup_t1);
        assert!(auth.is_authorized(Right::RejectRequest).await);

        let lookup_t2 = Arc::new(MockIdentityLookup::returning(UserInfo {
            current_tenant: Some("https://example.org/t2".to_string()),
            ..UserInfo::default()
        }));
        let auth = RequestAuthorization::new(claims, bearer(), lookup_t2);
        assert!(!auth.is_authorized(Right::RejectRequest).await);
    }

    #[tokio::test]
    async fn test_malformed_offline_grants_fall_back_online() {
        let lookup = Arc::new(MockIdentityLookup::returning(UserInfo {
            current_tenant: Some(TENANT_A.to_string()),
            access_rights: Some(format!("read_request@{TENANT_A}")),
            ..UserInfo::default()
        }));
        let auth = RequestAuthorization::new(
            claims_with_groups("not-a-grant"),
            bearer(),
            lookup.clone(),
        );

        assert!(auth.is_authorized(Right::ReadRequest).await);
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_access_rights_offline() {
        let auth = RequestAuthorization::new(
            claims_with_groups(&format!(
                "user@{TENANT_A},publish_files@{TENANT_A},publish_files@{TENANT_A},administer@{TENANT_B}"
            )),
            bearer(),
            unused_lookup(),
        );

        assert_eq!(auth.access_rights().await.unwrap(), vec![Right::PublishFiles]);
    }

    #[tokio::test]
    async fn test_access_rights_online() {
        let auth = RequestAuthorization::new(
            ClaimsBag::default(),
            bearer(),
            Arc::new(MockIdentityLookup::returning(UserInfo {
                current_tenant: Some(TENANT_A.to_string()),
                access_rights: Some(format!("user@{TENANT_A},manage_tenant_users@{TENANT_A}")),
                ..UserInfo::default()
            })),
        );

        assert_eq!(
            auth.access_rights().await.unwrap(),
            vec![Right::ManageTenantUsers]
        );
    }

    #[tokio::test]
    async fn test_username_and_person_id_offline() {
        let lookup = unused_lookup();
        let auth = RequestAuthorization::new(
            ClaimsBag::from_claims(json!({
                "custom:username": "alice",
                "custom:personId": "p-1"
            })),
            bearer(),
            lookup.clone(),
        );

        assert_eq!(auth.username().await.unwrap(), "alice");
        assert_eq!(auth.person_id().await.unwrap(), "p-1");
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_username_and_person_id_online_share_lookup() {
        let lookup = Arc::new(MockIdentityLookup::returning(UserInfo {
            username: Some("bob".to_string()),
            person_id: Some("p-2".to_string()),
            ..UserInfo::default()
        }));
        let auth = RequestAuthorization::new(ClaimsBag::default(), bearer(), lookup.clone());

        assert_eq!(auth.username().await.unwrap(), "bob");
        assert_eq!(auth.person_id().await.unwrap(), "p-2");
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_username_missing_everywhere() {
        let auth = RequestAuthorization::new(
            ClaimsBag::default(),
            bearer(),
            Arc::new(MockIdentityLookup::returning(UserInfo::default())),
        );

        assert_eq!(
            auth.username().await.unwrap_err(),
            AuthError::MissingClaim(USERNAME_CLAIM.to_string())
        );
    }

    #[test]
    fn test_backend_client_scope() {
        let claims = ClaimsBag::from_claims(json!({
            "scope": format!("openid {DEFAULT_BACKEND_SCOPE}"),
            "client_id": "service-a"
        }));
        let auth = RequestAuthorization::new(claims.clone(), None, unused_lookup());

        assert!(auth.is_backend_client());
        assert_eq!(auth.client_id().unwrap(), "service-a");

        let auth = RequestAuthorization::new(claims, None, unused_lookup())
            .with_backend_scope("https://other.example.org/scopes/backend");
        assert!(!auth.is_backend_client());
    }

    #[test]
    fn test_from_event_reads_header_case_insensitively() {
        let event = json!({
            "headers": { "authorization": "Bearer from-event" },
            "requestContext": { "authorizer": { "claims": { "client_id": "c" } } }
        });
        let auth = RequestAuthorization::from_event(&event, unused_lookup());

        assert!(auth.authorization.is_some());
        assert_eq!(auth.client_id().unwrap(), "c");
    }

    #[test]
    fn test_debug_hides_header() {
        let auth = RequestAuthorization::new(ClaimsBag::default(), bearer(), unused_lookup());
        let debug_str = format!("{auth:?}");
        assert!(!debug_str.contains("caller-token"));
    }
}
