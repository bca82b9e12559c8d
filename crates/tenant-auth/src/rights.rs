//! Permission model: rights, tenants and `right@tenant` grants.
//!
//! A [`RightGrant`] proves that a caller may exercise one [`Right`] for one
//! tenant. Grants travel as `lower(right)@tenant-uri`; a batch of grants is a
//! comma-joined list with no ordering guarantee.
//!
//! # Wire format
//!
//! ```text
//! approve_request@https://example.org/tenants/1,user@https://example.org/tenants/1
//! ```
//!
//! - Rights are matched case-insensitively and always rendered lowercase.
//! - Tenants must be URI-shaped and never contain `@`, `,` or whitespace, so a
//!   grant splits into exactly two `@`-delimited segments.
//! - Blank entries in a list are skipped; duplicates are preserved.
//! - One malformed entry fails the whole batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between the right and the tenant of a single grant.
pub const GRANT_SEPARATOR: char = '@';

/// Separator between grants in a batch.
pub const GRANT_LIST_SEPARATOR: char = ',';

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while parsing rights, tenants or grants.
///
/// These always indicate bad caller data and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RightsError {
    /// The string is not one of the known rights.
    #[error("Invalid right: {0}")]
    InvalidRight(String),

    /// The grant does not have exactly two `@`-delimited segments.
    #[error("Malformed grant: {0}")]
    MalformedGrant(String),

    /// The tenant identifier is not URI-shaped.
    #[error("Invalid tenant identifier: {0}")]
    InvalidTenant(String),
}

// =============================================================================
// Right
// =============================================================================

/// A single named permission from a closed set.
///
/// [`Right::User`] is a pseudo-right: it marks the tenant an end user logged in
/// under and carries no elevated permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Right {
    /// Authenticated end user, no elevated permission.
    User,
    /// Publish files on behalf of the tenant.
    PublishFiles,
    /// Approve a pending request.
    ApproveRequest,
    /// Reject a pending request.
    RejectRequest,
    /// Read pending requests.
    ReadRequest,
    /// Approve a publishing request.
    ApprovePublishRequest,
    /// Edit resources owned by the tenant.
    EditOwnTenantResources,
    /// Manage the tenant's users.
    ManageTenantUsers,
    /// Full administrative access.
    Administer,
}

impl Right {
    /// Every right, in declaration order.
    pub const ALL: [Right; 9] = [
        Right::User,
        Right::PublishFiles,
        Right::ApproveRequest,
        Right::RejectRequest,
        Right::ReadRequest,
        Right::ApprovePublishRequest,
        Right::EditOwnTenantResources,
        Right::ManageTenantUsers,
        Right::Administer,
    ];

    /// Lowercase wire name of the right.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Right::User => "user",
            Right::PublishFiles => "publish_files",
            Right::ApproveRequest => "approve_request",
            Right::RejectRequest => "reject_request",
            Right::ReadRequest => "read_request",
            Right::ApprovePublishRequest => "approve_publish_request",
            Right::EditOwnTenantResources => "edit_own_tenant_resources",
            Right::ManageTenantUsers => "manage_tenant_users",
            Right::Administer => "administer",
        }
    }

    /// Whether this right grants anything beyond being a logged-in user.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        self != Right::User
    }

    /// Parse a right, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns `RightsError::InvalidRight` if `raw` names no known right.
    pub fn parse(raw: &str) -> Result<Self, RightsError> {
        Self::ALL
            .into_iter()
            .find(|right| right.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| RightsError::InvalidRight(raw.to_string()))
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Right {
    type Err = RightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Right> for &'static str {
    fn from(right: Right) -> Self {
        right.as_str()
    }
}

impl TryFrom<String> for Right {
    type Error = RightsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

// =============================================================================
// TenantId
// =============================================================================

/// URI-shaped tenant identifier.
///
/// Only the shape is checked; whether the tenant exists is not this crate's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Validate and wrap a tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns `RightsError::InvalidTenant` if `raw` is empty, contains a
    /// grant delimiter or whitespace, or is not an absolute URI.
    pub fn parse(raw: &str) -> Result<Self, RightsError> {
        let has_forbidden_char = raw
            .chars()
            .any(|c| c == GRANT_SEPARATOR || c == GRANT_LIST_SEPARATOR || c.is_whitespace());

        if raw.is_empty() || has_forbidden_char {
            return Err(RightsError::InvalidTenant(raw.to_string()));
        }

        url::Url::parse(raw).map_err(|_| RightsError::InvalidTenant(raw.to_string()))?;

        Ok(Self(raw.to_string()))
    }

    /// The identifier as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = RightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<TenantId> for String {
    fn from(tenant: TenantId) -> Self {
        tenant.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = RightsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

// =============================================================================
// RightGrant
// =============================================================================

/// Immutable `(Right, TenantId)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RightGrant {
    right: Right,
    tenant: TenantId,
}

impl RightGrant {
    /// Create a grant of `right` for `tenant`.
    #[must_use]
    pub fn new(right: Right, tenant: TenantId) -> Self {
        Self { right, tenant }
    }

    /// The granted right.
    #[must_use]
    pub fn right(&self) -> Right {
        self.right
    }

    /// The tenant the right applies to.
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }
}

impl fmt::Display for RightGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.right, GRANT_SEPARATOR, self.tenant)
    }
}

impl FromStr for RightGrant {
    type Err = RightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_grant(s)
    }
}

impl From<RightGrant> for String {
    fn from(grant: RightGrant) -> Self {
        grant.to_string()
    }
}

impl TryFrom<String> for RightGrant {
    type Error = RightsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_grant(&value)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Parse a single `right@tenant` grant.
///
/// Trailing `@` segments are rejected rather than ignored.
///
/// # Errors
///
/// - `MalformedGrant` - not exactly two `@`-delimited segments
/// - `InvalidRight` - unknown right
/// - `InvalidTenant` - tenant is not URI-shaped
pub fn parse_grant(raw: &str) -> Result<RightGrant, RightsError> {
    let mut segments = raw.split(GRANT_SEPARATOR);

    let (Some(right), Some(tenant), None) = (segments.next(), segments.next(), segments.next())
    else {
        return Err(RightsError::MalformedGrant(raw.to_string()));
    };

    Ok(RightGrant::new(Right::parse(right)?, TenantId::parse(tenant)?))
}

/// Parse a comma-joined grant list.
///
/// Entries are trimmed and blank entries skipped. Duplicates are kept.
///
/// # Errors
///
/// Returns the first entry's error if any entry is malformed; no partial
/// results are returned.
pub fn parse_grant_list(csv: &str) -> Result<Vec<RightGrant>, RightsError> {
    csv.split(GRANT_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_grant)
        .collect()
}

/// Render grants in the batch wire format.
#[must_use]
pub fn join_grants(grants: &[RightGrant]) -> String {
    grants
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Elevated rights held for `tenant`, without duplicates, in first-seen order.
#[must_use]
pub fn rights_for_tenant(grants: &[RightGrant], tenant: &TenantId) -> Vec<Right> {
    let mut rights = Vec::new();
    for grant in grants {
        if grant.tenant() == tenant && grant.right().is_elevated() && !rights.contains(&grant.right())
        {
            rights.push(grant.right());
        }
    }
    rights
}

// =============================================================================
// Tests
// =============================================================================
