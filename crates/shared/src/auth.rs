//! Token claim types: the inbound identity assertion and the outbound bridge token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrganizationId, Principal, ResolvedContext, Role, UserId, WorkspaceId};

/// Claims of the identity assertion issued by the upstream identity provider.
///
/// Only the fields this service relies on are modelled; anything else the
/// provider adds is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user ID).
    pub sub: UserId,
    /// User email.
    #[serde(default)]
    pub email: String,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// Audience the provider issued the assertion for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl IdentityClaims {
    /// Creates identity claims for a principal.
    #[must_use]
    pub fn new(principal: &Principal, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: principal.id,
            email: principal.email.clone(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
            aud: None,
        }
    }

    /// Returns the principal this assertion identifies.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.sub,
            email: self.email.clone(),
        }
    }
}

/// Claims embedded in a bridge token.
///
/// Mirrors the resolved context exactly; minting one is not an independent
/// authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeClaims {
    /// Subject (user ID).
    pub sub: UserId,
    /// User email.
    pub email: String,
    /// Organization the token is scoped to.
    pub org_id: OrganizationId,
    /// Role in that organization.
    pub role: Role,
    /// Permissions derived from the role.
    pub permissions: Vec<String>,
    /// Workspace allow-list of the membership (empty means unrestricted).
    pub allowed_workspaces: Vec<WorkspaceId>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl BridgeClaims {
    /// Builds bridge claims from a principal and its resolved context.
    #[must_use]
    pub fn new(
        principal: &Principal,
        context: &ResolvedContext,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: context.user_id,
            email: principal.email.clone(),
            org_id: context.organization_id,
            role: context.role,
            permissions: context
                .role
                .permissions()
                .iter()
                .map(ToString::to_string)
                .collect(),
            allowed_workspaces: context.allowed_workspaces.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }
}

/// A signed bridge token and its expiry.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeToken {
    /// Compact JWS.
    pub token: String,
    /// Token type, always `bearer`.
    pub token_type: &'static str,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Lifetime in seconds.
    pub expires_in: i64,
}
