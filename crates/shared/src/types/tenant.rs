//! Tenant context types shared by the resolver, the database layer and the API.

use serde::{Deserialize, Serialize};

use super::{OrganizationId, UserId, WorkspaceId};

/// Roles a member can hold inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including organization settings and ownership.
    Owner,
    /// Full access except organization-level settings.
    Admin,
    /// Runs day-to-day operations: sales, purchasing, inventory.
    Manager,
    /// Books, banking and reporting.
    Accountant,
    /// Creates operational documents, limited reads.
    Employee,
    /// Read-only.
    Viewer,
    /// Automated agent acting on behalf of the organization, read-only.
    AiAgent,
}

impl Role {
    /// Every role, in decreasing order of privilege.
    pub const ALL: [Self; 7] = [
        Self::Owner,
        Self::Admin,
        Self::Manager,
        Self::Accountant,
        Self::Employee,
        Self::Viewer,
        Self::AiAgent,
    ];

    /// Returns the wire/database name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Accountant => "accountant",
            Self::Employee => "employee",
            Self::Viewer => "viewer",
            Self::AiAgent => "ai_agent",
        }
    }

    /// Permissions granted by this role, as `resource:action` strings.
    ///
    /// These are embedded in bridge tokens so a secondary client can make
    /// coarse UI decisions; the database policies remain the enforcement point.
    #[must_use]
    pub const fn permissions(&self) -> &'static [&'static str] {
        match self {
            Self::Owner => &[
                "organization:manage",
                "members:manage",
                "accounting:write",
                "banking:write",
                "sales:write",
                "purchasing:write",
                "inventory:write",
                "reports:read",
            ],
            Self::Admin => &[
                "organization:read",
                "members:manage",
                "accounting:write",
                "banking:write",
                "sales:write",
                "purchasing:write",
                "inventory:write",
                "reports:read",
            ],
            Self::Manager => &[
                "accounting:read",
                "banking:read",
                "sales:write",
                "purchasing:write",
                "inventory:write",
                "reports:read",
            ],
            Self::Accountant => &[
                "accounting:write",
                "banking:write",
                "sales:read",
                "purchasing:read",
                "reports:read",
            ],
            Self::Employee => &["sales:write", "purchasing:write", "inventory:read"],
            Self::Viewer => &[
                "accounting:read",
                "banking:read",
                "sales:read",
                "purchasing:read",
                "inventory:read",
                "reports:read",
            ],
            Self::AiAgent => &[
                "accounting:read",
                "sales:read",
                "purchasing:read",
                "inventory:read",
                "reports:read",
            ],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// An authenticated identity, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User ID.
    pub id: UserId,
    /// User email.
    pub email: String,
}

/// The tenant context a single request runs under.
///
/// Recomputed for every request and never cached. `organization_id` always
/// refers to an active membership of `user_id` and `role` is that
/// membership's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContext {
    /// The acting user.
    pub user_id: UserId,
    /// The selected organization.
    pub organization_id: OrganizationId,
    /// The selected workspace, if any.
    pub workspace_id: Option<WorkspaceId>,
    /// The member's role in the selected organization.
    pub role: Role,
    /// Workspace allow-list of the membership (empty means unrestricted).
    ///
    /// Only carried into bridge tokens; never written to the database session.
    #[serde(default)]
    pub allowed_workspaces: Vec<WorkspaceId>,
}
