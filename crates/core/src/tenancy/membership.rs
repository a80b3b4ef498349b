//! Organization membership domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keystone_shared::types::{OrganizationId, Role, UserId, WorkspaceId};

/// Binds a user to an organization they may act within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// The member.
    pub user_id: UserId,
    /// The organization.
    pub organization_id: OrganizationId,
    /// Role within the organization.
    pub role: Role,
    /// Inactive memberships are never selected.
    pub is_active: bool,
    /// Workspaces the member may use; empty means all of them.
    pub allowed_workspaces: Vec<WorkspaceId>,
    /// When the user joined the organization.
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Returns true if the allow-list admits `workspace`.
    #[must_use]
    pub fn permits_workspace(&self, workspace: WorkspaceId) -> bool {
        self.allowed_workspaces.is_empty() || self.allowed_workspaces.contains(&workspace)
    }

    /// Sort key used to pick the default membership: join order, then
    /// organization id so equal timestamps still order deterministically.
    #[must_use]
    pub fn selection_key(&self) -> (DateTime<Utc>, OrganizationId) {
        (self.joined_at, self.organization_id)
    }
}
