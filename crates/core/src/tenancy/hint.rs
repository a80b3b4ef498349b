//! Advisory session hints.
//!
//! Hints come straight from client cookies. They only steer which of the
//! user's memberships is selected; they never grant anything on their own.

use keystone_shared::types::{OrganizationId, WorkspaceId};

/// Client-supplied preferences for the current organization and workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionHint {
    /// Preferred organization.
    pub organization_id: Option<OrganizationId>,
    /// Preferred workspace.
    pub workspace_id: Option<WorkspaceId>,
}

impl SessionHint {
    /// A hint that expresses no preference.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            organization_id: None,
            workspace_id: None,
        }
    }

    /// A hint naming an organization only.
    #[must_use]
    pub const fn organization(organization_id: OrganizationId) -> Self {
        Self {
            organization_id: Some(organization_id),
            workspace_id: None,
        }
    }

    /// Builds a hint from raw cookie values.
    ///
    /// Malformed values are dropped rather than rejected: a stale or tampered
    /// cookie must never turn into an error for the request.
    #[must_use]
    pub fn from_cookie_values(organization: Option<&str>, workspace: Option<&str>) -> Self {
        Self {
            organization_id: organization.and_then(OrganizationId::parse_lenient),
            workspace_id: workspace.and_then(WorkspaceId::parse_lenient),
        }
    }
}
