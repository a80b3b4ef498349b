//! Read access to memberships.

use async_trait::async_trait;
use thiserror::Error;

use keystone_shared::types::{OrganizationId, UserId, WorkspaceId};

use super::membership::Membership;

/// The membership store could not be reached or failed.
///
/// Never used to signal "no membership"; that is an empty result.
#[derive(Debug, Clone, Error)]
#[error("membership store unavailable: {0}")]
pub struct StoreError(pub String);

/// Source of membership data for the session resolver.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Returns the active memberships of `user_id`.
    async fn active_memberships(&self, user_id: UserId) -> Result<Vec<Membership>, StoreError>;

    /// Returns true if `workspace_id` exists and belongs to `organization_id`.
    async fn workspace_in_organization(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        workspace_id: WorkspaceId,
    ) -> Result<bool, StoreError>;
}
