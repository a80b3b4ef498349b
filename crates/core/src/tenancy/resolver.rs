//! Session resolution.
//!
//! Maps an authenticated user plus an advisory [`SessionHint`] onto the
//! tenant context the request will run under. Read-only; nothing is cached
//! between calls, so a deactivated membership stops resolving immediately.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use keystone_shared::types::{OrganizationId, ResolvedContext, UserId};

use super::hint::SessionHint;
use super::membership::Membership;
use super::store::{MembershipStore, StoreError};

/// Outcome of a resolution that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The user has an active membership; this is the context to use.
    Found(ResolvedContext),
    /// The user has no active membership anywhere. Expected, not an error.
    NoAccess,
}

/// Resolution could not be completed.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The membership store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Picks the membership a request should act within.
///
/// Only active memberships of `user_id` are candidates. A hinted organization
/// wins if it is among them; otherwise the earliest-joined membership is used.
#[must_use]
pub fn select_membership(
    memberships: &[Membership],
    user_id: UserId,
    hint: Option<OrganizationId>,
) -> Option<&Membership> {
    let mut candidates: Vec<&Membership> = memberships
        .iter()
        .filter(|m| m.is_active && m.user_id == user_id)
        .collect();
    candidates.sort_by_key(|m| m.selection_key());

    if let Some(org) = hint {
        if let Some(hinted) = candidates.iter().copied().find(|m| m.organization_id == org) {
            return Some(hinted);
        }
        debug!(%user_id, hinted_org = %org, "Organization hint does not match an active membership, ignoring");
    }

    candidates.first().copied()
}

/// Resolves tenant contexts from memberships.
#[derive(Clone)]
pub struct SessionResolver {
    store: Arc<dyn MembershipStore>,
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver").finish_non_exhaustive()
    }
}

impl SessionResolver {
    /// Creates a resolver reading through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Resolves the context for `user_id`, honouring `hint` where it is valid.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Store` if the membership store fails.
    pub async fn resolve(
        &self,
        user_id: UserId,
        hint: &SessionHint,
    ) -> Result<Resolution, ResolveError> {
        let memberships = self.store.active_memberships(user_id).await?;

        let Some(membership) = select_membership(&memberships, user_id, hint.organization_id)
        else {
            return Ok(Resolution::NoAccess);
        };

        let mut workspace_id = None;
        if let Some(ws) = hint.workspace_id {
            if membership.permits_workspace(ws)
                && self
                    .store
                    .workspace_in_organization(user_id, membership.organization_id, ws)
                    .await?
            {
                workspace_id = Some(ws);
            } else {
                debug!(%user_id, workspace_id = %ws, "Workspace hint not permitted, ignoring");
            }
        }

        Ok(Resolution::Found(ResolvedContext {
            user_id,
            organization_id: membership.organization_id,
            workspace_id,
            role: membership.role,
            allowed_workspaces: membership.allowed_workspaces.clone(),
        }))
    }

    /// Returns the user's active memberships in selection order.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Store` if the membership store fails.
    pub async fn memberships(&self, user_id: UserId) -> Result<Vec<Membership>, ResolveError> {
        let mut memberships: Vec<Membership> = self
            .store
            .active_memberships(user_id)
            .await?
            .into_iter()
            .filter(|m| m.is_active && m.user_id == user_id)
            .collect();
        memberships.sort_by_key(Membership::selection_key);
        Ok(memberships)
    }
}
