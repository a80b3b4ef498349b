//! Membership repository backing the session resolver.
//!
//! Runs before any tenant context exists, so each read opens its own RLS
//! unit carrying just the user (and, for workspace checks, the organization
//! already selected). The policies still decide what is visible.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use thiserror::Error;
use tracing::debug;

use keystone_core::tenancy::{Membership, MembershipStore, StoreError};
use keystone_shared::types::{OrganizationId, UserId, WorkspaceId};

use crate::entities::{organization_memberships, workspaces};
use crate::rls::{RlsError, SessionVariables, begin_with};

/// Membership repository errors.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// The RLS unit could not be opened or committed.
    #[error(transparent)]
    Rls(#[from] RlsError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<MembershipError> for StoreError {
    fn from(err: MembershipError) -> Self {
        Self(err.to_string())
    }
}

/// Membership repository.
#[derive(Clone)]
pub struct MembershipRepository {
    db: Arc<DatabaseConnection>,
}

impl std::fmt::Debug for MembershipRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipRepository").finish_non_exhaustive()
    }
}

impl MembershipRepository {
    /// Creates a membership repository sharing the application's pool.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists the active memberships of `user_id`, earliest joined first.
    ///
    /// # Errors
    ///
    /// Returns an error if the RLS unit or the query fails.
    pub async fn find_active(&self, user_id: UserId) -> Result<Vec<Membership>, MembershipError> {
        let txn = begin_with(&self.db, &SessionVariables::for_principal(user_id)).await?;

        let rows = organization_memberships::Entity::find()
            .filter(organization_memberships::Column::UserId.eq(user_id.into_inner()))
            .filter(organization_memberships::Column::IsActive.eq(true))
            .order_by_asc(organization_memberships::Column::JoinedAt)
            .order_by_asc(organization_memberships::Column::OrganizationId)
            .all(&txn)
            .await?;

        txn.commit().await.map_err(RlsError::Commit)?;

        debug!(%user_id, count = rows.len(), "Loaded active memberships");
        Ok(rows.into_iter().map(to_membership).collect())
    }

    /// Returns true if `workspace_id` belongs to `organization_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the RLS unit or the query fails.
    pub async fn workspace_exists(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        workspace_id: WorkspaceId,
    ) -> Result<bool, MembershipError> {
        let txn = begin_with(
            &self.db,
            &SessionVariables::for_organization(user_id, organization_id),
        )
        .await?;

        let count = workspaces::Entity::find_by_id(workspace_id.into_inner())
            .filter(workspaces::Column::OrganizationId.eq(organization_id.into_inner()))
            .count(&txn)
            .await?;

        txn.commit().await.map_err(RlsError::Commit)?;

        Ok(count > 0)
    }
}

fn to_membership(row: organization_memberships::Model) -> Membership {
    Membership {
        user_id: UserId::from_uuid(row.user_id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        role: row.role.into(),
        is_active: row.is_active,
        allowed_workspaces: row
            .allowed_workspace_ids
            .into_iter()
            .map(WorkspaceId::from_uuid)
            .collect(),
        joined_at: row.joined_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl MembershipStore for MembershipRepository {
    async fn active_memberships(&self, user_id: UserId) -> Result<Vec<Membership>, StoreError> {
        Ok(self.find_active(user_id).await?)
    }

    async fn workspace_in_organization(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        workspace_id: WorkspaceId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .workspace_exists(user_id, organization_id, workspace_id)
            .await?)
    }
}
