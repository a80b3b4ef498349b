//! Row-Level Security (RLS) context propagation.
//!
//! Every tenant-scoped operation runs inside one transaction that first sets
//! four transaction-local `PostgreSQL` settings. The `app_current_*` accessor
//! functions installed by the migrations read them back and the row-security
//! policies compare against those accessors, so a transaction that never set
//! them sees no tenant rows at all.
//!
//! # Usage
//!
//! ```ignore
//! use keystone_db::rls::run_scoped;
//!
//! let names = run_scoped(&db, &context, |conn| {
//!     Box::pin(async move {
//!         workspaces::Entity::find().all(conn.transaction()).await
//!     })
//! })
//! .await?;
//! ```

use futures::future::BoxFuture;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
    TransactionTrait,
};
use thiserror::Error;
use tracing::{debug, error, warn};

use keystone_shared::types::{OrganizationId, ResolvedContext, UserId};

/// Sets all four variables in one round trip. The third argument of
/// `set_config` scopes each value to the current transaction.
const SET_CONTEXT_SQL: &str = "SELECT \
    set_config('app.current_user_id', $1, true), \
    set_config('app.current_organization_id', $2, true), \
    set_config('app.current_workspace_id', $3, true), \
    set_config('app.current_role', $4, true)";

const ROLE_CHECK_SQL: &str = "SELECT rolname::text AS role_name, rolsuper, rolbypassrls \
    FROM pg_roles WHERE rolname = current_user";

/// Failure to establish or finish an RLS-scoped transaction.
#[derive(Debug, Error)]
pub enum RlsError {
    /// The transaction could not be started.
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] DbErr),

    /// The session variables could not be set. The transaction was rolled back.
    #[error("failed to set RLS context: {0}")]
    Context(#[source] DbErr),

    /// The transaction could not be committed.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] DbErr),
}

/// Error from [`run_scoped`]: either the unit itself failed or the operation did.
#[derive(Debug, Error)]
pub enum ScopedError<E> {
    /// Begin, context or commit failure.
    #[error(transparent)]
    Rls(#[from] RlsError),

    /// The operation returned an error; the transaction was rolled back.
    #[error("{0}")]
    Operation(E),
}

/// The string values written to the four session variables.
///
/// Absent values are the empty string, never omitted, so a pooled connection
/// cannot carry a previous transaction's value into this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionVariables {
    user_id: String,
    organization_id: String,
    workspace_id: String,
    role: String,
}

impl SessionVariables {
    /// Variables for a fully resolved tenant context.
    #[must_use]
    pub fn for_context(context: &ResolvedContext) -> Self {
        Self {
            user_id: context.user_id.to_string(),
            organization_id: context.organization_id.to_string(),
            workspace_id: context
                .workspace_id
                .map(|ws| ws.to_string())
                .unwrap_or_default(),
            role: context.role.as_str().to_string(),
        }
    }

    /// Variables naming only the user, for reads that precede resolution.
    #[must_use]
    pub fn for_principal(user_id: UserId) -> Self {
        Self {
            user_id: user_id.to_string(),
            organization_id: String::new(),
            workspace_id: String::new(),
            role: String::new(),
        }
    }

    /// Variables naming the user and an organization but no role.
    #[must_use]
    pub fn for_organization(user_id: UserId, organization_id: OrganizationId) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            ..Self::for_principal(user_id)
        }
    }

    /// The `set_config` statement carrying these values.
    #[must_use]
    pub fn statement(&self) -> Statement {
        Statement::from_sql_and_values(
            DbBackend::Postgres,
            SET_CONTEXT_SQL,
            [
                self.user_id.clone().into(),
                self.organization_id.clone().into(),
                self.workspace_id.clone().into(),
                self.role.clone().into(),
            ],
        )
    }
}

/// Begins a transaction and sets `variables` on it.
///
/// If setting the variables fails the transaction is rolled back before the
/// error is returned; nothing can run against a half-initialised context.
///
/// # Errors
///
/// Returns `RlsError::Begin` or `RlsError::Context`.
pub async fn begin_with(
    db: &DatabaseConnection,
    variables: &SessionVariables,
) -> Result<DatabaseTransaction, RlsError> {
    let txn = db.begin().await.map_err(RlsError::Begin)?;

    if let Err(e) = txn.execute(variables.statement()).await {
        error!(error = %e, "Failed to set RLS session variables, rolling back");
        if let Err(rollback_err) = txn.rollback().await {
            warn!(error = %rollback_err, "Rollback after context failure also failed");
        }
        return Err(RlsError::Context(e));
    }

    Ok(txn)
}

/// A transaction whose RLS context has been set for one tenant.
///
/// Handlers receive this from [`run_scoped`] and issue every query through
/// [`RlsConnection::transaction`]. The context it was opened with is
/// available through [`RlsConnection::context`].
pub struct RlsConnection {
    txn: DatabaseTransaction,
    context: ResolvedContext,
}

impl std::fmt::Debug for RlsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RlsConnection")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl RlsConnection {
    /// Begins a transaction scoped to `context`.
    ///
    /// # Errors
    ///
    /// Returns `RlsError::Begin` or `RlsError::Context`.
    pub async fn begin(db: &DatabaseConnection, context: &ResolvedContext) -> Result<Self, RlsError> {
        let txn = begin_with(db, &SessionVariables::for_context(context)).await?;
        debug!(
            user_id = %context.user_id,
            organization_id = %context.organization_id,
            role = %context.role,
            "RLS context set"
        );
        Ok(Self {
            txn,
            context: context.clone(),
        })
    }

    /// The transaction all scoped queries must use.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// The tenant context this transaction was opened with.
    #[must_use]
    pub fn context(&self) -> &ResolvedContext {
        &self.context
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RlsError::Commit` if the commit fails.
    pub async fn commit(self) -> Result<(), RlsError> {
        self.txn.commit().await.map_err(RlsError::Commit)
    }

    /// Rolls back the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Runs `operation` inside one transaction scoped to `context`.
///
/// Commits and returns the value on `Ok`; rolls back and returns the
/// operation's error untouched on `Err`. If the returned future is dropped
/// before completion the transaction is dropped too, which rolls it back.
///
/// # Errors
///
/// Returns `ScopedError::Rls` when the unit cannot be opened or committed and
/// `ScopedError::Operation` when `operation` fails.
pub async fn run_scoped<T, E, F>(
    db: &DatabaseConnection,
    context: &ResolvedContext,
    operation: F,
) -> Result<T, ScopedError<E>>
where
    F: for<'c> FnOnce(&'c RlsConnection) -> BoxFuture<'c, Result<T, E>> + Send,
    T: Send,
    E: Send,
{
    let conn = RlsConnection::begin(db, context).await?;

    match operation(&conn).await {
        Ok(value) => {
            conn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = conn.rollback().await {
                warn!(error = %rollback_err, "Rollback after operation failure failed");
            }
            Err(ScopedError::Operation(e))
        }
    }
}

/// Privileges of the role the pool connects as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRole {
    /// Role name.
    pub name: String,
    /// `SUPERUSER` attribute.
    pub is_superuser: bool,
    /// `BYPASSRLS` attribute.
    pub bypasses_rls: bool,
}

impl DatabaseRole {
    /// Returns true if row-security policies apply to this role.
    #[must_use]
    pub fn is_subject_to_rls(&self) -> bool {
        !self.is_superuser && !self.bypasses_rls
    }
}

/// The connecting role is exempt from row-security, or could not be checked.
#[derive(Debug, Error)]
pub enum RoleCheckError {
    /// The role lookup failed.
    #[error("failed to inspect database role: {0}")]
    Query(#[from] DbErr),

    /// The role is a superuser or has `BYPASSRLS`.
    #[error("database role '{}' bypasses row-level security", .0.name)]
    Bypass(DatabaseRole),
}

/// Checks that the pool's role is subject to row-level security.
///
/// Superusers and `BYPASSRLS` roles ignore every policy, even forced ones.
///
/// # Errors
///
/// Returns `RoleCheckError::Bypass` for an exempt role and
/// `RoleCheckError::Query` if `pg_roles` cannot be read.
pub async fn ensure_rls_enforced_role(db: &DatabaseConnection) -> Result<DatabaseRole, RoleCheckError> {
    let row = db
        .query_one(Statement::from_string(DbBackend::Postgres, ROLE_CHECK_SQL))
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("current_user missing from pg_roles".to_string()))?;

    let role = DatabaseRole {
        name: row.try_get("", "role_name")?,
        is_superuser: row.try_get("", "rolsuper")?,
        bypasses_rls: row.try_get("", "rolbypassrls")?,
    };

    if role.is_subject_to_rls() {
        Ok(role)
    } else {
        Err(RoleCheckError::Bypass(role))
    }
}

#[cfg(test)]
#[path = "rls_tests.rs"]
mod tests;
