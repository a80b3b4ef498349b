//! Tenant resolution and scoped execution for request handlers.
//!
//! Runs after [`super::auth::auth_middleware`]. Resolves the principal's
//! active membership from the hint cookies and stores a [`TenantContext`];
//! handlers then take a [`TenantScope`] and run their data access through
//! [`TenantScope::run`], which wraps it in one RLS-scoped transaction.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use futures::future::BoxFuture;
use sea_orm::DatabaseConnection;
use tracing::{debug, info};

use crate::{AppState, error::ApiError};
use keystone_core::tenancy::{Resolution, SessionHint};
use keystone_db::rls::{RlsConnection, run_scoped};
use keystone_shared::{AppError, Principal, ResolvedContext, SessionConfig};

/// The authenticated principal and the context resolved for this request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Who is calling.
    pub principal: Principal,
    /// Which organization, workspace and role they act under.
    pub context: ResolvedContext,
}

/// Reads the advisory organization and workspace cookies.
pub fn session_hint(jar: &CookieJar, config: &SessionConfig) -> SessionHint {
    SessionHint::from_cookie_values(
        jar.get(&config.organization_cookie).map(|c| c.value()),
        jar.get(&config.workspace_cookie).map(|c| c.value()),
    )
}

/// Resolves the tenant context for the authenticated principal.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(principal) = request.extensions().get::<Principal>().cloned() else {
        return Err(AppError::Unauthorized("authentication required".to_string()).into());
    };

    let hint = session_hint(&CookieJar::from_headers(request.headers()), &state.session);

    let context = match state.resolver.resolve(principal.id, &hint).await? {
        Resolution::Found(context) => context,
        Resolution::NoAccess => {
            info!(user_id = %principal.id, "Principal has no active organization membership");
            return Err(AppError::Forbidden("no organization access".to_string()).into());
        }
    };

    debug!(
        user_id = %context.user_id,
        organization_id = %context.organization_id,
        role = %context.role,
        "Tenant context resolved"
    );

    request
        .extensions_mut()
        .insert(TenantContext { principal, context });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError(AppError::Internal("tenant context missing".to_string())))
    }
}

/// Runs handler data access inside the request's RLS scope.
///
/// ```ignore
/// async fn handler(scope: TenantScope) -> Result<Json<Vec<Workspace>>, ApiError> {
///     let rows = scope
///         .run(|conn| Box::pin(async move {
///             Ok(workspaces::Entity::find().all(conn.transaction()).await?)
///         }))
///         .await?;
///     Ok(Json(rows))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TenantScope {
    db: Arc<DatabaseConnection>,
    tenant: TenantContext,
}

impl TenantScope {
    /// The principal and context this scope runs under.
    #[must_use]
    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    /// Runs `operation` in one transaction scoped to this request's context.
    ///
    /// Commits on success and rolls back on error. A failure to set the
    /// context is `RLS_CONTEXT_ERROR`; the operation's own errors pass
    /// through unchanged.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, ApiError>
    where
        F: for<'c> FnOnce(&'c RlsConnection) -> BoxFuture<'c, Result<T, ApiError>> + Send,
        T: Send,
    {
        debug!(organization_id = %self.tenant.context.organization_id, "Executing scoped unit");
        run_scoped(&self.db, &self.tenant.context, operation)
            .await
            .map_err(ApiError::from)
    }
}

impl FromRequestParts<AppState> for TenantScope {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let tenant = TenantContext::from_request_parts(parts, state).await?;
        Ok(Self {
            db: Arc::clone(&state.db),
            tenant,
        })
    }
}
