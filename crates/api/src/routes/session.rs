//! Session routes: the current tenant context and the organization switcher.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar},
};
use sea_orm::{ConnectionTrait, DbBackend, QueryResult, Statement};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    AppState,
    error::ApiError,
    middleware::{AuthUser, TenantScope, tenant::session_hint},
};
use keystone_core::tenancy::{Resolution, SessionHint, select_membership};
use keystone_shared::{AppError, OrganizationId, ResolvedContext, Role, UserId, WorkspaceId};

/// Reads the propagated context back through the policy accessors.
const READ_CONTEXT_SQL: &str = "SELECT \
    app_current_user_id()::text AS user_id, \
    app_current_organization_id()::text AS organization_id, \
    app_current_workspace_id()::text AS workspace_id, \
    app_current_role() AS role";

/// Routes that need a resolved tenant context.
pub fn tenant_routes() -> Router<AppState> {
    Router::new().route("/session", get(current_session))
}

/// Routes that need only an authenticated principal.
pub fn principal_routes() -> Router<AppState> {
    Router::new()
        .route("/session/organizations", get(list_organizations))
        .route("/session/organization", put(switch_organization))
}

/// The tenant context as the database sees it.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Acting user.
    pub user_id: UserId,
    /// Principal's email.
    pub email: String,
    /// Current organization.
    pub organization_id: OrganizationId,
    /// Current workspace, if any.
    pub workspace_id: Option<WorkspaceId>,
    /// Role within the organization.
    pub role: Role,
    /// Permissions granted by the role.
    pub permissions: &'static [&'static str],
}

/// The four accessor values of one scoped unit.
#[derive(Debug, PartialEq, Eq)]
struct PropagatedContext {
    user_id: Option<String>,
    organization_id: Option<String>,
    workspace_id: Option<String>,
    role: Option<String>,
}

impl PropagatedContext {
    fn from_row(row: &QueryResult) -> Result<Self, ApiError> {
        Ok(Self {
            user_id: row.try_get("", "user_id")?,
            organization_id: row.try_get("", "organization_id")?,
            workspace_id: row.try_get("", "workspace_id")?,
            role: row.try_get("", "role")?,
        })
    }

    fn expected(context: &ResolvedContext) -> Self {
        Self {
            user_id: Some(context.user_id.to_string()),
            organization_id: Some(context.organization_id.to_string()),
            workspace_id: context.workspace_id.map(|ws| ws.to_string()),
            role: Some(context.role.as_str().to_string()),
        }
    }
}

/// GET /session - The current context, read back from the database.
async fn current_session(scope: TenantScope) -> Result<Json<SessionResponse>, ApiError> {
    let propagated = scope
        .run(|conn| {
            Box::pin(async move {
                let row = conn
                    .transaction()
                    .query_one(Statement::from_string(DbBackend::Postgres, READ_CONTEXT_SQL))
                    .await?
                    .ok_or_else(|| {
                        ApiError(AppError::Internal("context accessors returned no row".to_string()))
                    })?;
                PropagatedContext::from_row(&row)
            })
        })
        .await?;

    let tenant = scope.tenant();
    if propagated != PropagatedContext::expected(&tenant.context) {
        return Err(AppError::RlsContext(format!(
            "database reports {propagated:?}, request resolved {:?}",
            tenant.context
        ))
        .into());
    }

    let context = &tenant.context;
    Ok(Json(SessionResponse {
        user_id: context.user_id,
        email: tenant.principal.email.clone(),
        organization_id: context.organization_id,
        workspace_id: context.workspace_id,
        role: context.role,
        permissions: context.role.permissions(),
    }))
}

/// One entry of the organization switcher.
#[derive(Debug, Serialize)]
pub struct MembershipSummary {
    /// Organization.
    pub organization_id: OrganizationId,
    /// Role within it.
    pub role: Role,
    /// When the principal joined.
    pub joined_at: chrono::DateTime<chrono::Utc>,
    /// Workspace allow-list; empty means all.
    pub allowed_workspaces: Vec<WorkspaceId>,
    /// Whether a request from this client would resolve to it.
    pub current: bool,
}

/// GET /session/organizations - The principal's active memberships.
async fn list_organizations(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    jar: CookieJar,
) -> Result<Json<Vec<MembershipSummary>>, ApiError> {
    let memberships = state.resolver.memberships(principal.id).await?;
    let hint = session_hint(&jar, &state.session);
    let current = select_membership(&memberships, principal.id, hint.organization_id)
        .map(|m| m.organization_id);

    Ok(Json(
        memberships
            .into_iter()
            .map(|m| MembershipSummary {
                current: Some(m.organization_id) == current,
                organization_id: m.organization_id,
                role: m.role,
                joined_at: m.joined_at,
                allowed_workspaces: m.allowed_workspaces,
            })
            .collect(),
    ))
}

/// Request body for switching organization.
#[derive(Debug, Deserialize)]
pub struct SwitchOrganizationRequest {
    /// Organization to make current.
    pub organization_id: OrganizationId,
    /// Workspace to make current.
    #[serde(default)]
    pub workspace_id: Option<WorkspaceId>,
}

fn hint_cookie(name: &str, value: &str, max_age_days: i64) -> Result<Cookie<'static>, ApiError> {
    Cookie::parse(format!(
        "{name}={value}; Path=/; Max-Age={}; SameSite=Lax",
        max_age_days * 86_400
    ))
    .map_err(|e| ApiError(AppError::Internal(format!("invalid hint cookie: {e}"))))
}

/// PUT /session/organization - Validates membership and sets the hint cookies.
///
/// The cookies stay advisory: every later request re-validates them.
async fn switch_organization(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<SwitchOrganizationRequest>, ApiError>,
) -> Result<(CookieJar, Json<ResolvedContext>), ApiError> {
    let hint = SessionHint {
        organization_id: Some(payload.organization_id),
        workspace_id: payload.workspace_id,
    };

    let context = match state.resolver.resolve(principal.id, &hint).await? {
        Resolution::Found(ctx) if ctx.organization_id == payload.organization_id => ctx,
        Resolution::Found(_) | Resolution::NoAccess => {
            return Err(AppError::Forbidden("not a member of this organization".to_string()).into());
        }
    };

    if payload.workspace_id.is_some() && context.workspace_id != payload.workspace_id {
        return Err(AppError::Forbidden("workspace not accessible".to_string()).into());
    }

    let config = &state.session;
    let mut jar = jar.add(hint_cookie(
        &config.organization_cookie,
        &context.organization_id.to_string(),
        config.cookie_max_age_days,
    )?);
    jar = match context.workspace_id {
        Some(ws) => jar.add(hint_cookie(
            &config.workspace_cookie,
            &ws.to_string(),
            config.cookie_max_age_days,
        )?),
        None => jar.remove(Cookie::build((config.workspace_cookie.clone(), "")).path("/")),
    };

    info!(
        user_id = %principal.id,
        organization_id = %context.organization_id,
        "Current organization switched"
    );

    Ok((jar, Json(context)))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
