//! Auth bridge: exchanges a resolved session for a tenant-scoped token.

use axum::{Json, Router, extract::State, routing::post};
use tracing::info;

use crate::{AppState, error::ApiError, middleware::TenantContext};
use keystone_shared::BridgeToken;

/// Creates the bridge routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/bridge-token", post(issue_bridge_token))
}

/// POST /auth/bridge-token - Issues a 24h token carrying the current context.
async fn issue_bridge_token(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<BridgeToken>, ApiError> {
    let token = state
        .token_bridge
        .issue(&tenant.principal, &tenant.context)?;

    info!(
        user_id = %tenant.context.user_id,
        organization_id = %tenant.context.organization_id,
        role = %tenant.context.role,
        expires_at = %token.expires_at,
        "Bridge token issued"
    );

    Ok(Json(token))
}
