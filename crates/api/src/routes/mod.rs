//! API route definitions.

use axum::{Router, middleware};

use crate::{
    AppState,
    middleware::{auth_middleware, tenant_middleware},
};

pub mod bridge;
pub mod health;
pub mod session;

/// Creates the API router with public, principal-scoped and tenant-scoped routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Need an active membership
    let tenant_routes = Router::new()
        .merge(session::tenant_routes())
        .merge(bridge::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_middleware,
        ));

    // Need only a verified identity
    let protected_routes = Router::new()
        .merge(session::principal_routes())
        .merge(tenant_routes)
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
