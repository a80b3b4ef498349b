//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Identity and tenant-resolution middleware
//! - The [`middleware::TenantScope`] extractor for RLS-scoped data access
//! - Session and auth bridge routes
//! - The JSON error envelope

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use keystone_core::tenancy::SessionResolver;
use keystone_shared::{AuthConfig, JwtService, SessionConfig, TokenBridge};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Resolves tenant contexts from memberships.
    pub resolver: Arc<SessionResolver>,
    /// Verifies identity assertions.
    pub jwt_service: Arc<JwtService>,
    /// Issues bridge tokens.
    pub token_bridge: Arc<TokenBridge>,
    /// Identity settings (session cookie name).
    pub auth: Arc<AuthConfig>,
    /// Hint cookie settings.
    pub session: Arc<SessionConfig>,
    /// Include server-side error details in responses (development only).
    pub expose_error_details: bool,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let expose_error_details = state.expose_error_details;

    let router = Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    if expose_error_details {
        router.layer(axum::middleware::from_fn(error::expose_error_details))
    } else {
        router
    }
}
