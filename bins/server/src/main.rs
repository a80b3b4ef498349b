//! Keystone API Server
//!
//! Main entry point for the Keystone tenant-context service.

use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use keystone_api::{AppState, create_router};
use keystone_core::tenancy::SessionResolver;
use keystone_db::{MembershipRepository, connect, ensure_rls_enforced_role, rls::RoleCheckError};
use keystone_shared::{AppConfig, JwtService, TokenBridge};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keystone=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    match ensure_rls_enforced_role(&db).await {
        Ok(role) => info!(role = %role.name, "Database role is subject to row-level security"),
        Err(RoleCheckError::Bypass(role)) if config.database.allow_rls_bypass_role => {
            warn!(
                role = %role.name,
                "Database role bypasses row-level security; tenant isolation is NOT enforced"
            );
        }
        Err(e) => bail!(e),
    }

    let db = Arc::new(db);
    let repository = MembershipRepository::new(Arc::clone(&db));
    let state = AppState {
        db,
        resolver: Arc::new(SessionResolver::new(Arc::new(repository))),
        jwt_service: Arc::new(JwtService::new(&config.auth)),
        token_bridge: Arc::new(TokenBridge::new(&config.bridge)),
        auth: Arc::new(config.auth.clone()),
        session: Arc::new(config.session.clone()),
        expose_error_details: config.server.is_development(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        %addr,
        environment = ?config.server.environment,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
