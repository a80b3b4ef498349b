//! Database layer with `SeaORM` entities, migrations and RLS propagation.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the tenancy tables
//! - Migrations installing the policy accessor functions and policies
//! - [`rls`], which runs work inside transactions scoped to one tenant
//! - The Postgres-backed membership store used by the session resolver

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod rls;

pub use repositories::MembershipRepository;
pub use rls::{RlsConnection, RlsError, ScopedError, ensure_rls_enforced_role, run_scoped};

use std::time::Duration;

use keystone_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
