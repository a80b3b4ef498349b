//! Database migration runner for Keystone.
//!
//! Run it with an administrative `DATABASE_URL`; the server itself connects
//! as a role subject to row-level security.
//!
//! Usage:
//!   migrator up      - Apply pending migrations (schema, accessors, policies)
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use keystone_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // sets up its own tracing
    cli::run_cli(Migrator).await;
}
