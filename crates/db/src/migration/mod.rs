//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_tenancy_schema;
mod m20261001_000002_policy_accessors;
mod m20261001_000003_tenant_policies;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_tenancy_schema::Migration),
            Box::new(m20261001_000002_policy_accessors::Migration),
            Box::new(m20261001_000003_tenant_policies::Migration),
        ]
    }
}
