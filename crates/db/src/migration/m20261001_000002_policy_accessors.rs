//! Accessor functions that expose the request's tenant context to policies.
//!
//! Each reads one transaction-local setting. `current_setting(.., true)`
//! yields NULL when the setting was never defined and `NULLIF` maps the empty
//! marker (written for absent values, and left behind on reused connections)
//! to NULL as well. Policies compare against these, so a missing context
//! matches nothing.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ACCESSORS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ACCESSORS_SQL).await?;
        Ok(())
    }
}

const ACCESSORS_SQL: &str = r"
CREATE OR REPLACE FUNCTION app_current_user_id() RETURNS UUID
    LANGUAGE sql STABLE
AS $$
    SELECT NULLIF(current_setting('app.current_user_id', true), '')::UUID
$$;

CREATE OR REPLACE FUNCTION app_current_organization_id() RETURNS UUID
    LANGUAGE sql STABLE
AS $$
    SELECT NULLIF(current_setting('app.current_organization_id', true), '')::UUID
$$;

CREATE OR REPLACE FUNCTION app_current_workspace_id() RETURNS UUID
    LANGUAGE sql STABLE
AS $$
    SELECT NULLIF(current_setting('app.current_workspace_id', true), '')::UUID
$$;

CREATE OR REPLACE FUNCTION app_current_role() RETURNS TEXT
    LANGUAGE sql STABLE
AS $$
    SELECT NULLIF(current_setting('app.current_role', true), '')
$$;
";

const DROP_ACCESSORS_SQL: &str = r"
DROP FUNCTION IF EXISTS app_current_role();
DROP FUNCTION IF EXISTS app_current_workspace_id();
DROP FUNCTION IF EXISTS app_current_organization_id();
DROP FUNCTION IF EXISTS app_current_user_id();
";
