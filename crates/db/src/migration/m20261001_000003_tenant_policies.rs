//! Row-level security policies for the tenancy tables.
//!
//! RLS is enabled and forced so the table owner is bound too. Every policy
//! compares against the `app_current_*` accessors; with no context set they
//! return NULL and no row qualifies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENABLE_RLS_SQL).await?;
        db.execute_unprepared(POLICIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DISABLE_RLS_SQL).await?;
        Ok(())
    }
}

const ENABLE_RLS_SQL: &str = r"
ALTER TABLE users ENABLE ROW LEVEL SECURITY;
ALTER TABLE organizations ENABLE ROW LEVEL SECURITY;
ALTER TABLE workspaces ENABLE ROW LEVEL SECURITY;
ALTER TABLE organization_memberships ENABLE ROW LEVEL SECURITY;

ALTER TABLE users FORCE ROW LEVEL SECURITY;
ALTER TABLE organizations FORCE ROW LEVEL SECURITY;
ALTER TABLE workspaces FORCE ROW LEVEL SECURITY;
ALTER TABLE organization_memberships FORCE ROW LEVEL SECURITY;
";

const POLICIES_SQL: &str = r"
CREATE POLICY tenant_isolation ON organizations
    USING (id = app_current_organization_id())
    WITH CHECK (id = app_current_organization_id());

CREATE POLICY tenant_isolation ON workspaces
    USING (organization_id = app_current_organization_id())
    WITH CHECK (organization_id = app_current_organization_id());

-- Own memberships are readable only before an organization is selected;
-- that is the resolver's unit. Tenant units see their organization only.
CREATE POLICY tenant_isolation ON organization_memberships
    USING (
        organization_id = app_current_organization_id()
        OR (app_current_organization_id() IS NULL AND user_id = app_current_user_id())
    )
    WITH CHECK (organization_id = app_current_organization_id());

CREATE POLICY admins_insert_members ON organization_memberships
    AS RESTRICTIVE FOR INSERT
    WITH CHECK (app_current_role() IN ('owner', 'admin'));

CREATE POLICY admins_update_members ON organization_memberships
    AS RESTRICTIVE FOR UPDATE
    USING (app_current_role() IN ('owner', 'admin'))
    WITH CHECK (app_current_role() IN ('owner', 'admin'));

CREATE POLICY admins_delete_members ON organization_memberships
    AS RESTRICTIVE FOR DELETE
    USING (app_current_role() IN ('owner', 'admin'));

CREATE POLICY self_or_colleague ON users
    USING (
        id = app_current_user_id()
        OR id IN (
            SELECT user_id FROM organization_memberships
            WHERE organization_id = app_current_organization_id()
        )
    )
    WITH CHECK (id = app_current_user_id());
";

const DISABLE_RLS_SQL: &str = r"
DROP POLICY IF EXISTS self_or_colleague ON users;
DROP POLICY IF EXISTS admins_delete_members ON organization_memberships;
DROP POLICY IF EXISTS admins_update_members ON organization_memberships;
DROP POLICY IF EXISTS admins_insert_members ON organization_memberships;
DROP POLICY IF EXISTS tenant_isolation ON organization_memberships;
DROP POLICY IF EXISTS tenant_isolation ON workspaces;
DROP POLICY IF EXISTS tenant_isolation ON organizations;

ALTER TABLE users NO FORCE ROW LEVEL SECURITY;
ALTER TABLE organizations NO FORCE ROW LEVEL SECURITY;
ALTER TABLE workspaces NO FORCE ROW LEVEL SECURITY;
ALTER TABLE organization_memberships NO FORCE ROW LEVEL SECURITY;

ALTER TABLE users DISABLE ROW LEVEL SECURITY;
ALTER TABLE organizations DISABLE ROW LEVEL SECURITY;
ALTER TABLE workspaces DISABLE ROW LEVEL SECURITY;
ALTER TABLE organization_memberships DISABLE ROW LEVEL SECURITY;
";
