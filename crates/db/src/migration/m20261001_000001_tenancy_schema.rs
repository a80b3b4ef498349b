//! Tenancy schema: users, organizations, workspaces and memberships.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ORGANIZATIONS_SQL).await?;
        db.execute_unprepared(WORKSPACES_SQL).await?;
        db.execute_unprepared(MEMBERSHIPS_SQL).await?;

        // The application role is created by whoever provisions the database;
        // grant to it only when it exists so local setups still migrate.
        db.execute_unprepared(GRANTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE member_role AS ENUM (
    'owner', 'admin', 'manager', 'accountant', 'employee', 'viewer', 'ai_agent'
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const ORGANIZATIONS_SQL: &str = r"
CREATE TABLE organizations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    slug VARCHAR(100) NOT NULL UNIQUE,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const WORKSPACES_SQL: &str = r"
CREATE TABLE workspaces (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_workspaces_org ON workspaces(organization_id);
";

const MEMBERSHIPS_SQL: &str = r"
CREATE TABLE organization_memberships (
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    role member_role NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    allowed_workspace_ids UUID[] NOT NULL DEFAULT '{}',
    joined_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, organization_id)
);

CREATE INDEX idx_memberships_user_active
    ON organization_memberships(user_id, joined_at)
    WHERE is_active = true;
CREATE INDEX idx_memberships_org ON organization_memberships(organization_id);
";

const GRANTS_SQL: &str = r"
DO $$
BEGIN
    IF EXISTS (SELECT 1 FROM pg_roles WHERE rolname = 'keystone_app') THEN
        GRANT SELECT, INSERT, UPDATE, DELETE
            ON users, organizations, workspaces, organization_memberships
            TO keystone_app;
    END IF;
END
$$;
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS organization_memberships CASCADE;
DROP TABLE IF EXISTS workspaces CASCADE;
DROP TABLE IF EXISTS organizations CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TYPE IF EXISTS member_role;
";
