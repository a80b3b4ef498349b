//! `SeaORM` entities for the tenancy tables.

pub mod organization_memberships;
pub mod organizations;
pub mod sea_orm_active_enums;
pub mod users;
pub mod workspaces;
