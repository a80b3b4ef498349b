//! `SeaORM` active enums mirroring Postgres enum types.

use keystone_shared::types::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Postgres `member_role` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "member_role")]
pub enum MemberRole {
    /// owner
    #[sea_orm(string_value = "owner")]
    Owner,
    /// admin
    #[sea_orm(string_value = "admin")]
    Admin,
    /// manager
    #[sea_orm(string_value = "manager")]
    Manager,
    /// accountant
    #[sea_orm(string_value = "accountant")]
    Accountant,
    /// employee
    #[sea_orm(string_value = "employee")]
    Employee,
    /// viewer
    #[sea_orm(string_value = "viewer")]
    Viewer,
    /// `ai_agent`
    #[sea_orm(string_value = "ai_agent")]
    AiAgent,
}

impl From<MemberRole> for Role {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Owner => Self::Owner,
            MemberRole::Admin => Self::Admin,
            MemberRole::Manager => Self::Manager,
            MemberRole::Accountant => Self::Accountant,
            MemberRole::Employee => Self::Employee,
            MemberRole::Viewer => Self::Viewer,
            MemberRole::AiAgent => Self::AiAgent,
        }
    }
}

impl From<Role> for MemberRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Owner => Self::Owner,
            Role::Admin => Self::Admin,
            Role::Manager => Self::Manager,
            Role::Accountant => Self::Accountant,
            Role::Employee => Self::Employee,
            Role::Viewer => Self::Viewer,
            Role::AiAgent => Self::AiAgent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_role_matches_shared_role_names() {
        for role in Role::ALL {
            let db_role = MemberRole::from(role);
            assert_eq!(db_role.to_value(), role.as_str());
            assert_eq!(Role::from(db_role), role);
        }
    }
}
