//! Organization member entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of an organization member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    /// Admin - can manage members and privileged endpoints.
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Regular member.
    #[sea_orm(string_value = "member")]
    Member,
    /// Guest - limited access, only allowed when the organization permits it.
    #[sea_orm(string_value = "guest")]
    Guest,
}

impl Default for OrgRole {
    fn default() -> Self {
        Self::Member
    }
}

impl OrgRole {
    /// Check if the role can manage members and privileged settings.
    #[must_use]
    pub fn can_manage(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Organization member - tracks which users belong to which organizations.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "org_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The organization.
    #[sea_orm(indexed)]
    pub org_id: String,

    /// The user who is a member. Unique together with `org_id`.
    #[sea_orm(indexed)]
    pub user_id: String,

    pub role: OrgRole,

    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrgId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
