//! Organization entity, the tenant boundary.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::org_member::OrgRole;

/// Organization entity. Every group and every organization-scoped membership
/// references one of these.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organization")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Organization name, globally unique.
    #[sea_orm(unique)]
    pub name: String,

    /// User who created and administers the organization.
    #[sea_orm(indexed)]
    pub owner_id: String,

    #[sea_orm(nullable)]
    pub industry: Option<String>,

    #[sea_orm(nullable)]
    pub logo_url: Option<String>,

    /// Whether guest accounts may be added as members.
    #[sea_orm(default_value = false)]
    pub allow_guest_users: bool,

    /// Role assigned to new members unless specified.
    pub default_role: OrgRole,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,

    #[sea_orm(has_many = "super::org_member::Entity")]
    Members,

    #[sea_orm(has_many = "super::group::Entity")]
    Groups,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::org_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
