//! Group entity, an organization-scoped channel.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group entity - a named channel scoped to one organization.
///
/// Group names are unique per organization, not globally.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning organization.
    #[sea_orm(indexed)]
    pub org_id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// User who created the group (auto-added as admin member).
    #[sea_orm(indexed)]
    pub creator_id: String,

    #[sea_orm(default_value = false)]
    pub is_private: bool,

    #[sea_orm(nullable)]
    pub category: Option<String>,

    /// Number of members (denormalized). Maintained by the membership write
    /// paths; `count_members` is the authoritative value.
    #[sea_orm(default_value = 1)]
    pub members_count: i64,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrgId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::group_member::Entity")]
    Members,
    #[sea_orm(has_many = "super::group_message::Entity")]
    Messages,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::group_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
