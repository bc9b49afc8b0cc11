//! Group message entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::direct_message::MessageKind;

/// Message scoped to a group. Sending requires a current `GroupMember` row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_message")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    #[sea_orm(indexed)]
    pub sender_id: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    pub message_type: MessageKind,

    #[sea_orm(nullable)]
    pub file_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id"
    )]
    Sender,

    #[sea_orm(has_many = "super::group_message_seen::Entity")]
    SeenBy,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::group_message_seen::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeenBy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
