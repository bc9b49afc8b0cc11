//! Per-user seen marker for group messages.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per (message, user) that has seen it. Append-only; inserting the
/// same pair twice is a no-op at the write path.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_message_seen")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The message. Unique together with `user_id`.
    #[sea_orm(indexed)]
    pub message_id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    pub seen_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group_message::Entity",
        from = "Column::MessageId",
        to = "super::group_message::Column::Id",
        on_delete = "Cascade"
    )]
    Message,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::group_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
