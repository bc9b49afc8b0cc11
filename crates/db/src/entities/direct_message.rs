//! Direct message entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of message payload.
///
/// Direct messages carry `text` or `file`; `image` only appears on group
/// messages. The send paths validate this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "file")]
    File,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

/// One-to-one message between two users sharing an organization.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "direct_message")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub sender_id: String,

    /// Sender display name, snapshotted at send time. Not re-synced if the
    /// user later renames.
    pub sender_name: String,

    #[sea_orm(indexed)]
    pub receiver_id: String,

    /// Receiver display name, snapshotted at send time.
    pub receiver_name: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    pub message_type: MessageKind,

    #[sea_orm(nullable)]
    pub file_url: Option<String>,

    /// Starts false; transitions only false -> true via the receiver-side
    /// mark-seen, scoped to a specific sender.
    #[sea_orm(default_value = false)]
    pub seen: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id"
    )]
    Sender,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReceiverId",
        to = "super::user::Column::Id"
    )]
    Receiver,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
