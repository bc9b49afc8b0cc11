//! Create `group_message` and `group_message_seen` tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GroupMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GroupMessage::GroupId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupMessage::SenderId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupMessage::Body).text().not_null())
                    .col(
                        ColumnDef::new(GroupMessage::MessageType)
                            .string_len(20)
                            .not_null()
                            .default("text"),
                    )
                    .col(ColumnDef::new(GroupMessage::FileUrl).string_len(512))
                    .col(
                        ColumnDef::new(GroupMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_group")
                            .from(GroupMessage::Table, GroupMessage::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_sender")
                            .from(GroupMessage::Table, GroupMessage::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index for message history lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_group_created")
                    .table(GroupMessage::Table)
                    .col(GroupMessage::GroupId)
                    .col(GroupMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMessageSeen::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMessageSeen::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GroupMessageSeen::MessageId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupMessageSeen::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupMessageSeen::SeenAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_seen_message")
                            .from(GroupMessageSeen::Table, GroupMessageSeen::MessageId)
                            .to(GroupMessage::Table, GroupMessage::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_seen_user")
                            .from(GroupMessageSeen::Table, GroupMessageSeen::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Set semantics: one seen row per (message, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_seen_message_user")
                    .table(GroupMessageSeen::Table)
                    .col(GroupMessageSeen::MessageId)
                    .col(GroupMessageSeen::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupMessageSeen::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GroupMessage {
    Table,
    Id,
    GroupId,
    SenderId,
    Body,
    MessageType,
    FileUrl,
    CreatedAt,
}

#[derive(Iden)]
enum GroupMessageSeen {
    Table,
    Id,
    MessageId,
    UserId,
    SeenAt,
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
