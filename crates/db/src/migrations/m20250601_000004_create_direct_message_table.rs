//! Create `direct_message` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DirectMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DirectMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DirectMessage::SenderId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DirectMessage::SenderName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DirectMessage::ReceiverId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DirectMessage::ReceiverName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DirectMessage::Body).text().not_null())
                    .col(
                        ColumnDef::new(DirectMessage::MessageType)
                            .string_len(20)
                            .not_null()
                            .default("text"),
                    )
                    .col(ColumnDef::new(DirectMessage::FileUrl).string_len(512))
                    .col(
                        ColumnDef::new(DirectMessage::Seen)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DirectMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_direct_message_sender")
                            .from(DirectMessage::Table, DirectMessage::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_direct_message_receiver")
                            .from(DirectMessage::Table, DirectMessage::ReceiverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index for conversation history lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_direct_message_conversation")
                    .table(DirectMessage::Table)
                    .col(DirectMessage::SenderId)
                    .col(DirectMessage::ReceiverId)
                    .col(DirectMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: receiver for unseen counts
        manager
            .create_index(
                Index::create()
                    .name("idx_direct_message_receiver_id")
                    .table(DirectMessage::Table)
                    .col(DirectMessage::ReceiverId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DirectMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DirectMessage {
    Table,
    Id,
    SenderId,
    SenderName,
    ReceiverId,
    ReceiverName,
    Body,
    MessageType,
    FileUrl,
    Seen,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
