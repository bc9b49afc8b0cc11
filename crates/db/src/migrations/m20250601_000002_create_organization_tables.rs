//! Create `organization` and `org_member` tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organization::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organization::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Organization::Name)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Organization::OwnerId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Organization::Industry).string_len(128))
                    .col(ColumnDef::new(Organization::LogoUrl).string_len(512))
                    .col(
                        ColumnDef::new(Organization::AllowGuestUsers)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Organization::DefaultRole)
                            .string_len(20)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(Organization::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Organization::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_owner")
                            .from(Organization::Table, Organization::OwnerId)
                            .to(User::Table, User::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrgMember::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrgMember::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrgMember::OrgId).string_len(32).not_null())
                    .col(ColumnDef::new(OrgMember::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(OrgMember::Role)
                            .string_len(20)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(OrgMember::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_org_member_org")
                            .from(OrgMember::Table, OrgMember::OrgId)
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_org_member_user")
                            .from(OrgMember::Table, OrgMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership row per (org, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_org_member_org_user")
                    .table(OrgMember::Table)
                    .col(OrgMember::OrgId)
                    .col(OrgMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_org_member_user_id")
                    .table(OrgMember::Table)
                    .col(OrgMember::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrgMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organization::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Organization {
    Table,
    Id,
    Name,
    OwnerId,
    Industry,
    LogoUrl,
    AllowGuestUsers,
    DefaultRole,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum OrgMember {
    Table,
    Id,
    OrgId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
