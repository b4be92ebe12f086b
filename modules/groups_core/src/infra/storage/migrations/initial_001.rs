use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::Owner).string().not_null())
                    .col(ColumnDef::new(Groups::GroupType).string().not_null())
                    .col(ColumnDef::new(Groups::Description).string())
                    .col(
                        ColumnDef::new(Groups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Groups::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_groups_owner")
                    .table(Groups::Table)
                    .col(Groups::Owner)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupMembers::GroupId).string().not_null())
                    .col(ColumnDef::new(GroupMembers::UserName).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(GroupMembers::GroupId)
                            .col(GroupMembers::UserName),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_members_user")
                    .table(GroupMembers::Table)
                    .col(GroupMembers::UserName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupCustomFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupCustomFields::GroupId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupCustomFields::Field).string().not_null())
                    .col(ColumnDef::new(GroupCustomFields::Value).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(GroupCustomFields::GroupId)
                            .col(GroupCustomFields::Field),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Requests::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Requests::GroupId).string().not_null())
                    .col(ColumnDef::new(Requests::Requester).string().not_null())
                    .col(ColumnDef::new(Requests::RequestType).string().not_null())
                    .col(ColumnDef::new(Requests::Target).string())
                    .col(ColumnDef::new(Requests::Status).string().not_null())
                    .col(ColumnDef::new(Requests::ClosedBy).string())
                    .col(ColumnDef::new(Requests::ClosedReason).string())
                    .col(
                        ColumnDef::new(Requests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Requests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Requests::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Requests::NaturalKey).string())
                    .to_owned(),
            )
            .await?;

        // The deduplication index. NULL natural keys never collide, so the
        // uniqueness constraint only binds while a request is open.
        manager
            .create_index(
                Index::create()
                    .name("idx_requests_natural_key")
                    .table(Requests::Table)
                    .col(Requests::NaturalKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_group_status")
                    .table(Requests::Table)
                    .col(Requests::GroupId)
                    .col(Requests::Status)
                    .col(Requests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_requester_status")
                    .table(Requests::Table)
                    .col(Requests::Requester)
                    .col(Requests::Status)
                    .col(Requests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_target_status")
                    .table(Requests::Table)
                    .col(Requests::Target)
                    .col(Requests::Status)
                    .col(Requests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_status_expires")
                    .table(Requests::Table)
                    .col(Requests::Status)
                    .col(Requests::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Config::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Config::SchemaKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Config::SchemaVersion).integer().not_null())
                    .col(ColumnDef::new(Config::InUpdate).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Config::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupCustomFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Groups {
    Table,
    Id,
    Name,
    Owner,
    GroupType,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum GroupMembers {
    Table,
    GroupId,
    UserName,
}

#[derive(DeriveIden)]
enum GroupCustomFields {
    Table,
    GroupId,
    Field,
    Value,
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    Id,
    GroupId,
    Requester,
    RequestType,
    Target,
    Status,
    ClosedBy,
    ClosedReason,
    CreatedAt,
    UpdatedAt,
    ExpiresAt,
    NaturalKey,
}

#[derive(DeriveIden)]
enum Config {
    Table,
    SchemaKey,
    SchemaVersion,
    InUpdate,
}
