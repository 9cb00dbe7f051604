use sea_orm_migration::prelude::*;
use sea_orm_migration::prelude::extension::postgres::Type;

#[derive(DeriveIden)]
enum Entitlements {
    Table,
    Id,
    UserId,
    JobPostId,
    TransactionId,
    OriginalTransactionId,
    PlanCode,
    Source,
    MaxEdits,
    EditsUsed,
    AllowCategoryChange,
    MaxCategoryChanges,
    CategoryChangesUsed,
    Status,
    ExpiresAt,
    RawPayload,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("purchase_source"))
                    .values(vec![Alias::new("apple_iap"), Alias::new("google_play")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("entitlement_status"))
                    .values(vec![
                        Alias::new("active"),
                        Alias::new("expired"),
                        Alias::new("revoked"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Entitlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entitlements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Entitlements::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entitlements::JobPostId).big_integer().null())
                    // the anti-replay key: one entitlement per store transaction
                    .col(
                        ColumnDef::new(Entitlements::TransactionId)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Entitlements::OriginalTransactionId)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Entitlements::PlanCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Entitlements::Source)
                            .custom(Alias::new("purchase_source"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Entitlements::MaxEdits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Entitlements::EditsUsed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Entitlements::AllowCategoryChange)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Entitlements::MaxCategoryChanges)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Entitlements::CategoryChangesUsed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Entitlements::Status)
                            .custom(Alias::new("entitlement_status"))
                            .not_null()
                            .default("'active'"),
                    )
                    .col(
                        ColumnDef::new(Entitlements::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entitlements::RawPayload).text().null())
                    .col(
                        ColumnDef::new(Entitlements::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Entitlements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_entitlements_user_id")
                    .table(Entitlements::Table)
                    .col(Entitlements::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_entitlements_job_post_id")
                    .table(Entitlements::Table)
                    .col(Entitlements::JobPostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entitlements::Table).to_owned())
            .await?;
        manager
            .drop_type(
                Type::drop()
                    .name(Alias::new("entitlement_status"))
                    .to_owned(),
            )
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("purchase_source")).to_owned())
            .await?;
        Ok(())
    }
}
