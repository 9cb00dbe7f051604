use sea_orm_migration::prelude::*;
use sea_orm_migration::prelude::extension::postgres::Type;

#[derive(DeriveIden)]
enum Plans {
    Table,
    Id,
    Code,
    DurationDays,
    AllowedModifications,
    CanModifyCategory,
    CategoryModifications,
    HasFeaturedOption,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProductMappings {
    Table,
    Id,
    ProductId,
    Platform,
    PlanCode,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum JobPosts {
    Table,
    Id,
    UserId,
    Title,
    Category,
    Status,
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
                    .as_enum(Alias::new("iap_platform"))
                    .values(vec![Alias::new("ios"), Alias::new("android")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("job_post_status"))
                    .values(vec![
                        Alias::new("draft"),
                        Alias::new("published"),
                        Alias::new("closed"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Plans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Plans::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Plans::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Plans::DurationDays).integer().not_null())
                    .col(
                        ColumnDef::new(Plans::AllowedModifications)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Plans::CanModifyCategory)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Plans::CategoryModifications)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Plans::HasFeaturedOption)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Plans::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Plans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductMappings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductMappings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductMappings::ProductId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductMappings::Platform)
                            .custom(Alias::new("iap_platform"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductMappings::PlanCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductMappings::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProductMappings::CreatedAt)
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
                    .name("uq_product_mappings_product_platform")
                    .table(ProductMappings::Table)
                    .col(ProductMappings::ProductId)
                    .col(ProductMappings::Platform)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JobPosts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobPosts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobPosts::UserId).big_integer().not_null())
                    .col(ColumnDef::new(JobPosts::Title).string_len(255).not_null())
                    .col(ColumnDef::new(JobPosts::Category).string_len(100).null())
                    .col(
                        ColumnDef::new(JobPosts::Status)
                            .custom(Alias::new("job_post_status"))
                            .not_null()
                            .default("'draft'"),
                    )
                    .col(
                        ColumnDef::new(JobPosts::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(JobPosts::UpdatedAt)
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
                    .name("idx_job_posts_user_id")
                    .table(JobPosts::Table)
                    .col(JobPosts::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobPosts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductMappings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Plans::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("job_post_status")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("iap_platform")).to_owned())
            .await?;
        Ok(())
    }
}
