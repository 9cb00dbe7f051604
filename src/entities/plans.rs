use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Plan template a purchased product resolves to. Rows are managed by
/// admin tooling; this service only reads them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub duration_days: i32,
    pub allowed_modifications: i32,
    pub can_modify_category: bool,
    pub category_modifications: i32,
    pub has_featured_option: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
