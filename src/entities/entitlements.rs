use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::product_mappings::IapPlatform;

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "purchase_source")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseSource {
    #[sea_orm(string_value = "apple_iap")]
    AppleIap,
    #[sea_orm(string_value = "google_play")]
    GooglePlay,
}

impl std::fmt::Display for PurchaseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurchaseSource::AppleIap => write!(f, "apple_iap"),
            PurchaseSource::GooglePlay => write!(f, "google_play"),
        }
    }
}

impl From<IapPlatform> for PurchaseSource {
    fn from(platform: IapPlatform) -> Self {
        match platform {
            IapPlatform::Ios => PurchaseSource::AppleIap,
            IapPlatform::Android => PurchaseSource::GooglePlay,
        }
    }
}

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entitlement_status")]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "revoked")]
    Revoked,
}

impl std::fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntitlementStatus::Active => write!(f, "active"),
            EntitlementStatus::Expired => write!(f, "expired"),
            EntitlementStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// A time-bound, quota-bearing grant issued against a verified store
/// purchase. `transaction_id` carries the unique index that makes
/// issuance replay-safe; rows are never deleted, only marked.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "entitlements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub job_post_id: Option<i64>,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub original_transaction_id: Option<String>,
    pub plan_code: String,
    pub source: PurchaseSource,
    pub max_edits: i32,
    pub edits_used: i32,
    pub allow_category_change: bool,
    pub max_category_changes: i32,
    pub category_changes_used: i32,
    pub status: EntitlementStatus,
    pub expires_at: DateTime<Utc>,
    pub raw_payload: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
