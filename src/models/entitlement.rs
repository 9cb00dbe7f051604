use crate::entities::{EntitlementStatus, IapPlatform, PurchaseSource, entitlement_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::job_post::JobPostSummary;

/// Purchase verification input. `signed_transaction` carries the Apple
/// proof; `purchase_token`/`order_id` carry the Google proof. Exactly the
/// fields for the declared platform must be present.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyPurchaseRequest {
    pub platform: IapPlatform,
    pub product_id: String,
    pub signed_transaction: Option<String>,
    pub signed_renewal_info: Option<String>,
    pub purchase_token: Option<String>,
    pub order_id: Option<String>,
    pub job_post_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyPurchaseResponse {
    pub entitlement: EntitlementResponse,
    pub expires_at: DateTime<Utc>,
    /// True when this transaction was already redeemed by the same user;
    /// the existing grant is returned instead of a new one.
    pub already_applied: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestorePurchasesRequest {
    pub platform: IapPlatform,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestoredEntitlement {
    pub entitlement: EntitlementResponse,
    pub job_post: Option<JobPostSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestorePurchasesResponse {
    pub restored_count: i64,
    pub entitlements: Vec<RestoredEntitlement>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttachEntitlementRequest {
    pub job_post_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntitlementResponse {
    pub id: i64,
    pub job_post_id: Option<i64>,
    pub plan_code: String,
    pub source: PurchaseSource,
    pub status: EntitlementStatus,
    pub max_edits: i32,
    pub edits_used: i32,
    pub allow_category_change: bool,
    pub max_category_changes: i32,
    pub category_changes_used: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<entitlement_entity::Model> for EntitlementResponse {
    fn from(m: entitlement_entity::Model) -> Self {
        Self {
            id: m.id,
            job_post_id: m.job_post_id,
            plan_code: m.plan_code,
            source: m.source,
            status: m.status,
            max_edits: m.max_edits,
            edits_used: m.edits_used,
            allow_category_change: m.allow_category_change,
            max_category_changes: m.max_category_changes,
            category_changes_used: m.category_changes_used,
            expires_at: m.expires_at,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}
