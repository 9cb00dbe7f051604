use crate::entities::{IapPlatform, PurchaseSource};
use crate::error::{AppError, AppResult};
use crate::models::{
    EntitlementResponse, JobPostSummary, RestorePurchasesResponse, RestoredEntitlement,
    VerifyPurchaseRequest, VerifyPurchaseResponse,
};
use crate::services::{CatalogService, EntitlementService, JobPostService};
use crate::services::entitlement_service::IssueEntitlementParams;
use crate::verification::{PurchaseProof, VerifierSet};
use chrono::Utc;

/// Builds the platform proof from the request body, rejecting requests
/// that do not carry the fields their declared platform needs.
pub(crate) fn proof_from_request(req: &VerifyPurchaseRequest) -> AppResult<PurchaseProof> {
    match req.platform {
        IapPlatform::Ios => {
            let signed_transaction = req
                .signed_transaction
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    AppError::InvalidPurchase("Missing signed transaction".to_string())
                })?;
            Ok(PurchaseProof::Apple {
                signed_transaction,
                signed_renewal_info: req.signed_renewal_info.clone(),
            })
        }
        IapPlatform::Android => {
            let purchase_token = req
                .purchase_token
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| AppError::InvalidPurchase("Missing purchase token".to_string()))?;
            Ok(PurchaseProof::Google {
                product_id: req.product_id.clone(),
                purchase_token,
                order_id: req.order_id.clone(),
            })
        }
    }
}

/// Composes catalog, verifier, ownership lookup and ledger into the
/// purchase verification flow. The ledger insert is the only mutation
/// and the only replay arbiter.
#[derive(Clone)]
pub struct PurchaseService {
    catalog: CatalogService,
    ledger: EntitlementService,
    job_posts: JobPostService,
    verifiers: VerifierSet,
}

impl PurchaseService {
    pub fn new(
        catalog: CatalogService,
        ledger: EntitlementService,
        job_posts: JobPostService,
        verifiers: VerifierSet,
    ) -> Self {
        Self {
            catalog,
            ledger,
            job_posts,
            verifiers,
        }
    }

    pub async fn verify_purchase(
        &self,
        user_id: i64,
        req: VerifyPurchaseRequest,
    ) -> AppResult<VerifyPurchaseResponse> {
        let proof = proof_from_request(&req)?;

        let plan_code = self
            .catalog
            .resolve_plan_key(&req.product_id, req.platform.clone())
            .await?;
        let plan = self.catalog.get_plan(&plan_code).await?;

        // Remote verification finishes (or fails) before anything is
        // written; no store transaction is held across this call.
        let verifier = self.verifiers.for_platform(&req.platform);
        let purchase = verifier.verify(&proof).await?;

        if purchase.product_id != req.product_id {
            return Err(AppError::InvalidPurchase(format!(
                "Verified product {} does not match requested product {}",
                purchase.product_id, req.product_id
            )));
        }

        if let Some(job_post_id) = req.job_post_id {
            self.job_posts.find_owned(job_post_id, user_id).await?;
        }

        let raw_payload = serde_json::to_string(&req)?;
        let issue = self
            .ledger
            .issue(IssueEntitlementParams {
                user_id,
                job_post_id: req.job_post_id,
                transaction_id: purchase.transaction_id.clone(),
                original_transaction_id: purchase.original_transaction_id.clone(),
                source: PurchaseSource::from(req.platform.clone()),
                plan,
                raw_payload: Some(raw_payload),
            })
            .await;

        match issue {
            Ok(entitlement) => Ok(VerifyPurchaseResponse {
                expires_at: entitlement.expires_at,
                entitlement: EntitlementResponse::from(entitlement),
                already_applied: false,
            }),
            Err(AppError::Conflict(msg)) => {
                // Same user replaying their own purchase gets the existing
                // grant back; a token redeemed by someone else stays a
                // hard conflict.
                match self
                    .ledger
                    .find_by_transaction_id(&purchase.transaction_id)
                    .await?
                {
                    Some(existing) if existing.user_id == user_id => Ok(VerifyPurchaseResponse {
                        expires_at: existing.expires_at,
                        entitlement: EntitlementResponse::from(existing),
                        already_applied: true,
                    }),
                    _ => Err(AppError::Conflict(msg)),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Read-only reconciliation: the caller's currently usable grants for
    /// one platform, with job post summaries where attached.
    pub async fn restore_purchases(
        &self,
        user_id: i64,
        platform: IapPlatform,
    ) -> AppResult<RestorePurchasesResponse> {
        let source = PurchaseSource::from(platform);
        let active = self.ledger.list_active_for_user(user_id, Utc::now()).await?;
        let active: Vec<_> = active.into_iter().filter(|e| e.source == source).collect();

        let post_ids: Vec<i64> = active.iter().filter_map(|e| e.job_post_id).collect();
        let posts = self.job_posts.summaries_for(post_ids).await?;

        let entitlements: Vec<RestoredEntitlement> = active
            .into_iter()
            .map(|e| RestoredEntitlement {
                job_post: e
                    .job_post_id
                    .and_then(|id| posts.get(&id))
                    .map(JobPostSummary::from),
                entitlement: EntitlementResponse::from(e),
            })
            .collect();

        Ok(RestorePurchasesResponse {
            restored_count: entitlements.len() as i64,
            entitlements,
        })
    }

    pub async fn list_entitlements(&self, user_id: i64) -> AppResult<Vec<EntitlementResponse>> {
        let active = self.ledger.list_active_for_user(user_id, Utc::now()).await?;
        Ok(active.into_iter().map(EntitlementResponse::from).collect())
    }

    /// Follow-up for entitlements issued without a job post: bind the
    /// grant to a post the caller owns.
    pub async fn attach_entitlement(
        &self,
        user_id: i64,
        entitlement_id: i64,
        job_post_id: i64,
    ) -> AppResult<EntitlementResponse> {
        self.job_posts.find_owned(job_post_id, user_id).await?;
        let updated = self
            .ledger
            .attach_job_post(entitlement_id, user_id, job_post_id)
            .await?;
        Ok(EntitlementResponse::from(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        EntitlementStatus, JobPostStatus, entitlement_entity as ent, job_post_entity as jp,
        plan_entity as plan, product_mapping_entity as pm,
    };
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    fn service(db: DatabaseConnection) -> PurchaseService {
        let db = std::sync::Arc::new(db);
        PurchaseService::new(
            CatalogService::new(db.clone()),
            EntitlementService::new(db.clone()),
            JobPostService::new(db),
            VerifierSet::accept_all(),
        )
    }

    fn apple_request(product_id: &str, transaction_id: &str) -> VerifyPurchaseRequest {
        let body = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "transactionId": transaction_id,
                "productId": product_id,
            })
            .to_string()
            .as_bytes(),
        );
        VerifyPurchaseRequest {
            platform: IapPlatform::Ios,
            product_id: product_id.to_string(),
            signed_transaction: Some(format!("h.{body}.s")),
            signed_renewal_info: None,
            purchase_token: None,
            order_id: None,
            job_post_id: None,
        }
    }

    fn urgent_mapping() -> pm::Model {
        pm::Model {
            id: 1,
            product_id: "urgent_7d".to_string(),
            platform: IapPlatform::Ios,
            plan_code: "URGENT".to_string(),
            active: true,
            created_at: None,
        }
    }

    fn urgent_plan() -> plan::Model {
        plan::Model {
            id: 1,
            code: "URGENT".to_string(),
            duration_days: 7,
            allowed_modifications: 2,
            can_modify_category: false,
            category_modifications: 0,
            has_featured_option: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn issued_entitlement(source: PurchaseSource, job_post_id: Option<i64>) -> ent::Model {
        ent::Model {
            id: 10,
            user_id: 42,
            job_post_id,
            transaction_id: "tx-001".to_string(),
            original_transaction_id: None,
            plan_code: "URGENT".to_string(),
            source,
            max_edits: 2,
            edits_used: 0,
            allow_category_change: false,
            max_category_changes: 0,
            category_changes_used: 0,
            status: EntitlementStatus::Active,
            expires_at: Utc::now() + Duration::days(7),
            raw_payload: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn verify_purchase_issues_entitlement() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![urgent_mapping()]])
            .append_query_results([vec![urgent_plan()]])
            .append_query_results([vec![issued_entitlement(PurchaseSource::AppleIap, None)]])
            .into_connection();
        let service = service(db);

        let resp = service
            .verify_purchase(42, apple_request("urgent_7d", "tx-001"))
            .await
            .unwrap();
        assert!(!resp.already_applied);
        assert_eq!(resp.entitlement.plan_code, "URGENT");
        assert_eq!(resp.entitlement.max_edits, 2);
        assert_eq!(resp.entitlement.edits_used, 0);
    }

    #[tokio::test]
    async fn verified_product_must_match_requested_product() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![urgent_mapping()]])
            .append_query_results([vec![urgent_plan()]])
            .into_connection();
        let service = service(db);

        // proof decodes to a different product than the one requested
        let mut req = apple_request("other_product", "tx-001");
        req.product_id = "urgent_7d".to_string();
        let err = service.verify_purchase(42, req).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidPurchase(_)));
    }

    #[tokio::test]
    async fn restore_filters_by_platform_and_joins_posts() {
        let attached = issued_entitlement(PurchaseSource::AppleIap, Some(7));
        let mut other_platform = issued_entitlement(PurchaseSource::GooglePlay, None);
        other_platform.id = 11;
        other_platform.transaction_id = "GPA.1".to_string();
        let post = jp::Model {
            id: 7,
            user_id: 42,
            title: "Senior barista".to_string(),
            category: None,
            status: JobPostStatus::Published,
            created_at: None,
            updated_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![attached, other_platform]])
            .append_query_results([vec![post]])
            .into_connection();
        let service = service(db);

        let resp = service
            .restore_purchases(42, IapPlatform::Ios)
            .await
            .unwrap();
        assert_eq!(resp.restored_count, 1);
        let restored = &resp.entitlements[0];
        assert_eq!(restored.entitlement.id, 10);
        let post = restored.job_post.as_ref().unwrap();
        assert_eq!(post.id, 7);
        assert_eq!(post.title, "Senior barista");
    }

    #[test]
    fn apple_proof_requires_signed_transaction() {
        let mut req = apple_request("urgent_7d", "tx-001");
        req.signed_transaction = None;
        let err = proof_from_request(&req).unwrap_err();
        assert!(matches!(err, AppError::InvalidPurchase(_)));
    }

    #[test]
    fn google_proof_requires_purchase_token() {
        let req = VerifyPurchaseRequest {
            platform: IapPlatform::Android,
            product_id: "urgent_7d".to_string(),
            signed_transaction: None,
            signed_renewal_info: None,
            purchase_token: None,
            order_id: Some("GPA.1".to_string()),
            job_post_id: None,
        };
        let err = proof_from_request(&req).unwrap_err();
        assert!(matches!(err, AppError::InvalidPurchase(_)));
    }
}
