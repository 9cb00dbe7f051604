use crate::entities::{EntitlementStatus, PurchaseSource, entitlement_entity as ent, plan_entity};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use std::sync::Arc;

/// Everything `issue` needs to snapshot a grant. The plan row is passed
/// whole so the terms written to the entitlement are exactly the terms
/// that were resolved, even if the plan is edited a moment later.
#[derive(Debug, Clone)]
pub struct IssueEntitlementParams {
    pub user_id: i64,
    pub job_post_id: Option<i64>,
    pub transaction_id: String,
    pub original_transaction_id: Option<String>,
    pub source: PurchaseSource,
    pub plan: plan_entity::Model,
    pub raw_payload: Option<String>,
}

pub fn expiry_for(duration_days: i32, issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::days(i64::from(duration_days))
}

fn new_entitlement(params: IssueEntitlementParams, issued_at: DateTime<Utc>) -> ent::ActiveModel {
    ent::ActiveModel {
        user_id: Set(params.user_id),
        job_post_id: Set(params.job_post_id),
        transaction_id: Set(params.transaction_id),
        original_transaction_id: Set(params.original_transaction_id),
        plan_code: Set(params.plan.code.clone()),
        source: Set(params.source),
        max_edits: Set(params.plan.allowed_modifications),
        edits_used: Set(0),
        allow_category_change: Set(params.plan.can_modify_category),
        max_category_changes: Set(params.plan.category_modifications),
        category_changes_used: Set(0),
        status: Set(EntitlementStatus::Active),
        expires_at: Set(expiry_for(params.plan.duration_days, issued_at)),
        raw_payload: Set(params.raw_payload),
        created_at: Set(Some(issued_at)),
        updated_at: Set(Some(issued_at)),
        ..Default::default()
    }
}

/// The replay signal. The unique index on `transaction_id` is the
/// authoritative guard; this recognizes its violation at insert time.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    err.to_string()
        .contains("duplicate key value violates unique constraint")
}

/// The entitlement ledger: issues, queries, and mutates grants. Every
/// mutation is a single conditional statement so concurrent callers
/// serialize on the store, not on in-process state.
#[derive(Clone)]
pub struct EntitlementService {
    pool: Arc<DatabaseConnection>,
}

impl EntitlementService {
    pub fn new(pool: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { pool: pool.into() }
    }

    /// Issues an entitlement for a verified purchase. A duplicate
    /// `transaction_id` fails `Conflict` without writing anything; the
    /// insert itself is the replay check.
    pub async fn issue(&self, params: IssueEntitlementParams) -> AppResult<ent::Model> {
        let transaction_id = params.transaction_id.clone();
        match new_entitlement(params, Utc::now()).insert(self.pool.as_ref()).await {
            Ok(model) => Ok(model),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
                "Transaction {transaction_id} was already processed"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_id(&self, entitlement_id: i64) -> AppResult<Option<ent::Model>> {
        Ok(ent::Entity::find_by_id(entitlement_id)
            .one(self.pool.as_ref())
            .await?)
    }

    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> AppResult<Option<ent::Model>> {
        Ok(ent::Entity::find()
            .filter(ent::Column::TransactionId.eq(transaction_id))
            .one(self.pool.as_ref())
            .await?)
    }

    /// Entitlements usable as of `as_of`. Expiry is evaluated against the
    /// timestamp, not the status column, so a stale ACTIVE row past its
    /// `expires_at` never counts.
    pub async fn list_active_for_user(
        &self,
        user_id: i64,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<ent::Model>> {
        Ok(ent::Entity::find()
            .filter(ent::Column::UserId.eq(user_id))
            .filter(ent::Column::Status.eq(EntitlementStatus::Active))
            .filter(ent::Column::ExpiresAt.gt(as_of))
            .order_by_desc(ent::Column::CreatedAt)
            .all(self.pool.as_ref())
            .await?)
    }

    /// Spends one free edit. The increment and the ceiling check are one
    /// conditional UPDATE, so two concurrent edits cannot both pass the
    /// last slot.
    pub async fn consume_edit_quota(&self, entitlement_id: i64) -> AppResult<ent::Model> {
        let now = Utc::now();
        let result = ent::Entity::update_many()
            .col_expr(
                ent::Column::EditsUsed,
                Expr::col(ent::Column::EditsUsed).add(1),
            )
            .col_expr(ent::Column::UpdatedAt, Expr::value(now))
            .filter(ent::Column::Id.eq(entitlement_id))
            .filter(ent::Column::Status.eq(EntitlementStatus::Active))
            .filter(ent::Column::ExpiresAt.gt(now))
            .filter(Expr::col(ent::Column::EditsUsed).lt(Expr::col(ent::Column::MaxEdits)))
            .exec(self.pool.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(self.explain_quota_failure(entitlement_id, false).await);
        }
        self.reload(entitlement_id).await
    }

    /// Spends one category change. Same shape as `consume_edit_quota`,
    /// additionally gated on the plan allowing category changes at all.
    pub async fn consume_category_quota(&self, entitlement_id: i64) -> AppResult<ent::Model> {
        let now = Utc::now();
        let result = ent::Entity::update_many()
            .col_expr(
                ent::Column::CategoryChangesUsed,
                Expr::col(ent::Column::CategoryChangesUsed).add(1),
            )
            .col_expr(ent::Column::UpdatedAt, Expr::value(now))
            .filter(ent::Column::Id.eq(entitlement_id))
            .filter(ent::Column::Status.eq(EntitlementStatus::Active))
            .filter(ent::Column::ExpiresAt.gt(now))
            .filter(ent::Column::AllowCategoryChange.eq(true))
            .filter(
                Expr::col(ent::Column::CategoryChangesUsed)
                    .lt(Expr::col(ent::Column::MaxCategoryChanges)),
            )
            .exec(self.pool.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(self.explain_quota_failure(entitlement_id, true).await);
        }
        self.reload(entitlement_id).await
    }

    /// Binds a pending entitlement to a job post. Only an unattached,
    /// still-active grant owned by `user_id` can be attached; the filter
    /// set makes the operation a compare-and-swap.
    pub async fn attach_job_post(
        &self,
        entitlement_id: i64,
        user_id: i64,
        job_post_id: i64,
    ) -> AppResult<ent::Model> {
        let now = Utc::now();
        let result = ent::Entity::update_many()
            .col_expr(ent::Column::JobPostId, Expr::value(job_post_id))
            .col_expr(ent::Column::UpdatedAt, Expr::value(now))
            .filter(ent::Column::Id.eq(entitlement_id))
            .filter(ent::Column::UserId.eq(user_id))
            .filter(ent::Column::Status.eq(EntitlementStatus::Active))
            .filter(ent::Column::ExpiresAt.gt(now))
            .filter(ent::Column::JobPostId.is_null())
            .exec(self.pool.as_ref())
            .await?;

        if result.rows_affected == 0 {
            let existing = self.find_by_id(entitlement_id).await?;
            return Err(match existing {
                Some(e) if e.user_id != user_id => {
                    AppError::NotFound("Entitlement not found".to_string())
                }
                Some(e) if e.job_post_id.is_some() => AppError::Conflict(
                    "Entitlement is already attached to a job post".to_string(),
                ),
                Some(_) => AppError::NotFound("No active entitlement".to_string()),
                None => AppError::NotFound("Entitlement not found".to_string()),
            });
        }
        self.reload(entitlement_id).await
    }

    /// Hygiene sweep: stamp EXPIRED on rows past their `expires_at`.
    /// Queries never rely on this; it only keeps reporting tidy.
    pub async fn mark_expired(&self) -> AppResult<u64> {
        let now = Utc::now();
        let result = ent::Entity::update_many()
            .set(ent::ActiveModel {
                status: Set(EntitlementStatus::Expired),
                updated_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(ent::Column::Status.eq(EntitlementStatus::Active))
            .filter(ent::Column::ExpiresAt.lte(now))
            .exec(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn reload(&self, entitlement_id: i64) -> AppResult<ent::Model> {
        self.find_by_id(entitlement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entitlement not found".to_string()))
    }

    async fn explain_quota_failure(&self, entitlement_id: i64, category: bool) -> AppError {
        let existing = match self.find_by_id(entitlement_id).await {
            Ok(e) => e,
            Err(e) => return e,
        };
        match existing {
            None => AppError::NotFound("Entitlement not found".to_string()),
            Some(e)
                if e.status != EntitlementStatus::Active || e.expires_at <= Utc::now() =>
            {
                AppError::NotFound("No active entitlement".to_string())
            }
            Some(e) if category && !e.allow_category_change => {
                AppError::QuotaExceeded("Plan does not allow category changes".to_string())
            }
            Some(e) if category => AppError::QuotaExceeded(format!(
                "Category change quota exhausted ({}/{})",
                e.category_changes_used, e.max_category_changes
            )),
            Some(e) => AppError::QuotaExceeded(format!(
                "Edit quota exhausted ({}/{})",
                e.edits_used, e.max_edits
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn urgent_plan() -> plan_entity::Model {
        plan_entity::Model {
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

    fn entitlement(edits_used: i32, max_edits: i32) -> ent::Model {
        ent::Model {
            id: 10,
            user_id: 42,
            job_post_id: None,
            transaction_id: "tx-001".to_string(),
            original_transaction_id: None,
            plan_code: "URGENT".to_string(),
            source: PurchaseSource::AppleIap,
            max_edits,
            edits_used,
            allow_category_change: false,
            max_category_changes: 0,
            category_changes_used: 0,
            status: EntitlementStatus::Active,
            expires_at: Utc::now() + Duration::days(5),
            raw_payload: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn expiry_is_issuance_plus_plan_duration() {
        let issued = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        assert_eq!(expiry_for(7, issued), expected);
    }

    #[test]
    fn issuance_snapshots_plan_terms_with_zeroed_counters() {
        let issued = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let am = new_entitlement(
            IssueEntitlementParams {
                user_id: 42,
                job_post_id: None,
                transaction_id: "tx-001".to_string(),
                original_transaction_id: None,
                source: PurchaseSource::AppleIap,
                plan: urgent_plan(),
                raw_payload: Some("{}".to_string()),
            },
            issued,
        );

        assert_eq!(am.transaction_id.clone().unwrap(), "tx-001");
        assert_eq!(am.plan_code.clone().unwrap(), "URGENT");
        assert_eq!(am.max_edits.clone().unwrap(), 2);
        assert_eq!(am.edits_used.clone().unwrap(), 0);
        assert_eq!(am.category_changes_used.clone().unwrap(), 0);
        assert_eq!(am.status.clone().unwrap(), EntitlementStatus::Active);
        assert_eq!(
            am.expires_at.clone().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn unique_violation_recognized_from_message() {
        let err = DbErr::Custom(
            "error returned from database: duplicate key value violates unique constraint \
             \"entitlements_transaction_id_key\""
                .to_string(),
        );
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&DbErr::Custom(
            "connection reset".to_string()
        )));
    }

    #[tokio::test]
    async fn consume_edit_quota_increments_and_returns_row() {
        let after = entitlement(1, 2);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![after.clone()]])
            .into_connection();
        let service = EntitlementService::new(db);

        let updated = service.consume_edit_quota(10).await.unwrap();
        assert_eq!(updated.edits_used, 1);
    }

    #[tokio::test]
    async fn consume_edit_quota_at_ceiling_fails_without_increment() {
        let at_ceiling = entitlement(2, 2);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![at_ceiling]])
            .into_connection();
        let service = EntitlementService::new(db);

        let err = service.consume_edit_quota(10).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn category_quota_gated_by_plan_flag() {
        let no_category = entitlement(0, 2);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![no_category]])
            .into_connection();
        let service = EntitlementService::new(db);

        let err = service.consume_category_quota(10).await.unwrap_err();
        match err {
            AppError::QuotaExceeded(msg) => assert!(msg.contains("does not allow")),
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_entitlement_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<ent::Model>::new()])
            .into_connection();
        let service = EntitlementService::new(db);

        let err = service.consume_edit_quota(99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn attach_refuses_already_attached_entitlement() {
        let mut attached = entitlement(0, 2);
        attached.job_post_id = Some(7);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![attached]])
            .into_connection();
        let service = EntitlementService::new(db);

        let err = service.attach_job_post(10, 42, 8).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn attach_hides_foreign_entitlements() {
        let foreign = entitlement(0, 2);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![foreign]])
            .into_connection();
        let service = EntitlementService::new(db);

        // caller 43 is not the owner (42)
        let err = service.attach_job_post(10, 43, 8).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_active_filters_are_time_scoped() {
        let active = entitlement(0, 2);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![active.clone()]])
            .into_connection();
        let service = EntitlementService::new(db);

        let rows = service.list_active_for_user(42, Utc::now()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, active.id);
    }
}
