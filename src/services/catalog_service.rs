use crate::entities::{IapPlatform, plan_entity as plan, product_mapping_entity as pm};
use crate::error::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

/// Read-only access to the product catalog and plan registry. Rows are
/// maintained by admin tooling; nothing here writes.
#[derive(Clone)]
pub struct CatalogService {
    pool: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(pool: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { pool: pool.into() }
    }

    /// Resolves a store product id to an internal plan code. Only active
    /// mappings count; a retired mapping is indistinguishable from a
    /// missing one.
    pub async fn resolve_plan_key(
        &self,
        product_id: &str,
        platform: IapPlatform,
    ) -> AppResult<String> {
        pm::Entity::find()
            .filter(pm::Column::ProductId.eq(product_id))
            .filter(pm::Column::Platform.eq(platform.clone()))
            .filter(pm::Column::Active.eq(true))
            .one(self.pool.as_ref())
            .await?
            .map(|m| m.plan_code)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No active product mapping for {product_id} on {platform}"
                ))
            })
    }

    pub async fn get_plan(&self, plan_code: &str) -> AppResult<plan::Model> {
        plan::Entity::find()
            .filter(plan::Column::Code.eq(plan_code))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {plan_code} does not exist")))
    }

    pub async fn list_products(&self, platform: IapPlatform) -> AppResult<Vec<pm::Model>> {
        Ok(pm::Entity::find()
            .filter(pm::Column::Platform.eq(platform))
            .filter(pm::Column::Active.eq(true))
            .order_by_asc(pm::Column::ProductId)
            .all(self.pool.as_ref())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn mapping(product_id: &str, platform: IapPlatform, plan_code: &str) -> pm::Model {
        pm::Model {
            id: 1,
            product_id: product_id.to_string(),
            platform,
            plan_code: plan_code.to_string(),
            active: true,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn resolves_active_mapping_to_plan_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![mapping("com.app.urgent", IapPlatform::Ios, "URGENT")]])
            .into_connection();
        let service = CatalogService::new(db);

        let key = service
            .resolve_plan_key("com.app.urgent", IapPlatform::Ios)
            .await
            .unwrap();
        assert_eq!(key, "URGENT");
    }

    #[tokio::test]
    async fn missing_mapping_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<pm::Model>::new()])
            .into_connection();
        let service = CatalogService::new(db);

        let err = service
            .resolve_plan_key("com.app.unknown", IapPlatform::Android)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_plan_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<plan::Model>::new()])
            .into_connection();
        let service = CatalogService::new(db);

        let err = service.get_plan("MISSING").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
