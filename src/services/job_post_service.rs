use crate::entities::job_post_entity as jp;
use crate::error::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashMap;
use std::sync::Arc;

/// Ownership lookup over job posts. Post CRUD lives elsewhere; the
/// purchase flow only needs "does this post exist and belong to the
/// caller" plus a summary for the restore response.
#[derive(Clone)]
pub struct JobPostService {
    pool: Arc<DatabaseConnection>,
}

impl JobPostService {
    pub fn new(pool: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { pool: pool.into() }
    }

    /// A foreign post is reported as missing, not as forbidden, so the
    /// response does not leak which post ids exist.
    pub async fn find_owned(&self, job_post_id: i64, user_id: i64) -> AppResult<jp::Model> {
        jp::Entity::find()
            .filter(jp::Column::Id.eq(job_post_id))
            .filter(jp::Column::UserId.eq(user_id))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job post {job_post_id} not found")))
    }

    pub async fn summaries_for(&self, ids: Vec<i64>) -> AppResult<HashMap<i64, jp::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let posts = jp::Entity::find()
            .filter(jp::Column::Id.is_in(ids))
            .all(self.pool.as_ref())
            .await?;
        Ok(posts.into_iter().map(|p| (p.id, p)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::JobPostStatus;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn post(id: i64, user_id: i64) -> jp::Model {
        jp::Model {
            id,
            user_id,
            title: "Senior barista".to_string(),
            category: Some("hospitality".to_string()),
            status: JobPostStatus::Published,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn find_owned_returns_matching_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![post(7, 42)]])
            .into_connection();
        let service = JobPostService::new(db);

        let found = service.find_owned(7, 42).await.unwrap();
        assert_eq!(found.id, 7);
    }

    #[tokio::test]
    async fn find_owned_misses_are_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<jp::Model>::new()])
            .into_connection();
        let service = JobPostService::new(db);

        let err = service.find_owned(7, 99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn summaries_skip_query_for_empty_input() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = JobPostService::new(db);

        let map = service.summaries_for(vec![]).await.unwrap();
        assert!(map.is_empty());
    }
}
