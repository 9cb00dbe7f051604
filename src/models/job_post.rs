use crate::entities::{JobPostStatus, job_post_entity};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobPostSummary {
    pub id: i64,
    pub title: String,
    pub status: JobPostStatus,
}

impl From<&job_post_entity::Model> for JobPostSummary {
    fn from(m: &job_post_entity::Model) -> Self {
        Self {
            id: m.id,
            title: m.title.clone(),
            status: m.status.clone(),
        }
    }
}
