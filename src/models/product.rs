use crate::entities::{IapPlatform, product_mapping_entity};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub platform: IapPlatform,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub product_id: String,
    pub platform: IapPlatform,
    pub plan_code: String,
}

impl From<product_mapping_entity::Model> for ProductResponse {
    fn from(m: product_mapping_entity::Model) -> Self {
        Self {
            product_id: m.product_id,
            platform: m.platform,
            plan_code: m.plan_code,
        }
    }
}
