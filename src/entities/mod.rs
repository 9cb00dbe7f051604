pub mod entitlements;
pub mod job_posts;
pub mod plans;
pub mod product_mappings;

pub use entitlements as entitlement_entity;
pub use job_posts as job_post_entity;
pub use plans as plan_entity;
pub use product_mappings as product_mapping_entity;

pub use entitlements::{EntitlementStatus, PurchaseSource};
pub use job_posts::JobPostStatus;
pub use product_mappings::IapPlatform;
