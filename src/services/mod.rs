pub mod catalog_service;
pub mod entitlement_service;
pub mod job_post_service;
pub mod purchase_service;

pub use catalog_service::*;
pub use entitlement_service::*;
pub use job_post_service::*;
pub use purchase_service::*;
