pub mod entitlement;
pub mod job_post;
pub mod product;

pub use entitlement::*;
pub use job_post::*;
pub use product::*;
