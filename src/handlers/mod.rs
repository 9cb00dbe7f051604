pub mod entitlement;
pub mod product;
pub mod purchase;

pub use entitlement::entitlement_config;
pub use product::product_config;
pub use purchase::purchase_config;
