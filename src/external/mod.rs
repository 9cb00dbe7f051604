pub mod app_store;
pub mod play_store;

pub use app_store::AppStoreClient;
pub use play_store::PlayStoreClient;
