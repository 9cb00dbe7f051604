pub mod accept;
pub mod apple;
pub mod google;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::entities::IapPlatform;
use crate::error::AppResult;
use crate::external::{AppStoreClient, PlayStoreClient};

pub use accept::AcceptAllVerifier;
pub use apple::AppleReceiptVerifier;
pub use google::GoogleReceiptVerifier;

/// Platform purchase proof as supplied by the client.
#[derive(Debug, Clone)]
pub enum PurchaseProof {
    Apple {
        signed_transaction: String,
        signed_renewal_info: Option<String>,
    },
    Google {
        product_id: String,
        purchase_token: String,
        order_id: Option<String>,
    },
}

/// Purchase facts extracted from a verified proof, normalized across
/// platforms. `transaction_id` is the anti-replay key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPurchase {
    pub product_id: String,
    pub transaction_id: String,
    pub original_transaction_id: Option<String>,
}

/// Validates a purchase proof and extracts normalized purchase facts.
/// Implementations must finish (or fail) before any entitlement write
/// begins; they never touch the store themselves.
#[async_trait]
pub trait ReceiptVerifier: Send + Sync {
    async fn verify(&self, proof: &PurchaseProof) -> AppResult<NormalizedPurchase>;
}

/// One verifier per platform, selected once at startup.
#[derive(Clone)]
pub struct VerifierSet {
    apple: Arc<dyn ReceiptVerifier>,
    google: Arc<dyn ReceiptVerifier>,
}

impl VerifierSet {
    pub fn remote(config: &Config) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.verification.timeout_secs);
        let app_store = AppStoreClient::new(config.apple.clone(), timeout)?;
        let play_store = PlayStoreClient::new(config.google.clone(), timeout)?;
        Ok(Self {
            apple: Arc::new(AppleReceiptVerifier::new(
                app_store,
                config.apple.bundle_id.clone(),
            )),
            google: Arc::new(GoogleReceiptVerifier::new(play_store)),
        })
    }

    pub fn accept_all() -> Self {
        Self {
            apple: Arc::new(AcceptAllVerifier),
            google: Arc::new(AcceptAllVerifier),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        match config.verification.mode.as_str() {
            "accept" => {
                log::warn!(
                    "Receipt verification is in accept-all mode: purchase proofs are NOT \
                     validated against the store APIs. Development use only."
                );
                Ok(Self::accept_all())
            }
            _ => Self::remote(config),
        }
    }

    pub fn for_platform(&self, platform: &IapPlatform) -> Arc<dyn ReceiptVerifier> {
        match platform {
            IapPlatform::Ios => self.apple.clone(),
            IapPlatform::Android => self.google.clone(),
        }
    }
}
