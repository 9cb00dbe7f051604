use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::external::PlayStoreClient;

use super::{NormalizedPurchase, PurchaseProof, ReceiptVerifier};

const PURCHASE_STATE_PURCHASED: i32 = 0;

/// Verifies Google purchases through the Play Developer API purchase
/// status endpoint. The order id reported by Google (not the one the
/// client claims) becomes the anti-replay key, with the purchase token
/// as fallback for test-track purchases that carry no order id.
pub struct GoogleReceiptVerifier {
    client: PlayStoreClient,
}

impl GoogleReceiptVerifier {
    pub fn new(client: PlayStoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReceiptVerifier for GoogleReceiptVerifier {
    async fn verify(&self, proof: &PurchaseProof) -> AppResult<NormalizedPurchase> {
        let (product_id, purchase_token) = match proof {
            PurchaseProof::Google {
                product_id,
                purchase_token,
                ..
            } => (product_id, purchase_token),
            PurchaseProof::Apple { .. } => {
                return Err(AppError::InvalidPurchase(
                    "Apple proof sent to the Google verifier".to_string(),
                ));
            }
        };

        let purchase = self
            .client
            .fetch_product_purchase(product_id, purchase_token)
            .await?;

        match purchase.purchase_state {
            Some(PURCHASE_STATE_PURCHASED) => {}
            state => {
                return Err(AppError::InvalidPurchase(format!(
                    "Purchase is not in purchased state (state = {state:?})"
                )));
            }
        }

        let transaction_id = purchase
            .order_id
            .unwrap_or_else(|| purchase_token.clone());

        Ok(NormalizedPurchase {
            product_id: product_id.clone(),
            transaction_id,
            original_transaction_id: None,
        })
    }
}
