use async_trait::async_trait;

use crate::error::{AppError, AppResult};

use super::apple::decode_transaction_payload;
use super::{NormalizedPurchase, PurchaseProof, ReceiptVerifier};

/// Development-only verifier that accepts any structurally valid proof
/// WITHOUT contacting the store APIs. Apple blobs are decoded but their
/// signature is not checked; Google tokens are taken at face value.
/// Selected only by `verification.mode = "accept"`, never by default.
pub struct AcceptAllVerifier;

#[async_trait]
impl ReceiptVerifier for AcceptAllVerifier {
    async fn verify(&self, proof: &PurchaseProof) -> AppResult<NormalizedPurchase> {
        match proof {
            PurchaseProof::Apple {
                signed_transaction, ..
            } => {
                let payload = decode_transaction_payload(signed_transaction)?;
                Ok(NormalizedPurchase {
                    product_id: payload.product_id,
                    transaction_id: payload.transaction_id,
                    original_transaction_id: payload.original_transaction_id,
                })
            }
            PurchaseProof::Google {
                product_id,
                purchase_token,
                order_id,
            } => {
                if purchase_token.is_empty() {
                    return Err(AppError::InvalidPurchase(
                        "Empty purchase token".to_string(),
                    ));
                }
                Ok(NormalizedPurchase {
                    product_id: product_id.clone(),
                    transaction_id: order_id
                        .clone()
                        .unwrap_or_else(|| purchase_token.clone()),
                    original_transaction_id: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[tokio::test]
    async fn accepts_apple_payload_without_signature_check() {
        let body = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "transactionId": "tx-001",
                "productId": "urgent_7d",
            })
            .to_string()
            .as_bytes(),
        );
        let proof = PurchaseProof::Apple {
            signed_transaction: format!("h.{body}.s"),
            signed_renewal_info: None,
        };
        let purchase = AcceptAllVerifier.verify(&proof).await.unwrap();
        assert_eq!(purchase.transaction_id, "tx-001");
        assert_eq!(purchase.product_id, "urgent_7d");
        assert_eq!(purchase.original_transaction_id, None);
    }

    #[tokio::test]
    async fn google_order_id_wins_over_token() {
        let proof = PurchaseProof::Google {
            product_id: "urgent_7d".to_string(),
            purchase_token: "token-abc".to_string(),
            order_id: Some("GPA.1234".to_string()),
        };
        let purchase = AcceptAllVerifier.verify(&proof).await.unwrap();
        assert_eq!(purchase.transaction_id, "GPA.1234");
    }

    #[tokio::test]
    async fn google_falls_back_to_purchase_token() {
        let proof = PurchaseProof::Google {
            product_id: "urgent_7d".to_string(),
            purchase_token: "token-abc".to_string(),
            order_id: None,
        };
        let purchase = AcceptAllVerifier.verify(&proof).await.unwrap();
        assert_eq!(purchase.transaction_id, "token-abc");
    }

    #[tokio::test]
    async fn rejects_empty_google_token() {
        let proof = PurchaseProof::Google {
            product_id: "urgent_7d".to_string(),
            purchase_token: String::new(),
            order_id: None,
        };
        assert!(AcceptAllVerifier.verify(&proof).await.is_err());
    }
}
