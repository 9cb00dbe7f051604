use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::external::AppStoreClient;

use super::{NormalizedPurchase, PurchaseProof, ReceiptVerifier};

/// Payload segment of an App Store signed transaction (JWS).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleTransactionPayload {
    pub transaction_id: String,
    pub original_transaction_id: Option<String>,
    pub product_id: String,
    pub bundle_id: Option<String>,
    pub expires_date: Option<i64>,
}

/// Decodes the payload of a JWS without checking its signature. The
/// caller decides whether the blob can be trusted; the remote verifier
/// only uses this on blobs returned by Apple's own API.
pub(crate) fn decode_transaction_payload(jws: &str) -> AppResult<AppleTransactionPayload> {
    let segments: Vec<&str> = jws.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(AppError::InvalidPurchase(
            "Signed transaction is not a JWS".to_string(),
        ));
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AppError::InvalidPurchase("Signed transaction payload is not base64".into()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::InvalidPurchase(format!("Malformed transaction payload: {e}")))
}

/// Verifies Apple purchases against the App Store Server API: the
/// client-supplied blob only names the transaction; the facts that get
/// trusted come from Apple's copy.
pub struct AppleReceiptVerifier {
    client: AppStoreClient,
    bundle_id: String,
}

impl AppleReceiptVerifier {
    pub fn new(client: AppStoreClient, bundle_id: String) -> Self {
        Self { client, bundle_id }
    }
}

#[async_trait]
impl ReceiptVerifier for AppleReceiptVerifier {
    async fn verify(&self, proof: &PurchaseProof) -> AppResult<NormalizedPurchase> {
        let signed_transaction = match proof {
            PurchaseProof::Apple {
                signed_transaction, ..
            } => signed_transaction,
            PurchaseProof::Google { .. } => {
                return Err(AppError::InvalidPurchase(
                    "Google proof sent to the Apple verifier".to_string(),
                ));
            }
        };

        let claimed = decode_transaction_payload(signed_transaction)?;

        let confirmed_jws = self.client.fetch_transaction(&claimed.transaction_id).await?;
        let confirmed = decode_transaction_payload(&confirmed_jws)?;

        if confirmed.transaction_id != claimed.transaction_id {
            return Err(AppError::InvalidPurchase(
                "App Store returned a different transaction".to_string(),
            ));
        }
        if let Some(bundle_id) = &confirmed.bundle_id
            && bundle_id != &self.bundle_id
        {
            return Err(AppError::InvalidPurchase(format!(
                "Transaction belongs to bundle {bundle_id}"
            )));
        }

        Ok(NormalizedPurchase {
            product_id: confirmed.product_id,
            transaction_id: confirmed.transaction_id,
            original_transaction_id: confirmed.original_transaction_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn fake_jws(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.sig")
    }

    #[test]
    fn decodes_transaction_payload() {
        let jws = fake_jws(serde_json::json!({
            "transactionId": "2000000123",
            "originalTransactionId": "2000000100",
            "productId": "urgent_7d",
            "bundleId": "com.example.jobboard",
            "expiresDate": 1704672000000i64,
        }));
        let payload = decode_transaction_payload(&jws).unwrap();
        assert_eq!(payload.transaction_id, "2000000123");
        assert_eq!(
            payload.original_transaction_id.as_deref(),
            Some("2000000100")
        );
        assert_eq!(payload.product_id, "urgent_7d");
    }

    #[test]
    fn rejects_non_jws_input() {
        let err = decode_transaction_payload("not-a-jws").unwrap_err();
        assert!(matches!(err, AppError::InvalidPurchase(_)));
    }

    #[test]
    fn rejects_garbage_payload_segment() {
        let err = decode_transaction_payload("aaa.!!!.ccc").unwrap_err();
        assert!(matches!(err, AppError::InvalidPurchase(_)));
    }
}
