use crate::config::AppleConfig;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PRODUCTION_BASE_URL: &str = "https://api.storekit.itunes.apple.com";
const SANDBOX_BASE_URL: &str = "https://api.storekit-sandbox.itunes.apple.com";

#[derive(Debug, Serialize)]
struct ServerApiClaims {
    iss: String,
    iat: i64,
    exp: i64,
    aud: String,
    bid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfoResponse {
    pub signed_transaction_info: String,
}

/// App Store Server API client. Looks up a transaction by id so the
/// verifier can trust Apple's copy of the purchase rather than the
/// client-supplied blob.
#[derive(Clone)]
pub struct AppStoreClient {
    client: Client,
    config: AppleConfig,
}

impl AppStoreClient {
    pub fn new(config: AppleConfig, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &'static str {
        match self.config.environment.as_deref() {
            Some("sandbox") => SANDBOX_BASE_URL,
            _ => PRODUCTION_BASE_URL,
        }
    }

    /// Short-lived ES256 token for the App Store Server API.
    fn server_api_token(&self) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = ServerApiClaims {
            iss: self.config.issuer_id.clone(),
            iat: now,
            exp: now + 1800,
            aud: "appstoreconnect-v1".to_string(),
            bid: self.config.bundle_id.clone(),
        };
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.config.key_id.clone());
        let key = EncodingKey::from_ec_pem(self.config.private_key.as_bytes())
            .map_err(|e| AppError::ConfigError(format!("Invalid App Store private key: {e}")))?;
        encode(&header, &claims, &key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign App Store token: {e}")))
    }

    /// Fetches the signed transaction info for a transaction id. Transport
    /// failures surface as `Unreachable` so callers can retry; a rejection
    /// from Apple is `InvalidPurchase`.
    pub async fn fetch_transaction(&self, transaction_id: &str) -> AppResult<String> {
        let token = self.server_api_token()?;
        let url = format!(
            "{}/inApps/v1/transactions/{}",
            self.base_url(),
            transaction_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Unreachable(format!("App Store Server API: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let info: TransactionInfoResponse = response
                .json()
                .await
                .map_err(|e| AppError::Unreachable(format!("App Store Server API: {e}")))?;
            Ok(info.signed_transaction_info)
        } else if status.is_server_error() {
            Err(AppError::Unreachable(format!(
                "App Store Server API returned {status}"
            )))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::InvalidPurchase(format!(
                "App Store rejected transaction {transaction_id}: {status} {body}"
            )))
        }
    }
}
