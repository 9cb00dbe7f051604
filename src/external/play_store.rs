use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PUBLISHER_BASE_URL: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3";
const PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

#[derive(Debug, Serialize)]
struct ServiceAccountClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Subset of the Play Developer API `ProductPurchase` resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPurchase {
    /// 0 = purchased, 1 = canceled, 2 = pending
    pub purchase_state: Option<i32>,
    pub order_id: Option<String>,
    pub purchase_time_millis: Option<String>,
}

/// Google Play Developer API client. Exchanges a service-account JWT for
/// an access token, then reads the purchase state for a purchase token.
#[derive(Clone)]
pub struct PlayStoreClient {
    client: Client,
    config: GoogleConfig,
}

impl PlayStoreClient {
    pub fn new(config: GoogleConfig, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn access_token(&self) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = ServiceAccountClaims {
            iss: self.config.service_account_email.clone(),
            scope: PUBLISHER_SCOPE.to_string(),
            aud: TOKEN_URL.to_string(),
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(self.config.private_key.as_bytes())
            .map_err(|e| AppError::ConfigError(format!("Invalid Google private key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign Google token: {e}")))?;

        let params = [
            (
                "grant_type",
                "urn:ietf:params:oauth:grant-type:jwt-bearer".to_string(),
            ),
            ("assertion", assertion),
        ];
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Unreachable(format!("Google OAuth: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Unreachable(format!(
                "Google OAuth returned {status}: {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Unreachable(format!("Google OAuth: {e}")))?;
        Ok(token.access_token)
    }

    /// Reads the purchase record for `(product_id, purchase_token)`.
    /// Transport failures are `Unreachable`; a 4xx from Google means the
    /// token is not a valid purchase and maps to `InvalidPurchase`.
    pub async fn fetch_product_purchase(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<ProductPurchase> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/applications/{}/purchases/products/{}/tokens/{}",
            PUBLISHER_BASE_URL, self.config.package_name, product_id, purchase_token
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Unreachable(format!("Play Developer API: {e}")))?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| AppError::Unreachable(format!("Play Developer API: {e}")))
        } else if status.is_server_error() {
            Err(AppError::Unreachable(format!(
                "Play Developer API returned {status}"
            )))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::InvalidPurchase(format!(
                "Google rejected purchase token: {status} {body}"
            )))
        }
    }
}
