//! Mobile-money gateway client and callback verification.
//!
//! This module handles the two directions of gateway traffic:
//! - Outbound: initiating C2B charges against the gateway API
//! - Inbound: verifying the HMAC signature on gateway callbacks

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use url::Url;

use crate::config::Config;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on gateway charge requests.
const CHARGE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// A charge the gateway accepted.
#[derive(Debug)]
pub struct GatewayCharge {
    /// Gateway-issued reference, later echoed in the callback
    pub reference: String,
}

#[derive(Debug, Deserialize)]
struct GatewayChargeResponse {
    reference: String,
}

/// HTTP client for the mobile-money gateway.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl GatewayClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails at startup when the configured base URL doesn't parse or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.gateway_base_url)
            .map_err(|e| AppError::Validation(format!("invalid GATEWAY_BASE_URL: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(CHARGE_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client error: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: config.gateway_api_key.clone(),
        })
    }

    /// Ask the gateway to charge a subscriber.
    ///
    /// # Process
    ///
    /// 1. POST the charge to `/c2b/charges` with a 5 second timeout
    /// 2. On acceptance, return the gateway's charge reference
    ///
    /// Nothing is persisted here; the caller only records the payment once
    /// the gateway has accepted the charge.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-success status, or unreadable response
    /// becomes `AppError::Gateway`; the detail is logged, not returned to
    /// the client.
    pub async fn initiate_c2b(
        &self,
        msisdn: &str,
        valor_centavos: i64,
        moeda: &str,
    ) -> Result<GatewayCharge, AppError> {
        let endpoint = self
            .base_url
            .join("/c2b/charges")
            .map_err(|e| AppError::Internal(format!("gateway URL error: {e}")))?;

        let response = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "msisdn": msisdn,
                "valor_centavos": valor_centavos,
                "moeda": moeda,
            }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("charge request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "gateway returned {status}: {body}"
            )));
        }

        let charge: GatewayChargeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("unreadable gateway response: {e}")))?;

        Ok(GatewayCharge {
            reference: charge.reference,
        })
    }
}

/// Verify the HMAC-SHA256 signature on a callback.
///
/// The signature covers the exact raw request bytes; any reformatting of
/// the body before verification would break it. Expected header format is
/// `sha256=<hex>`.
///
/// # Verification
///
/// 1. Strip the `sha256=` prefix; anything else fails
/// 2. Decode the hex; invalid hex is compared against zeros so it fails
///    without a separate code path
/// 3. Constant-time HMAC comparison via `verify_slice`
pub fn verify_callback_signature(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let Some(encoded) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let expected = hex::decode(encoded).unwrap_or_else(|_| vec![0u8; 32]);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
