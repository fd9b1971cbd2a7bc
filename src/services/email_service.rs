//! Transactional email delivery.
//!
//! Sends the "your document is ready" email through an HTTP email
//! provider. Delivery is synchronous from the caller's point of view; a
//! provider failure surfaces as an error instead of silently dropping the
//! send.

use serde_json::json;
use url::Url;

use crate::config::Config;
use crate::error::AppError;
use crate::models::document::DocumentBase;

/// Upper bound on provider requests; email providers are slower than
/// payment gateways.
const SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// HTTP client for the email provider.
pub struct EmailClient {
    http: reqwest::Client,
    api_url: Url,
    api_key: String,
    from: String,
    app_base_url: String,
}

impl EmailClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails at startup when the configured provider URL doesn't parse or
    /// the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_url = Url::parse(&config.email_api_url)
            .map_err(|e| AppError::Validation(format!("invalid EMAIL_API_URL: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client error: {e}")))?;

        Ok(Self {
            http,
            api_url,
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
            app_base_url: config.app_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Email the document link to a recipient.
    ///
    /// # Errors
    ///
    /// Any transport failure or non-success provider status becomes
    /// `AppError::EmailDelivery`; the provider's response is logged, not
    /// returned to the client.
    pub async fn send_document_link(
        &self,
        to: &str,
        document: &DocumentBase,
    ) -> Result<(), AppError> {
        let link = format!("{}/documentos/{}", self.app_base_url, document.id);
        let subject = format!("Documento {} disponível", document.numero);
        let html = format!(
            "<p>O seu documento <strong>{}</strong> está disponível.</p>\
             <p><a href=\"{}\">Ver documento</a></p>",
            document.numero, link
        );

        let response = self
            .http
            .post(self.api_url.clone())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::EmailDelivery(format!("send request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmailDelivery(format!(
                "provider returned {status}: {body}"
            )));
        }

        tracing::info!(
            documento_id = %document.id,
            numero = %document.numero,
            "document email sent"
        );
        Ok(())
    }
}
