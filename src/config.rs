//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `ALLOWED_ORIGIN` (optional): origin allowed by CORS, defaults to the
///   local frontend dev server
/// - `PRODUCTION` (optional): `true` marks CSRF cookies as `Secure`,
///   defaults to false
/// - `GATEWAY_BASE_URL` (optional): mobile-money gateway API base, defaults
///   to the sandbox host; production deployments must override it
/// - `GATEWAY_API_KEY` (optional): bearer key for gateway charge requests
/// - `GATEWAY_WEBHOOK_SECRET` (optional): HMAC key for callback signatures
/// - `EMAIL_API_URL` (optional): transactional email provider endpoint
/// - `EMAIL_API_KEY` (optional): bearer key for the email provider
/// - `EMAIL_FROM` (optional): sender address on outgoing mail
/// - `APP_BASE_URL` (optional): public base URL used in document links
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    #[serde(default)]
    pub production: bool,

    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    #[serde(default)]
    pub gateway_api_key: String,

    #[serde(default)]
    pub gateway_webhook_secret: String,

    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,

    #[serde(default)]
    pub email_api_key: String,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_gateway_base_url() -> String {
    "https://api.sandbox.vm.co.mz".to_string()
}

fn default_email_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_email_from() -> String {
    "documentos@example.com".to_string()
}

fn default_app_base_url() -> String {
    "http://localhost:5173".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}
