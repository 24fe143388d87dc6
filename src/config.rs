// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! In production the secrets are injected as environment variables by the
//! deployment; for local development a `.env` file is honoured.

use std::env;
use std::str::FromStr;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL of the main product (used in emails and CORS)
    pub frontend_url: String,
    /// Frontend URL of the "Study" product variant
    pub study_frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Directory where uploaded files are written
    pub upload_dir: String,

    // --- Token lifetimes ---
    pub jwt_access_expiration_minutes: i64,
    pub jwt_refresh_expiration_days: i64,
    pub jwt_reset_password_expiration_minutes: i64,
    pub jwt_verify_email_expiration_minutes: i64,

    // --- Rate limiting ---
    /// Requests per window for the general limiter
    pub rate_limit_max_requests: u32,
    /// Requests per window for auth endpoints
    pub auth_rate_limit_max_requests: u32,
    /// Window length in seconds (shared by both limiters)
    pub rate_limit_window_secs: u64,

    // --- Third parties ---
    /// OpenAI model used by the chat proxy
    pub openai_model: String,
    /// Email API endpoint (Resend-compatible)
    pub email_api_url: String,
    /// Sender address for transactional email
    pub email_from: String,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Lemon Squeezy webhook signing secret
    pub lemonsqueezy_webhook_secret: String,
    /// OpenAI API key (chat is disabled without it)
    pub openai_api_key: Option<String>,
    /// Email API key (emails are only logged without it)
    pub email_api_key: Option<String>,
}

impl Config {
    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            study_frontend_url: "http://localhost:5174".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            upload_dir: std::env::temp_dir()
                .join("learnrithm-test-uploads")
                .to_string_lossy()
                .into_owned(),
            jwt_access_expiration_minutes: 30,
            jwt_refresh_expiration_days: 30,
            jwt_reset_password_expiration_minutes: 10,
            jwt_verify_email_expiration_minutes: 10,
            rate_limit_max_requests: 1000,
            auth_rate_limit_max_requests: 1000,
            rate_limit_window_secs: 900,
            openai_model: "gpt-4o-mini".to_string(),
            email_api_url: "https://api.resend.com/emails".to_string(),
            email_from: "Learnrithm <noreply@learnrithm.com>".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            lemonsqueezy_webhook_secret: "test_webhook_secret".to_string(),
            openai_api_key: None,
            email_api_key: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            study_frontend_url: env::var("STUDY_FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5174".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),

            jwt_access_expiration_minutes: parse_or("JWT_ACCESS_EXPIRATION_MINUTES", 30)?,
            jwt_refresh_expiration_days: parse_or("JWT_REFRESH_EXPIRATION_DAYS", 30)?,
            jwt_reset_password_expiration_minutes: parse_or(
                "JWT_RESET_PASSWORD_EXPIRATION_MINUTES",
                10,
            )?,
            jwt_verify_email_expiration_minutes: parse_or(
                "JWT_VERIFY_EMAIL_EXPIRATION_MINUTES",
                10,
            )?,

            rate_limit_max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", 100)?,
            auth_rate_limit_max_requests: parse_or("AUTH_RATE_LIMIT_MAX_REQUESTS", 20)?,
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 900)?,

            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Learnrithm <noreply@learnrithm.com>".to_string()),

            jwt_signing_key: required_secret("JWT_SIGNING_KEY")?.into_bytes(),
            lemonsqueezy_webhook_secret: required_secret("LEMONSQUEEZY_WEBHOOK_SECRET")?
                .trim()
                .to_string(),
            openai_api_key: optional_secret("OPENAI_API_KEY"),
            email_api_key: optional_secret("EMAIL_API_KEY"),
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        !(self.frontend_url.starts_with("http://localhost")
            || self.frontend_url.starts_with("http://127.0.0.1"))
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Read a secret that must be set and non-blank.
fn required_secret(name: &'static str) -> Result<String, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(name));
    }
    Ok(value)
}

/// Read a secret that may be absent or blank.
fn optional_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Blank secrets are rejected
        env::set_var("JWT_SIGNING_KEY", "  ");
        env::set_var("LEMONSQUEEZY_WEBHOOK_SECRET", "whsec");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("JWT_SIGNING_KEY"))
        ));

        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("LEMONSQUEEZY_WEBHOOK_SECRET", "");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("LEMONSQUEEZY_WEBHOOK_SECRET"))
        ));

        env::set_var("LEMONSQUEEZY_WEBHOOK_SECRET", " whsec ");
        env::set_var("OPENAI_API_KEY", "   ");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.lemonsqueezy_webhook_secret, "whsec");
        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert!(config.openai_api_key.is_none(), "blank key is treated as unset");
    }

    #[test]
    fn test_secure_cookies_for_production_frontend() {
        let mut config = Config::test_default();
        assert!(!config.secure_cookies());

        config.frontend_url = "https://learnrithm.com".to_string();
        assert!(config.secure_cookies());
    }
}
