// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email delivery through an HTTP email API.
//!
//! Without an API key the service runs in log-only mode: messages are
//! rendered and logged, and delivery is reported as successful.

pub mod templates;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ProductVariant, User};
use serde::Serialize;
pub use templates::Email;

/// Request body accepted by Resend-compatible APIs.
#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Email delivery client.
#[derive(Clone)]
pub struct EmailService {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    frontend_url: String,
    study_frontend_url: String,
    verify_email_minutes: i64,
    reset_password_minutes: i64,
}

impl EmailService {
    pub fn new(config: &Config) -> Self {
        if config.email_api_key.is_none() {
            tracing::warn!("EMAIL_API_KEY not set, emails will only be logged");
        }
        Self {
            http: reqwest::Client::new(),
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
            frontend_url: config.frontend_url.clone(),
            study_frontend_url: config.study_frontend_url.clone(),
            verify_email_minutes: config.jwt_verify_email_expiration_minutes,
            reset_password_minutes: config.jwt_reset_password_expiration_minutes,
        }
    }

    /// Frontend base URL for a product variant.
    pub fn frontend_url(&self, variant: ProductVariant) -> &str {
        match variant {
            ProductVariant::Main => &self.frontend_url,
            ProductVariant::Study => &self.study_frontend_url,
        }
    }

    /// Deliver a rendered email.
    pub async fn send(&self, email: &Email) -> Result<(), AppError> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(
                to = %email.to,
                subject = %email.subject,
                "Email delivery disabled, message logged only"
            );
            return Ok(());
        };

        let body = SendEmailRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Email API returned HTTP {}: {}",
                status, text
            )));
        }

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }

    /// Send an email where rendering or delivery failure must not fail the caller.
    pub async fn send_best_effort(&self, email: Result<Email, AppError>) {
        let email = match email {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(error = %e, "Email rendering failed");
                return;
            }
        };
        if let Err(e) = self.send(&email).await {
            tracing::warn!(error = %e, to = %email.to, subject = %email.subject, "Email delivery failed");
        }
    }

    // ─── Rendered flows ─────────────────────────────────────────

    pub fn verification_email(
        &self,
        user: &User,
        variant: ProductVariant,
        token: &str,
    ) -> Result<Email, AppError> {
        let link = format!(
            "{}/verify-email?token={}",
            self.frontend_url(variant),
            urlencoding::encode(token)
        );
        templates::verification(variant, &user.email, &user.name, &link, self.verify_email_minutes)
    }

    pub fn reset_password_email(
        &self,
        user: &User,
        variant: ProductVariant,
        token: &str,
    ) -> Result<Email, AppError> {
        let link = format!(
            "{}/reset-password?token={}",
            self.frontend_url(variant),
            urlencoding::encode(token)
        );
        templates::reset_password(
            variant,
            &user.email,
            &user.name,
            &link,
            self.reset_password_minutes,
        )
    }

    pub fn welcome_email(&self, user: &User, variant: ProductVariant) -> Result<Email, AppError> {
        let dashboard = format!("{}/dashboard", self.frontend_url(variant));
        templates::welcome(variant, &user.email, &user.name, &dashboard)
    }

    pub fn password_changed_email(&self, user: &User) -> Result<Email, AppError> {
        templates::password_changed(user.variant, &user.email, &user.name)
    }

    pub fn subscription_expired_email(&self, user: &User) -> Result<Email, AppError> {
        let pricing = format!("{}/pricing", self.frontend_url(user.variant));
        templates::subscription_expired(user.variant, &user.email, &user.name, &pricing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(variant: ProductVariant) -> User {
        User::new("Ada", "ada@example.com", "hash".into(), variant)
    }

    #[test]
    fn test_links_use_variant_frontend_and_encode_token() {
        let svc = EmailService::new(&Config::test_default());

        let email = svc
            .verification_email(&user(ProductVariant::Main), ProductVariant::Main, "a.b+c")
            .unwrap();
        assert!(email
            .html
            .contains("http://localhost:5173/verify-email?token=a.b%2Bc"));

        let email = svc
            .reset_password_email(&user(ProductVariant::Study), ProductVariant::Study, "tok")
            .unwrap();
        assert!(email
            .html
            .contains("http://localhost:5174/reset-password?token=tok"));
    }

    #[tokio::test]
    async fn test_log_only_mode_reports_success() {
        let svc = EmailService::new(&Config::test_default());
        let email = svc
            .welcome_email(&user(ProductVariant::Main), ProductVariant::Main)
            .unwrap();
        assert!(svc.send(&email).await.is_ok());
    }
}
