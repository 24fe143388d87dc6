// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email templates.
//!
//! Each message is an askama template under `templates/email/` extending a
//! shared `base.html`. Interpolated values are HTML-escaped by askama.

use askama::Template;

use crate::error::AppError;
use crate::models::ProductVariant;

/// A rendered message, ready to hand to the email API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Template)]
#[template(path = "email/verification.html")]
struct VerificationTemplate<'a> {
    product: &'a str,
    name: &'a str,
    action_url: &'a str,
    expires_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeTemplate<'a> {
    product: &'a str,
    name: &'a str,
    action_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/reset_password.html")]
struct ResetPasswordTemplate<'a> {
    product: &'a str,
    name: &'a str,
    action_url: &'a str,
    expires_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_changed.html")]
struct PasswordChangedTemplate<'a> {
    product: &'a str,
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscription_started.html")]
struct SubscriptionStartedTemplate<'a> {
    product: &'a str,
    name: &'a str,
    plan_name: &'a str,
    renews_at: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/subscription_cancelled.html")]
struct SubscriptionCancelledTemplate<'a> {
    product: &'a str,
    name: &'a str,
    ends_at: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/subscription_expired.html")]
struct SubscriptionExpiredTemplate<'a> {
    product: &'a str,
    name: &'a str,
    action_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/payment_receipt.html")]
struct PaymentReceiptTemplate<'a> {
    product: &'a str,
    name: &'a str,
    amount: &'a str,
    invoice_url: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/payment_failed.html")]
struct PaymentFailedTemplate<'a> {
    product: &'a str,
    name: &'a str,
    update_payment_url: Option<&'a str>,
}

fn render(to: &str, subject: String, template: &impl Template) -> Result<Email, AppError> {
    let html = template
        .render()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Email template failed: {}", e)))?;
    Ok(Email {
        to: to.to_string(),
        subject,
        html,
    })
}

pub fn verification(
    variant: ProductVariant,
    to: &str,
    name: &str,
    link: &str,
    expires_minutes: i64,
) -> Result<Email, AppError> {
    let product = variant.display_name();
    render(
        to,
        format!("Verify your {} email", product),
        &VerificationTemplate {
            product,
            name,
            action_url: link,
            expires_minutes,
        },
    )
}

pub fn welcome(
    variant: ProductVariant,
    to: &str,
    name: &str,
    dashboard_url: &str,
) -> Result<Email, AppError> {
    let product = variant.display_name();
    render(
        to,
        format!("Welcome to {}", product),
        &WelcomeTemplate {
            product,
            name,
            action_url: dashboard_url,
        },
    )
}

pub fn reset_password(
    variant: ProductVariant,
    to: &str,
    name: &str,
    link: &str,
    expires_minutes: i64,
) -> Result<Email, AppError> {
    render(
        to,
        "Reset your password".to_string(),
        &ResetPasswordTemplate {
            product: variant.display_name(),
            name,
            action_url: link,
            expires_minutes,
        },
    )
}

pub fn password_changed(variant: ProductVariant, to: &str, name: &str) -> Result<Email, AppError> {
    render(
        to,
        "Your password was changed".to_string(),
        &PasswordChangedTemplate {
            product: variant.display_name(),
            name,
        },
    )
}

pub fn subscription_started(
    variant: ProductVariant,
    to: &str,
    name: &str,
    plan_name: &str,
    renews_at: Option<&str>,
) -> Result<Email, AppError> {
    let product = variant.display_name();
    render(
        to,
        format!("Your {} subscription is active", product),
        &SubscriptionStartedTemplate {
            product,
            name,
            plan_name,
            renews_at,
        },
    )
}

pub fn subscription_cancelled(
    variant: ProductVariant,
    to: &str,
    name: &str,
    ends_at: Option<&str>,
) -> Result<Email, AppError> {
    render(
        to,
        "Your subscription was cancelled".to_string(),
        &SubscriptionCancelledTemplate {
            product: variant.display_name(),
            name,
            ends_at,
        },
    )
}

pub fn subscription_expired(
    variant: ProductVariant,
    to: &str,
    name: &str,
    pricing_url: &str,
) -> Result<Email, AppError> {
    render(
        to,
        "Your subscription has expired".to_string(),
        &SubscriptionExpiredTemplate {
            product: variant.display_name(),
            name,
            action_url: pricing_url,
        },
    )
}

pub fn payment_receipt(
    variant: ProductVariant,
    to: &str,
    name: &str,
    amount: &str,
    invoice_url: Option<&str>,
) -> Result<Email, AppError> {
    render(
        to,
        "Payment received".to_string(),
        &PaymentReceiptTemplate {
            product: variant.display_name(),
            name,
            amount,
            invoice_url,
        },
    )
}

pub fn payment_failed(
    variant: ProductVariant,
    to: &str,
    name: &str,
    update_payment_url: Option<&str>,
) -> Result<Email, AppError> {
    render(
        to,
        "Payment failed".to_string(),
        &PaymentFailedTemplate {
            product: variant.display_name(),
            name,
            update_payment_url,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_supplied_name_is_escaped() {
        let email = verification(
            ProductVariant::Main,
            "a@example.com",
            "<b>Mallory</b>",
            "https://learnrithm.com/verify-email?token=abc",
            10,
        )
        .unwrap();
        assert!(!email.html.contains("<b>Mallory</b>"));
        assert!(email.html.contains("&lt;b&gt;Mallory&lt;/b&gt;"));
        assert!(email.html.contains("expires in 10 minutes"));
        assert!(email.html.contains("Verify email"));
    }

    #[test]
    fn test_plan_name_is_escaped() {
        let email = subscription_started(
            ProductVariant::Main,
            "a@example.com",
            "Ada",
            "Pro <script>",
            Some("2026-11-01"),
        )
        .unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("Pro &lt;script&gt;"));
        assert!(email.html.contains("Your plan renews on 2026-11-01."));
    }

    #[test]
    fn test_variant_branding() {
        let main = welcome(ProductVariant::Main, "a@example.com", "Ada", "https://x").unwrap();
        let study = welcome(ProductVariant::Study, "a@example.com", "Ada", "https://y").unwrap();
        assert_eq!(main.subject, "Welcome to Learnrithm");
        assert_eq!(study.subject, "Welcome to Learnrithm Study");
        assert!(study.html.contains("&copy; Learnrithm Study."));
        assert!(study.html.contains(r#"href="https://y""#));
    }

    #[test]
    fn test_optional_sections_are_omitted() {
        let email =
            payment_receipt(ProductVariant::Main, "a@example.com", "Ada", "$9.99", None).unwrap();
        assert!(!email.html.contains("View invoice"));

        let email = payment_receipt(
            ProductVariant::Main,
            "a@example.com",
            "Ada",
            "$9.99",
            Some("https://pay.example/inv/1"),
        )
        .unwrap();
        assert!(email.html.contains("View invoice"));
        assert!(email.html.contains("https://pay.example/inv/1"));
        assert!(email.html.contains("$9.99"));

        let email =
            subscription_cancelled(ProductVariant::Main, "a@example.com", "Ada", None).unwrap();
        assert!(!email.html.contains("You keep access"));
        assert_eq!(email.to, "a@example.com");
    }
}
