// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lemon Squeezy webhook payloads and signature verification.
//!
//! Lemon Squeezy signs the raw request body with HMAC-SHA256 using the
//! webhook secret and sends the hex digest in the `X-Signature` header.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::{Subscription, SubscriptionInvoice};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Verify the hex HMAC-SHA256 signature of a webhook body.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(provided) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(provided.as_slice()).into()
}

/// Compute the signature Lemon Squeezy would send for `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

// ─── Payload ─────────────────────────────────────────────────

/// Top-level webhook body.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub meta: WebhookMeta,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMeta {
    pub event_name: String,
    #[serde(default)]
    pub test_mode: bool,
    /// Checkout custom data; we pass `user_id` when creating checkouts.
    #[serde(default)]
    pub custom_data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl WebhookMeta {
    /// `custom_data.user_id`, accepting either a string or a number.
    pub fn user_id(&self) -> Option<String> {
        match self.custom_data.as_ref()?.get("user_id")? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub attributes: serde_json::Value,
}

/// Events we act on. Unknown names are acknowledged and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    SubscriptionCreated,
    /// updated / resumed / unpaused / paused / plan_changed
    SubscriptionUpdated,
    SubscriptionCancelled,
    SubscriptionExpired,
    /// payment_success / payment_recovered
    PaymentSucceeded,
    PaymentFailed,
    Other(String),
}

impl WebhookEvent {
    pub fn from_name(name: &str) -> Self {
        match name {
            "subscription_created" => WebhookEvent::SubscriptionCreated,
            "subscription_updated"
            | "subscription_resumed"
            | "subscription_unpaused"
            | "subscription_paused"
            | "subscription_plan_changed" => WebhookEvent::SubscriptionUpdated,
            "subscription_cancelled" => WebhookEvent::SubscriptionCancelled,
            "subscription_expired" => WebhookEvent::SubscriptionExpired,
            "subscription_payment_success" | "subscription_payment_recovered" => {
                WebhookEvent::PaymentSucceeded
            }
            "subscription_payment_failed" => WebhookEvent::PaymentFailed,
            other => WebhookEvent::Other(other.to_string()),
        }
    }
}

/// `attributes` of a `subscriptions` object.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionAttributes {
    #[serde(default)]
    pub order_id: Option<u64>,
    #[serde(default)]
    pub product_id: Option<u64>,
    #[serde(default)]
    pub variant_id: Option<u64>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    pub status: String,
    #[serde(default)]
    pub card_brand: Option<String>,
    #[serde(default)]
    pub card_last_four: Option<String>,
    #[serde(default)]
    pub trial_ends_at: Option<String>,
    #[serde(default)]
    pub renews_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default)]
    pub urls: SubscriptionUrls,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionUrls {
    #[serde(default)]
    pub update_payment_method: Option<String>,
    #[serde(default)]
    pub customer_portal: Option<String>,
}

/// `attributes` of a `subscription-invoices` object.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceAttributes {
    pub subscription_id: u64,
    #[serde(default)]
    pub user_email: Option<String>,
    pub status: String,
    #[serde(default)]
    pub billing_reason: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub total_formatted: Option<String>,
    #[serde(default)]
    pub urls: InvoiceUrls,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceUrls {
    #[serde(default)]
    pub invoice_url: Option<String>,
}

impl SubscriptionAttributes {
    /// Build the stored subscription, keeping `created_at` of an existing record.
    pub fn to_subscription(
        &self,
        subscription_id: &str,
        user_id: &str,
        existing: Option<&Subscription>,
    ) -> Subscription {
        let now = chrono::Utc::now().to_rfc3339();
        Subscription {
            id: subscription_id.to_string(),
            user_id: user_id.to_string(),
            order_id: self.order_id,
            product_id: self.product_id,
            variant_id: self.variant_id,
            product_name: self.product_name.clone(),
            variant_name: self.variant_name.clone(),
            status: self.status.clone(),
            renews_at: self.renews_at.clone(),
            ends_at: self.ends_at.clone(),
            trial_ends_at: self.trial_ends_at.clone(),
            card_brand: self.card_brand.clone(),
            card_last_four: self.card_last_four.clone(),
            update_payment_method_url: self.urls.update_payment_method.clone(),
            customer_portal_url: self.urls.customer_portal.clone(),
            created_at: existing
                .map(|s| s.created_at.clone())
                .unwrap_or_else(|| now.clone()),
            updated_at: now,
        }
    }

    /// Display name of the plan for emails.
    pub fn plan_name(&self) -> String {
        match (&self.product_name, &self.variant_name) {
            (Some(p), Some(v)) if v != "Default" => format!("{} ({})", p, v),
            (Some(p), _) => p.clone(),
            _ => "Learnrithm Pro".to_string(),
        }
    }
}

impl InvoiceAttributes {
    pub fn to_invoice(&self, invoice_id: &str, user_id: &str) -> SubscriptionInvoice {
        SubscriptionInvoice {
            id: invoice_id.to_string(),
            subscription_id: self.subscription_id.to_string(),
            user_id: user_id.to_string(),
            status: self.status.clone(),
            billing_reason: self.billing_reason.clone(),
            currency: self.currency.clone(),
            total: self.total,
            total_formatted: self.total_formatted.clone(),
            invoice_url: self.urls.invoice_url.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Human-readable amount, e.g. "$9.99" or "9.99 EUR".
    pub fn amount_display(&self) -> String {
        if let Some(formatted) = &self.total_formatted {
            return formatted.clone();
        }
        let currency = self.currency.as_deref().unwrap_or("USD");
        let sign = if self.total < 0 { "-" } else { "" };
        let cents = self.total.unsigned_abs();
        format!("{}{}.{:02} {}", sign, cents / 100, cents % 100, currency)
    }
}
