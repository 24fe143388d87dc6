// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription records mirrored from Lemon Squeezy.

use serde::{Deserialize, Serialize};

/// Access plan derived from the subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    /// Map a Lemon Squeezy subscription status onto a plan.
    ///
    /// A cancelled subscription keeps access until it expires, so it still
    /// counts as `Pro`.
    pub fn from_status(status: &str) -> Self {
        match status {
            "active" | "on_trial" | "past_due" | "cancelled" => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

/// Subscription document (keyed by the Lemon Squeezy subscription ID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
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
    pub status: String,
    #[serde(default)]
    pub renews_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default)]
    pub trial_ends_at: Option<String>,
    #[serde(default)]
    pub card_brand: Option<String>,
    #[serde(default)]
    pub card_last_four: Option<String>,
    #[serde(default)]
    pub update_payment_method_url: Option<String>,
    #[serde(default)]
    pub customer_portal_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Subscription invoice document (keyed by the Lemon Squeezy invoice ID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInvoice {
    pub id: String,
    pub subscription_id: String,
    pub user_id: String,
    pub status: String,
    #[serde(default)]
    pub billing_reason: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Total in minor units
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub total_formatted: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_from_status() {
        assert_eq!(Plan::from_status("active"), Plan::Pro);
        assert_eq!(Plan::from_status("on_trial"), Plan::Pro);
        assert_eq!(Plan::from_status("past_due"), Plan::Pro);
        assert_eq!(Plan::from_status("cancelled"), Plan::Pro);
        assert_eq!(Plan::from_status("expired"), Plan::Free);
        assert_eq!(Plan::from_status("unpaid"), Plan::Free);
        assert_eq!(Plan::from_status("paused"), Plan::Free);
        assert_eq!(Plan::from_status("something_new"), Plan::Free);
    }
}
