// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Product catalogue entries (Lemon Squeezy variants).

use serde::{Deserialize, Serialize};

/// Billing interval of a product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    Year,
}

/// Product document, keyed by the Lemon Squeezy variant ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub variant_id: u64,
    pub product_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Price in minor units
    pub price: i64,
    #[serde(default)]
    pub interval: Option<BillingInterval>,
    pub created_at: String,
    pub updated_at: String,
}
