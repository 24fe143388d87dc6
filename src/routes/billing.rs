// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Product catalogue and the caller's subscription state.

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::AuthUser;
use crate::models::product::BillingInterval;
use crate::models::{Plan, Product, Subscription, SubscriptionInvoice};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Public catalogue.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/v3/products", get(list_products))
}

/// Routes for the logged-in user.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/subscription", get(get_subscription))
}

/// Admin-only catalogue management.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/admin/products/{variant_id}", put(upsert_product))
}

async fn list_products(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.db.list_products().await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertProductRequest {
    pub product_id: u64,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub price: i64,
    pub interval: Option<BillingInterval>,
}

async fn upsert_product(
    State(state): State<Arc<AppState>>,
    AppPath(variant_id): AppPath<u64>,
    AppJson(payload): AppJson<UpsertProductRequest>,
) -> Result<Json<Product>> {
    payload.validate()?;

    let now = chrono::Utc::now().to_rfc3339();
    let created_at = state
        .db
        .get_product(variant_id)
        .await?
        .map(|p| p.created_at)
        .unwrap_or_else(|| now.clone());

    let product = Product {
        variant_id,
        product_id: payload.product_id,
        name: payload.name.trim().to_string(),
        description: payload.description,
        price: payload.price,
        interval: payload.interval,
        created_at,
        updated_at: now,
    };
    state.db.upsert_product(&product).await?;

    tracing::info!(variant_id, name = %product.name, "Product stored");
    Ok(Json(product))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub plan: Plan,
    pub subscriptions: Vec<Subscription>,
    pub invoices: Vec<SubscriptionInvoice>,
}

async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SubscriptionResponse>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let subscriptions = state.db.get_subscriptions_for_user(&user.id).await?;
    let invoices = state.db.get_invoices_for_user(&user.id).await?;

    Ok(Json(SubscriptionResponse {
        plan: user.plan,
        subscriptions,
        invoices,
    }))
}
