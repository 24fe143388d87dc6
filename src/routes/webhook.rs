// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for Lemon Squeezy subscription events.

use crate::error::AppError;
use crate::models::{Plan, User};
use crate::services::email::templates;
use crate::services::lemonsqueezy::{
    verify_signature, InvoiceAttributes, SubscriptionAttributes, WebhookEvent, WebhookMeta,
    WebhookPayload, SIGNATURE_HEADER,
};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/v3/webhooks/lemonsqueezy", post(handle_event))
}

/// Handle an incoming webhook (POST).
///
/// The signature covers the raw body, so the body is taken as bytes and
/// parsed only after it has been verified.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !verify_signature(
        state.config.lemonsqueezy_webhook_secret.as_bytes(),
        &body,
        signature,
    ) {
        tracing::warn!(
            has_signature = !signature.is_empty(),
            "Security Alert: Webhook signature mismatch"
        );
        return StatusCode::UNAUTHORIZED;
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    tracing::info!(
        event_name = %payload.meta.event_name,
        object_type = %payload.data.data_type,
        object_id = %payload.data.id,
        test_mode = payload.meta.test_mode,
        "Webhook event received"
    );

    match process_event(&state, payload).await {
        Ok(()) => StatusCode::OK,
        Err(AppError::BadRequest(msg)) => {
            tracing::error!(error = %msg, "Malformed webhook event");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            // Non-2xx makes Lemon Squeezy retry later
            tracing::error!(error = %e, "Failed to process webhook event");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn process_event(state: &AppState, payload: WebhookPayload) -> Result<(), AppError> {
    let event = WebhookEvent::from_name(&payload.meta.event_name);

    match event {
        WebhookEvent::SubscriptionCreated
        | WebhookEvent::SubscriptionUpdated
        | WebhookEvent::SubscriptionCancelled
        | WebhookEvent::SubscriptionExpired => {
            let attrs: SubscriptionAttributes =
                serde_json::from_value(payload.data.attributes).map_err(|e| {
                    AppError::BadRequest(format!("Invalid subscription attributes: {}", e))
                })?;
            handle_subscription(state, &event, &payload.meta, &payload.data.id, &attrs).await
        }
        WebhookEvent::PaymentSucceeded | WebhookEvent::PaymentFailed => {
            let attrs: InvoiceAttributes = serde_json::from_value(payload.data.attributes)
                .map_err(|e| AppError::BadRequest(format!("Invalid invoice attributes: {}", e)))?;
            handle_invoice(state, &event, &payload.meta, &payload.data.id, &attrs).await
        }
        WebhookEvent::Other(name) => {
            tracing::debug!(event_name = %name, "Ignoring unhandled event type");
            Ok(())
        }
    }
}

/// Find the user an event belongs to: checkout custom data first, then the
/// stored subscription, then the customer email.
async fn resolve_user(
    state: &AppState,
    meta: &WebhookMeta,
    subscription_id: &str,
    email: Option<&str>,
) -> Result<Option<User>, AppError> {
    if let Some(user_id) = meta.user_id() {
        if let Some(user) = state.db.get_user(&user_id).await? {
            return Ok(Some(user));
        }
        tracing::warn!(user_id = %user_id, "custom_data.user_id does not match a user");
    }

    if let Some(subscription) = state.db.get_subscription(subscription_id).await? {
        if let Some(user) = state.db.get_user(&subscription.user_id).await? {
            return Ok(Some(user));
        }
    }

    match email {
        Some(email) => state.db.find_user_by_email(email).await,
        None => Ok(None),
    }
}

/// Recompute the user's plan from all their stored subscriptions.
async fn sync_plan(state: &AppState, user: &mut User) -> Result<(), AppError> {
    let subscriptions = state.db.get_subscriptions_for_user(&user.id).await?;
    let plan = if subscriptions
        .iter()
        .any(|s| Plan::from_status(&s.status) == Plan::Pro)
    {
        Plan::Pro
    } else {
        Plan::Free
    };

    if user.plan != plan {
        tracing::info!(user_id = %user.id, from = ?user.plan, to = ?plan, "Plan changed");
        user.plan = plan;
        user.updated_at = chrono::Utc::now().to_rfc3339();
        state.db.update_user(user).await?;
    }
    Ok(())
}

async fn handle_subscription(
    state: &AppState,
    event: &WebhookEvent,
    meta: &WebhookMeta,
    subscription_id: &str,
    attrs: &SubscriptionAttributes,
) -> Result<(), AppError> {
    let Some(mut user) =
        resolve_user(state, meta, subscription_id, attrs.user_email.as_deref()).await?
    else {
        // Acknowledge anyway, a retry would not find the user either
        tracing::error!(
            subscription_id,
            event = ?event,
            "Webhook user could not be resolved"
        );
        return Ok(());
    };

    if *event == WebhookEvent::SubscriptionExpired {
        state.db.delete_subscription(subscription_id).await?;
        sync_plan(state, &mut user).await?;
        tracing::info!(user_id = %user.id, subscription_id, "Subscription expired");
        state
            .email
            .send_best_effort(state.email.subscription_expired_email(&user))
            .await;
        return Ok(());
    }

    let existing = state.db.get_subscription(subscription_id).await?;
    let subscription = attrs.to_subscription(subscription_id, &user.id, existing.as_ref());
    state.db.upsert_subscription(&subscription).await?;
    sync_plan(state, &mut user).await?;

    tracing::info!(
        user_id = %user.id,
        subscription_id,
        status = %subscription.status,
        "Subscription stored"
    );

    let email = match event {
        WebhookEvent::SubscriptionCreated => Some(templates::subscription_started(
            user.variant,
            &user.email,
            &user.name,
            &attrs.plan_name(),
            attrs.renews_at.as_deref(),
        )),
        WebhookEvent::SubscriptionCancelled => Some(templates::subscription_cancelled(
            user.variant,
            &user.email,
            &user.name,
            attrs.ends_at.as_deref(),
        )),
        _ => None,
    };
    if let Some(email) = email {
        state.email.send_best_effort(email).await;
    }

    Ok(())
}

async fn handle_invoice(
    state: &AppState,
    event: &WebhookEvent,
    meta: &WebhookMeta,
    invoice_id: &str,
    attrs: &InvoiceAttributes,
) -> Result<(), AppError> {
    let subscription_id = attrs.subscription_id.to_string();
    let Some(user) =
        resolve_user(state, meta, &subscription_id, attrs.user_email.as_deref()).await?
    else {
        tracing::error!(
            invoice_id,
            subscription_id = %subscription_id,
            "Webhook user could not be resolved"
        );
        return Ok(());
    };

    let invoice = attrs.to_invoice(invoice_id, &user.id);
    state.db.upsert_invoice(&invoice).await?;
    tracing::info!(
        user_id = %user.id,
        invoice_id,
        status = %invoice.status,
        "Invoice stored"
    );

    let email = if *event == WebhookEvent::PaymentSucceeded {
        templates::payment_receipt(
            user.variant,
            &user.email,
            &user.name,
            &attrs.amount_display(),
            attrs.urls.invoice_url.as_deref(),
        )
    } else {
        let update_url = state
            .db
            .get_subscription(&subscription_id)
            .await?
            .and_then(|s| s.update_payment_method_url);
        templates::payment_failed(
            user.variant,
            &user.email,
            &user.name,
            update_url.as_deref(),
        )
    };
    state.email.send_best_effort(email).await;

    Ok(())
}
