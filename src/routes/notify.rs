// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! "Notify me" waitlist.

use crate::error::Result;
use crate::extract::AppJson;
use crate::models::{normalize_email, Notifier};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Public signup.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/notify", post(add_notifier))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/admin/notifiers", get(list_notifiers))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NotifyRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub source: Option<String>,
}

async fn add_notifier(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<NotifyRequest>,
) -> Result<(StatusCode, Json<Notifier>)> {
    payload.validate()?;

    let notifier = Notifier {
        email: normalize_email(&payload.email),
        name: payload.name.filter(|n| !n.trim().is_empty()),
        source: payload.source,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    state.db.create_notifier(&notifier).await?;

    tracing::info!(source = ?notifier.source, "Waitlist signup");
    Ok((StatusCode::CREATED, Json(notifier)))
}

async fn list_notifiers(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Notifier>>> {
    Ok(Json(state.db.list_notifiers().await?))
}
