// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily learning streak routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::streak::CheckIn;
use crate::models::Streak;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/streak", get(get_streak))
        .route("/api/v1/streak/check-in", post(check_in))
}

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<String>,
    pub checked_in_today: bool,
}

impl StreakResponse {
    fn new(streak: &Streak, today: NaiveDate) -> Self {
        Self {
            current_streak: streak.effective_current(today),
            longest_streak: streak.longest_streak,
            last_activity_date: streak.last_activity_date.clone(),
            checked_in_today: streak.last_activity_date.as_deref()
                == Some(today.format("%Y-%m-%d").to_string().as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub outcome: CheckIn,
    #[serde(flatten)]
    pub streak: StreakResponse,
}

async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<StreakResponse>> {
    let streak = state
        .db
        .get_streak(&auth.user_id)
        .await?
        .unwrap_or_else(|| Streak::new(&auth.user_id));

    Ok(Json(StreakResponse::new(&streak, Utc::now().date_naive())))
}

/// Record today's activity.
async fn check_in(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CheckInResponse>> {
    let today = Utc::now().date_naive();
    let mut streak = state
        .db
        .get_streak(&auth.user_id)
        .await?
        .unwrap_or_else(|| Streak::new(&auth.user_id));

    let outcome = streak.check_in(today);
    if outcome != CheckIn::Unchanged {
        state.db.set_streak(&streak).await?;
        tracing::debug!(
            user_id = %auth.user_id,
            current = streak.current_streak,
            outcome = ?outcome,
            "Streak updated"
        );
    }

    Ok(Json(CheckInResponse {
        outcome,
        streak: StreakResponse::new(&streak, today),
    }))
}
