// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the logged-in user, plus admin user management.

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::AuthUser;
use crate::models::{normalize_email, TokenType, UserResponse};
use crate::services::password;
use crate::services::upload::MAX_UPLOAD_BYTES;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Routes for the logged-in user (auth applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/users/me",
            get(get_me).patch(update_me).delete(delete_me),
        )
        .route("/api/v1/users/me/password", patch(change_password))
        .route(
            "/api/v1/users/me/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
        )
}

/// Admin-only routes (auth and admin check applied in routes/mod.rs).
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/admin/users", get(list_users))
        .route(
            "/api/v1/admin/users/{id}",
            get(get_user).delete(delete_user),
        )
}

// ─── Current user ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub country: Option<String>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub bio: Option<String>,
}

/// Update profile fields. Changing the email requires re-verification.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    payload.validate()?;

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        if email != user.email {
            if state.db.find_user_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict("Email already taken".to_string()));
            }
            tracing::info!(user_id = %user.id, "Email changed, verification reset");
            user.email = email;
            user.is_email_verified = false;
        }
    }
    if let Some(name) = payload.name {
        user.name = name.trim().to_string();
    }
    if let Some(country) = payload.country {
        user.country = Some(country).filter(|c| !c.trim().is_empty());
    }
    if let Some(bio) = payload.bio {
        user.bio = Some(bio).filter(|b| !b.trim().is_empty());
    }

    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.update_user(&user).await?;

    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub current_password: String,
    #[validate(
        length(min = 8, max = 128, message = "must be 8 to 128 characters"),
        custom(function = "crate::services::password::validate_password_strength")
    )]
    pub new_password: String,
}

/// Change password. Signs out every other session.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<StatusCode> {
    payload.validate()?;

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !password::verify(&payload.current_password, &user.password_hash).await {
        return Err(AppError::AuthFailed(
            "Current password is incorrect".to_string(),
        ));
    }

    user.password_hash = password::hash(&payload.new_password).await?;
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.update_user(&user).await?;

    let revoked = state
        .db
        .delete_tokens_of_type(&user.id, TokenType::Refresh)
        .await?;
    tracing::info!(user_id = %user.id, revoked, "Password changed");

    state
        .email
        .send_best_effort(state.email.password_changed_email(&user))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete the caller's account and everything it owns.
async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode> {
    tracing::info!(user_id = %auth.user_id, "User-initiated account deletion");
    remove_account(&state, &auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a user's documents, in-memory chat history and avatar file.
async fn remove_account(state: &AppState, user_id: &str) -> Result<()> {
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let deleted = state.db.delete_user(user_id).await?;
    state.chat_history.clear_user(user_id);
    if let Some(picture) = &user.profile_picture {
        state.uploads.remove(picture).await;
    }

    tracing::info!(user_id, deleted, "Account deleted");
    Ok(())
}

// ─── Avatar ──────────────────────────────────────────────────

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("File exceeds {} bytes", MAX_UPLOAD_BYTES))
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// Upload a profile picture from the multipart `file` field.
async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((content_type, bytes));
        break;
    }

    let (content_type, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let path = state
        .uploads
        .save_avatar(&user.id, &content_type, &bytes)
        .await?;

    let previous = user.profile_picture.replace(path);
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.update_user(&user).await?;

    if let Some(previous) = previous {
        state.uploads.remove(&previous).await;
    }

    Ok(Json(user.into()))
}

// ─── Admin ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub results: Vec<UserResponse>,
    pub page: u32,
    pub limit: u32,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListUsersQuery>,
) -> Result<Json<UserListResponse>> {
    if params.page < 1 {
        return Err(AppError::BadRequest(
            "Page must be greater than 0".to_string(),
        ));
    }
    let limit = params.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = (params.page - 1).saturating_mul(limit);

    let users = state.db.list_users(limit, offset).await?;

    Ok(Json(UserListResponse {
        results: users.into_iter().map(UserResponse::from).collect(),
        page: params.page,
        limit,
    }))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<String>,
) -> Result<Json<UserResponse>> {
    let user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(user.into()))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode> {
    tracing::info!(admin_id = %admin.user_id, user_id = %id, "Admin account deletion");
    remove_account(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
