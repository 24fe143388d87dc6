// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.
//!
//! Mounted once per product variant; the variant arrives as an
//! `Extension<ProductVariant>` and only affects email branding and links.

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
    middleware,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppQuery};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::models::{normalize_email, ProductVariant, TokenType, User, UserResponse};
use crate::services::password;
use crate::services::token::{hash_token, AuthTokens};
use crate::AppState;

/// Cookie holding the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let authenticated = Router::new()
        .route("/send-verification-email", post(send_verification_email))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-tokens", post(refresh_tokens))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/verify-email", post(verify_email))
        .merge(authenticated)
}

// ─── Request / response bodies ───────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 8, max = 128, message = "must be 8 to 128 characters"),
        custom(function = "crate::services::password::validate_password_strength")
    )]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Body of logout / refresh. The token may also come from the cookie.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(
        length(min = 8, max = 128, message = "must be 8 to 128 characters"),
        custom(function = "crate::services::password::validate_password_strength")
    )]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: AuthTokens,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: AuthTokens,
}

// ─── Cookies ─────────────────────────────────────────────────

fn refresh_cookie(state: &AppState, value: String) -> Cookie<'static> {
    let max_age = time::Duration::seconds(state.tokens.refresh_ttl().num_seconds());
    Cookie::build((REFRESH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies())
        .max_age(max_age)
        .build()
}

/// Removal cookie with the same attributes the cookie was set with.
///
/// Added explicitly so the browser drops it even when the request
/// carried the token in the body instead.
fn removal_cookie(state: &AppState) -> Cookie<'static> {
    let mut cookie = refresh_cookie(state, String::new());
    cookie.make_removal();
    cookie
}

/// Parse an optional JSON body; an empty body yields the default.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Refresh token from the body, falling back to the cookie.
fn refresh_token_from(jar: &CookieJar, body: &Bytes) -> Result<Option<String>> {
    let request: RefreshTokenRequest = optional_body(body)?;
    Ok(request
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string())))
}

// ─── Handlers ────────────────────────────────────────────────

/// Create an account and start a session.
async fn register(
    State(state): State<Arc<AppState>>,
    Extension(variant): Extension<ProductVariant>,
    jar: CookieJar,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    payload.validate()?;

    let email = normalize_email(&payload.email);
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already taken".to_string()));
    }

    let password_hash = password::hash(&payload.password).await?;
    let user = User::new(&payload.name, &email, password_hash, variant);
    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.id, variant = ?variant, "User registered");

    let tokens = state.tokens.generate_auth_tokens(&user).await?;

    match state.tokens.generate_verify_email_token(&user).await {
        Ok(token) => {
            let email = state.email.verification_email(&user, variant, &token);
            state.email.send_best_effort(email).await;
        }
        Err(e) => tracing::warn!(error = %e, user_id = %user.id, "Verification token not created"),
    }
    state
        .email
        .send_best_effort(state.email.welcome_email(&user, variant))
        .await;

    let jar = jar.add(refresh_cookie(&state, tokens.refresh.token.clone()));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// Log in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    payload.validate()?;

    let incorrect = || AppError::AuthFailed("Incorrect email or password".to_string());

    let mut user = state
        .db
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(incorrect)?;

    if !password::verify(&payload.password, &user.password_hash).await {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(incorrect());
    }

    let now = chrono::Utc::now().to_rfc3339();
    user.last_login_at = Some(now.clone());
    user.updated_at = now;
    if let Err(e) = state.db.update_user(&user).await {
        tracing::warn!(error = %e, user_id = %user.id, "Failed to record login time");
    }

    let tokens = state.tokens.generate_auth_tokens(&user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    let jar = jar.add(refresh_cookie(&state, tokens.refresh.token.clone()));
    Ok((
        jar,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// Revoke a refresh token and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(StatusCode, CookieJar)> {
    let token = refresh_token_from(&jar, &body)?
        .ok_or_else(|| AppError::BadRequest("Refresh token is required".to_string()))?;

    let hash = hash_token(&token);
    let claims = state
        .tokens
        .decode_token(&token, TokenType::Refresh)
        .map_err(|_| AppError::NotFound("Refresh token not found".to_string()))?;
    state
        .db
        .find_token(&hash, TokenType::Refresh, &claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("Refresh token not found".to_string()))?;

    state.db.delete_token(&hash).await?;
    tracing::info!(user_id = %claims.sub, "User logged out");

    Ok((StatusCode::NO_CONTENT, jar.add(removal_cookie(&state))))
}

/// Rotate a refresh token into a new token pair.
///
/// Every failure, including a malformed body or a storage error, is a 401.
async fn refresh_tokens(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<TokensResponse>)> {
    let tokens = rotate_refresh_token(&state, &jar, &body)
        .await
        .map_err(|e| {
            if !matches!(e, AppError::Unauthorized | AppError::InvalidToken) {
                tracing::warn!(error = %e, "Token refresh failed");
            }
            AppError::Unauthorized
        })?;

    let jar = jar.add(refresh_cookie(&state, tokens.refresh.token.clone()));
    Ok((jar, Json(TokensResponse { tokens })))
}

async fn rotate_refresh_token(
    state: &AppState,
    jar: &CookieJar,
    body: &Bytes,
) -> Result<AuthTokens> {
    let token = refresh_token_from(jar, body)?.ok_or(AppError::Unauthorized)?;
    let stored = state.tokens.verify_token(&token, TokenType::Refresh).await?;

    let user = state
        .db
        .get_user(&stored.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    state.db.delete_token(&stored.token_hash).await?;
    state.tokens.generate_auth_tokens(&user).await
}

/// Email a password reset link.
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Extension(variant): Extension<ProductVariant>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> Result<StatusCode> {
    payload.validate()?;

    let user = state
        .db
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(|| AppError::NotFound("No users found with this email".to_string()))?;

    let token = state.tokens.generate_reset_password_token(&user).await?;
    state
        .email
        .send(&state.email.reset_password_email(&user, variant, &token)?)
        .await?;

    tracing::info!(user_id = %user.id, "Password reset requested");
    Ok(StatusCode::NO_CONTENT)
}

/// Set a new password using a reset token.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<TokenQuery>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<StatusCode> {
    payload.validate()?;

    let failed = || AppError::AuthFailed("Password reset failed".to_string());

    let stored = state
        .tokens
        .verify_token(&query.token, TokenType::ResetPassword)
        .await
        .map_err(|_| failed())?;

    let mut user = state
        .db
        .get_user(&stored.user_id)
        .await?
        .ok_or_else(failed)?;

    user.password_hash = password::hash(&payload.password).await?;
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.update_user(&user).await?;

    state
        .db
        .delete_tokens_of_type(&user.id, TokenType::ResetPassword)
        .await?;

    tracing::info!(user_id = %user.id, "Password reset");
    state
        .email
        .send_best_effort(state.email.password_changed_email(&user))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Send a fresh verification email to the logged-in user.
async fn send_verification_email(
    State(state): State<Arc<AppState>>,
    Extension(variant): Extension<ProductVariant>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let token = state.tokens.generate_verify_email_token(&user).await?;
    state
        .email
        .send(&state.email.verification_email(&user, variant, &token)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Mark an email address verified.
async fn verify_email(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<TokenQuery>,
) -> Result<StatusCode> {
    let failed = || AppError::AuthFailed("Email verification failed".to_string());

    let stored = state
        .tokens
        .verify_token(&query.token, TokenType::VerifyEmail)
        .await
        .map_err(|_| failed())?;

    let mut user = state
        .db
        .get_user(&stored.user_id)
        .await?
        .ok_or_else(failed)?;

    state
        .db
        .delete_tokens_of_type(&user.id, TokenType::VerifyEmail)
        .await?;

    user.is_email_verified = true;
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.update_user(&user).await?;

    tracing::info!(user_id = %user.id, "Email verified");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "password1".into(),
        };
        assert!(ok.validate().is_ok());

        let no_digit = RegisterRequest {
            password: "password".into(),
            ..ok_request()
        };
        let err = AppError::from(no_digit.validate().unwrap_err());
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("password")));

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..ok_request()
        };
        assert!(bad_email.validate().is_err());

        let empty_name = RegisterRequest {
            name: String::new(),
            ..ok_request()
        };
        assert!(empty_name.validate().is_err());
    }

    fn ok_request() -> RegisterRequest {
        RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "password1".into(),
        }
    }

    #[test]
    fn test_optional_body() {
        let empty: RefreshTokenRequest = optional_body(&Bytes::new()).unwrap();
        assert!(empty.refresh_token.is_none());

        let parsed: RefreshTokenRequest =
            optional_body(&Bytes::from_static(br#"{"refreshToken":"abc"}"#)).unwrap();
        assert_eq!(parsed.refresh_token.as_deref(), Some("abc"));

        let bad: Result<RefreshTokenRequest> = optional_body(&Bytes::from_static(b"{nope"));
        assert!(matches!(bad, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let state = AppState::new(
            crate::config::Config::test_default(),
            crate::db::FirestoreDb::new_mock(),
        );

        let cookie = refresh_cookie(&state, "tok".into());
        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        // localhost frontend in tests
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::days(30))
        );

        let removal = removal_cookie(&state);
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(time::Duration::ZERO));
        assert_eq!(removal.http_only(), Some(true));
    }
}
