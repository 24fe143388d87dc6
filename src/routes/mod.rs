// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod billing;
pub mod chat;
pub mod notify;
pub mod streak;
pub mod users;
pub mod webhook;

use crate::middleware::auth::{require_admin, require_auth};
use crate::middleware::rate_limit::{auth_rate_limit, rate_limit};
use crate::models::ProductVariant;
use crate::services::upload::PUBLIC_PREFIX;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Auth routes for one product variant, with the stricter rate limit.
fn auth_routes(state: &Arc<AppState>, variant: ProductVariant) -> Router<Arc<AppState>> {
    auth::routes(state.clone())
        .layer(Extension(variant))
        .layer(middleware::from_fn_with_state(state.clone(), auth_rate_limit))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from both frontends and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let study_frontend_url = state.config.study_frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str == study_frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth_routes(&state, ProductVariant::Main))
        .nest("/v2/auth", auth_routes(&state, ProductVariant::Study))
        .merge(notify::routes())
        .merge(billing::public_routes())
        .merge(webhook::routes()) // Lemon Squeezy (signature checked in handler)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(state.uploads.root()));

    // Protected routes (auth required)
    let protected_routes = users::routes()
        .merge(streak::routes())
        .merge(chat::routes())
        .merge(billing::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Admin routes (auth runs first, then the role check)
    let admin_routes = users::admin_routes()
        .merge(notify::admin_routes())
        .merge(billing::admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
