// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Learnrithm: backend API for the Learnrithm and Learnrithm Study apps.
//!
//! Accounts and JWT sessions, profile management, learning streaks, an AI
//! tutor chat proxy, a waitlist, and Lemon Squeezy subscription webhooks.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use middleware::RateLimiter;
use services::{ChatHistory, EmailService, OpenAiClient, TokenService, UploadStore};
use std::time::Duration;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub tokens: TokenService,
    pub email: EmailService,
    pub openai: OpenAiClient,
    pub chat_history: ChatHistory,
    pub uploads: UploadStore,
    pub rate_limiter: RateLimiter,
    pub auth_rate_limiter: RateLimiter,
}

impl AppState {
    /// Build every service from configuration and a database handle.
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        let window = Duration::from_secs(config.rate_limit_window_secs);
        Self {
            tokens: TokenService::new(&config, db.clone()),
            email: EmailService::new(&config),
            openai: OpenAiClient::new(config.openai_api_key.clone(), config.openai_model.clone()),
            chat_history: ChatHistory::new(),
            uploads: UploadStore::new(&config.upload_dir),
            rate_limiter: RateLimiter::new(config.rate_limit_max_requests, window),
            auth_rate_limiter: RateLimiter::new(config.auth_rate_limit_max_requests, window),
            config,
            db,
        }
    }
}
