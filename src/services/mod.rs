// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod chat;
pub mod email;
pub mod lemonsqueezy;
pub mod openai;
pub mod password;
pub mod token;
pub mod upload;

pub use chat::ChatHistory;
pub use email::EmailService;
pub use openai::OpenAiClient;
pub use token::{AuthTokens, TokenService};
pub use upload::UploadStore;
