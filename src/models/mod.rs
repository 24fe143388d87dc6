// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod notifier;
pub mod product;
pub mod streak;
pub mod subscription;
pub mod token;
pub mod user;

pub use notifier::Notifier;
pub use product::Product;
pub use streak::Streak;
pub use subscription::{Plan, Subscription, SubscriptionInvoice};
pub use token::{Token, TokenType};
pub use user::{normalize_email, ProductVariant, Role, User, UserResponse};
