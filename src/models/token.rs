// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored session and one-time tokens.

use serde::{Deserialize, Serialize};

/// Token purpose. Access tokens are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    ResetPassword,
    VerifyEmail,
}

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::ResetPassword => "reset_password",
            TokenType::VerifyEmail => "verify_email",
        }
    }
}

/// Token document, keyed by the SHA-256 of the JWT string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Hex SHA-256 of the JWT (also used as document ID)
    pub token_hash: String,
    pub user_id: String,
    pub token_type: TokenType,
    /// Expiry (RFC 3339)
    pub expires_at: String,
    #[serde(default)]
    pub blacklisted: bool,
    pub created_at: String,
}
