// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! "Notify me" waitlist entries.

use serde::{Deserialize, Serialize};

/// Waitlist entry, keyed by the url-encoded lowercase email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notifier {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Where the signup came from (landing page, app banner, ...)
    #[serde(default)]
    pub source: Option<String>,
    pub created_at: String,
}

impl Notifier {
    /// Document ID for an email address.
    pub fn document_id(email: &str) -> String {
        urlencoding::encode(&crate::models::user::normalize_email(email)).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_case_insensitive_and_path_safe() {
        assert_eq!(
            Notifier::document_id("Ada+News@Example.com"),
            Notifier::document_id("ada+news@example.com ")
        );
        assert!(!Notifier::document_id("a/b@example.com").contains('/'));
    }
}
