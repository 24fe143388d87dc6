//! User model for storage and API.

use serde::{Deserialize, Serialize};

use crate::models::Plan;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Product variant a user signed up through.
///
/// Both variants share one auth implementation; the variant only selects
/// branding and the frontend URL used in emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductVariant {
    #[default]
    Main,
    Study,
}

impl ProductVariant {
    /// Product name shown in emails.
    pub fn display_name(self) -> &'static str {
        match self {
            ProductVariant::Main => "Learnrithm",
            ProductVariant::Study => "Learnrithm Study",
        }
    }
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID)
    pub id: String,
    pub name: String,
    /// Lowercased email address (unique)
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub variant: ProductVariant,
    /// Uploaded avatar path (served under /uploads)
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub plan: Plan,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

impl User {
    /// Build a new, unverified user.
    pub fn new(name: &str, email: &str, password_hash: String, variant: ProductVariant) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash,
            role: Role::User,
            is_email_verified: false,
            variant,
            profile_picture: None,
            country: None,
            bio: None,
            plan: Plan::Free,
            created_at: now.clone(),
            updated_at: now,
            last_login_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Emails are compared and stored case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public view of a user (never includes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub variant: ProductVariant,
    pub profile_picture: Option<String>,
    pub country: Option<String>,
    pub bio: Option<String>,
    pub plan: Plan,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_email_verified: user.is_email_verified,
            variant: user.variant,
            profile_picture: user.profile_picture,
            country: user.country,
            bio: user.bio,
            plan: user.plan,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}
