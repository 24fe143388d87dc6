//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TOKENS: &str = "tokens";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const SUBSCRIPTION_INVOICES: &str = "subscription_invoices";
    /// Streak documents (keyed by user id)
    pub const STREAKS: &str = "streaks";
    pub const NOTIFIERS: &str = "notifiers";
    pub const PRODUCTS: &str = "products";
}
