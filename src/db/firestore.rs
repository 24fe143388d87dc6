// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles and credentials)
//! - Tokens (refresh / reset-password / verify-email)
//! - Subscriptions and invoices (mirrored from Lemon Squeezy)
//! - Streaks, waitlist entries and the product catalogue

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Notifier, Product, Streak, Subscription, SubscriptionInvoice, Token, TokenType, User,
};
use firestore::errors::FirestoreError;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by (normalized) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = crate::models::user::normalize_email(email);
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("email").eq(email.as_str())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create a new user. Fails with `Conflict` if the email is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict("Email already taken".to_string()));
        }

        let _: User = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| match e {
                FirestoreError::DataConflictError(_) => {
                    AppError::Conflict("User already exists".to_string())
                }
                other => AppError::Database(other.to_string()),
            })?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    /// Overwrite an existing user document.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List users, newest first.
    pub async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Token Operations ────────────────────────────────────────

    /// Store a token document.
    pub async fn save_token(&self, token: &Token) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TOKENS)
            .document_id(&token.token_hash)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Find a non-blacklisted token matching hash, type and owner.
    pub async fn find_token(
        &self,
        token_hash: &str,
        token_type: TokenType,
        user_id: &str,
    ) -> Result<Option<Token>, AppError> {
        let token: Option<Token> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TOKENS)
            .obj()
            .one(token_hash)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(token.filter(|t| t.token_type == token_type && t.user_id == user_id && !t.blacklisted))
    }

    /// Delete a single token document.
    pub async fn delete_token(&self, token_hash: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::TOKENS)
            .document_id(token_hash)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every token of one type belonging to a user.
    ///
    /// Returns the number of tokens deleted.
    pub async fn delete_tokens_of_type(
        &self,
        user_id: &str,
        token_type: TokenType,
    ) -> Result<usize, AppError> {
        let tokens: Vec<Token> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TOKENS)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("token_type").eq(token_type.as_str()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = tokens.len();
        self.batch_delete(&tokens, collections::TOKENS, |t: &Token| {
            t.token_hash.clone()
        })
        .await?;

        Ok(count)
    }

    // ─── Subscription Operations ─────────────────────────────────

    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(subscription_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_subscriptions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a subscription.
    pub async fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTIONS)
            .document_id(&subscription.id)
            .object(subscription)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_subscription(&self, subscription_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SUBSCRIPTIONS)
            .document_id(subscription_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Invoice Operations ──────────────────────────────────────

    /// Create or update an invoice (webhook redeliveries overwrite).
    pub async fn upsert_invoice(&self, invoice: &SubscriptionInvoice) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTION_INVOICES)
            .document_id(&invoice.id)
            .object(invoice)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Invoices for a user, newest first.
    pub async fn get_invoices_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<SubscriptionInvoice>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTION_INVOICES)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Streak Operations ───────────────────────────────────────

    pub async fn get_streak(&self, user_id: &str) -> Result<Option<Streak>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::STREAKS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_streak(&self, streak: &Streak) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::STREAKS)
            .document_id(&streak.user_id)
            .object(streak)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Notifier Operations ─────────────────────────────────────

    /// Add a waitlist entry. Fails with `Conflict` if the email is already listed.
    pub async fn create_notifier(&self, notifier: &Notifier) -> Result<(), AppError> {
        let _: Notifier = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::NOTIFIERS)
            .document_id(Notifier::document_id(&notifier.email))
            .object(notifier)
            .execute()
            .await
            .map_err(|e| match e {
                FirestoreError::DataConflictError(_) => {
                    AppError::Conflict("Email is already on the waitlist".to_string())
                }
                other => AppError::Database(other.to_string()),
            })?;
        Ok(())
    }

    pub async fn list_notifiers(&self) -> Result<Vec<Notifier>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFIERS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Product Operations ──────────────────────────────────────

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PRODUCTS)
            .order_by([("price", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_product(&self, variant_id: u64) -> Result<Option<Product>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PRODUCTS)
            .obj()
            .one(variant_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_product(&self, product: &Product) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PRODUCTS)
            .document_id(product.variant_id.to_string())
            .object(product)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    // ─── Account Deletion ──────────────────────────────────────────

    /// Delete a user and every document they own.
    ///
    /// Deletes from all collections:
    /// - `tokens` (query by user_id)
    /// - `subscription_invoices` (query by user_id)
    /// - `subscriptions` (query by user_id)
    /// - `streaks/{user_id}`
    /// - `users/{user_id}`
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Tokens
        let tokens: Vec<Token> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TOKENS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = tokens.len();
        self.batch_delete(&tokens, collections::TOKENS, |t: &Token| {
            t.token_hash.clone()
        })
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted tokens");

        // 2. Invoices
        let invoices = self.get_invoices_for_user(user_id).await?;
        let count = invoices.len();
        self.batch_delete(
            &invoices,
            collections::SUBSCRIPTION_INVOICES,
            |i: &SubscriptionInvoice| i.id.clone(),
        )
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted invoices");

        // 3. Subscriptions
        let subscriptions = self.get_subscriptions_for_user(user_id).await?;
        let count = subscriptions.len();
        self.batch_delete(
            &subscriptions,
            collections::SUBSCRIPTIONS,
            |s: &Subscription| s.id.clone(),
        )
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted subscriptions");

        // 4. Streak
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::STREAKS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        // 5. Profile
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
