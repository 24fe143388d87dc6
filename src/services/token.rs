// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT token lifecycle: issue, verify, rotate, delete.
//!
//! Access tokens are stateless. Refresh, reset-password and verify-email
//! tokens are also persisted (by SHA-256 hash) so they can be revoked.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Token, TokenType, User};

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Random ID so two tokens issued in the same second still differ
    #[serde(default)]
    pub jti: String,
}

/// A token plus its expiry, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenWithExpiry {
    pub token: String,
    pub expires: String,
}

/// Access/refresh pair returned by login, register and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: TokenWithExpiry,
    pub refresh: TokenWithExpiry,
}

/// Issues and verifies tokens.
#[derive(Clone)]
pub struct TokenService {
    db: FirestoreDb,
    signing_key: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_password_ttl: Duration,
    verify_email_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &Config, db: FirestoreDb) -> Self {
        Self {
            db,
            signing_key: config.jwt_signing_key.clone(),
            access_ttl: Duration::minutes(config.jwt_access_expiration_minutes),
            refresh_ttl: Duration::days(config.jwt_refresh_expiration_days),
            reset_password_ttl: Duration::minutes(config.jwt_reset_password_expiration_minutes),
            verify_email_ttl: Duration::minutes(config.jwt_verify_email_expiration_minutes),
        }
    }

    /// Lifetime of refresh tokens (also used for the refresh cookie).
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a token for `user_id`.
    pub fn generate_token(
        &self,
        user_id: &str,
        expires: DateTime<Utc>,
        token_type: TokenType,
    ) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: Utc::now().timestamp().max(0) as usize,
            exp: expires.timestamp().max(0) as usize,
            token_type,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )?)
    }

    /// Check signature, expiry and type. Does not consult the database.
    pub fn decode_token(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let key = DecodingKey::from_secret(&self.signing_key);
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "JWT rejected");
            AppError::InvalidToken
        })?;

        if data.claims.token_type != expected {
            tracing::debug!(
                expected = expected.as_str(),
                actual = data.claims.token_type.as_str(),
                "JWT type mismatch"
            );
            return Err(AppError::InvalidToken);
        }

        Ok(data.claims)
    }

    /// Persist a token so it can be verified and revoked later.
    pub async fn save_token(
        &self,
        token: &str,
        user_id: &str,
        expires: DateTime<Utc>,
        token_type: TokenType,
    ) -> Result<Token> {
        let doc = Token {
            token_hash: hash_token(token),
            user_id: user_id.to_string(),
            token_type,
            expires_at: expires.to_rfc3339(),
            blacklisted: false,
            created_at: Utc::now().to_rfc3339(),
        };
        self.db.save_token(&doc).await?;
        Ok(doc)
    }

    /// Verify a stored token: valid JWT of the right type that still exists.
    pub async fn verify_token(&self, token: &str, token_type: TokenType) -> Result<Token> {
        let claims = self.decode_token(token, token_type)?;

        self.db
            .find_token(&hash_token(token), token_type, &claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    /// Issue an access token and a stored refresh token.
    pub async fn generate_auth_tokens(&self, user: &User) -> Result<AuthTokens> {
        let now = Utc::now();

        let access_expires = now + self.access_ttl;
        let access = self.generate_token(&user.id, access_expires, TokenType::Access)?;

        let refresh_expires = now + self.refresh_ttl;
        let refresh = self.generate_token(&user.id, refresh_expires, TokenType::Refresh)?;
        self.save_token(&refresh, &user.id, refresh_expires, TokenType::Refresh)
            .await?;

        Ok(AuthTokens {
            access: TokenWithExpiry {
                token: access,
                expires: access_expires.to_rfc3339(),
            },
            refresh: TokenWithExpiry {
                token: refresh,
                expires: refresh_expires.to_rfc3339(),
            },
        })
    }

    /// Replace any outstanding reset-password token with a new one.
    pub async fn generate_reset_password_token(&self, user: &User) -> Result<String> {
        self.rotate_one_time_token(user, TokenType::ResetPassword, self.reset_password_ttl)
            .await
    }

    /// Replace any outstanding verify-email token with a new one.
    pub async fn generate_verify_email_token(&self, user: &User) -> Result<String> {
        self.rotate_one_time_token(user, TokenType::VerifyEmail, self.verify_email_ttl)
            .await
    }

    /// Delete all tokens of this type for the user, then insert one new one.
    async fn rotate_one_time_token(
        &self,
        user: &User,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String> {
        let removed = self.db.delete_tokens_of_type(&user.id, token_type).await?;
        if removed > 0 {
            tracing::debug!(
                user_id = %user.id,
                token_type = token_type.as_str(),
                removed,
                "Replaced outstanding tokens"
            );
        }

        let expires = Utc::now() + ttl;
        let token = self.generate_token(&user.id, expires, token_type)?;
        self.save_token(&token, &user.id, expires, token_type).await?;
        Ok(token)
    }
}

/// Hex SHA-256 of a token string, used as its document ID.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&Config::test_default(), FirestoreDb::new_mock())
    }

    #[test]
    fn test_generate_and_decode_roundtrip() {
        let svc = service();
        let expires = Utc::now() + Duration::minutes(5);
        let token = svc
            .generate_token("user-1", expires, TokenType::Access)
            .unwrap();

        let claims = svc.decode_token(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let svc = service();
        let token = svc
            .generate_token("user-1", Utc::now() + Duration::days(1), TokenType::Refresh)
            .unwrap();

        assert!(matches!(
            svc.decode_token(&token, TokenType::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_decode_rejects_expired_token() {
        let svc = service();
        // Beyond the default 60s leeway
        let token = svc
            .generate_token("user-1", Utc::now() - Duration::minutes(5), TokenType::Access)
            .unwrap();

        assert!(matches!(
            svc.decode_token(&token, TokenType::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_decode_rejects_foreign_signature() {
        let svc = service();
        let mut other_config = Config::test_default();
        other_config.jwt_signing_key = b"another_key_that_is_long_enough!".to_vec();
        let other = TokenService::new(&other_config, FirestoreDb::new_mock());

        let token = other
            .generate_token("user-1", Utc::now() + Duration::minutes(5), TokenType::Access)
            .unwrap();

        assert!(svc.decode_token(&token, TokenType::Access).is_err());
        assert!(svc.decode_token("not.a.jwt", TokenType::Access).is_err());
    }

    #[test]
    fn test_tokens_issued_together_differ() {
        let svc = service();
        let expires = Utc::now() + Duration::days(1);
        let a = svc.generate_token("user-1", expires, TokenType::Refresh).unwrap();
        let b = svc.generate_token("user-1", expires, TokenType::Refresh).unwrap();
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), hash_token(&b));
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let h = hash_token("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_token("abc"));
        assert_ne!(h, hash_token("abd"));
    }

    #[tokio::test]
    async fn test_verify_token_surfaces_database_errors_offline() {
        let svc = service();
        let token = svc
            .generate_token("user-1", Utc::now() + Duration::days(1), TokenType::Refresh)
            .unwrap();

        assert!(matches!(
            svc.verify_token(&token, TokenType::Refresh).await,
            Err(AppError::Database(_))
        ));
    }
}
