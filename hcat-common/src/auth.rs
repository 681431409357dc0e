//! Bearer-token authentication
//!
//! Tokens are issued by the external session service. This module only
//! resolves a presented token to an [`Identity`]:
//! - Header form: `Authorization: Bearer <token>`
//! - Lookup key: SHA-256 of the raw token as 64 hex characters
//! - Tokens are never stored in clear text
//!
//! No HTTP framework types here; services wrap [`AuthProvider`] in their own
//! extractors.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::models::{Identity, Role};
use crate::{time, Error, Result};

/// Resolves a caller's identity from a bearer credential
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns `Error::Unauthorized` for unknown credentials
    async fn resolve(&self, credential: &str) -> Result<Identity>;
}

/// Calculate the storage hash of a token
///
/// # Examples
///
/// ```
/// use hcat_common::auth::hash_token;
///
/// let hash = hash_token("secret-token");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the credential from an `Authorization` header value
///
/// Scheme match is case-insensitive; blank credentials are rejected.
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, credential) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let credential = credential.trim();
    (!credential.is_empty()).then_some(credential)
}

/// Token lookup against the `api_tokens` table
#[derive(Clone)]
pub struct TokenAuthProvider {
    db: SqlitePool,
}

impl TokenAuthProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthProvider for TokenAuthProvider {
    async fn resolve(&self, credential: &str) -> Result<Identity> {
        let row = sqlx::query(
            "SELECT user_id, username, role FROM api_tokens WHERE token_hash = ?",
        )
        .bind(hash_token(credential))
        .fetch_optional(&self.db)
        .await?;

        let row = row.ok_or_else(|| Error::Unauthorized("unknown token".to_string()))?;
        let role: String = row.get("role");

        Ok(Identity {
            user_id: row.get("user_id"),
            username: row.get("username"),
            role: role
                .parse::<Role>()
                .map_err(|_| Error::Internal(format!("Stored token has invalid role '{}'", role)))?,
        })
    }
}

/// Store the hash of an externally issued token
///
/// Re-registering a token replaces the identity it maps to.
pub async fn register_token(db: &SqlitePool, token: &str, identity: &Identity) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO api_tokens (token_hash, user_id, username, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(token_hash) DO UPDATE SET
            user_id = excluded.user_id,
            username = excluded.username,
            role = excluded.role
        "#,
    )
    .bind(hash_token(token))
    .bind(&identity.user_id)
    .bind(&identity.username)
    .bind(identity.role.as_str())
    .bind(time::to_db_timestamp(&time::now()))
    .execute(db)
    .await?;

    Ok(())
}
