//! # Refresh Token Service
//!
//! Storage and lifecycle for long-lived refresh tokens. Tokens are opaque
//! random values; only a BLAKE3 hash is persisted.

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use entity::refresh_tokens;
use error::{AppError, Result};
use sea_orm::{prelude::*, sea_query::Expr, Set};

/// Creates a new refresh token record for a user.
///
/// # Errors
///
/// Returns an error if database operations fail.
pub async fn create_refresh_token(
    db: &sea_orm::DbConn,
    user_id: &str,
    token_value: &str,
    expires_in_seconds: u64,
) -> Result<()> {
    let token_hash = hash_refresh_token(token_value);
    let now = Utc::now();
    let expires_at = now + chrono::Duration::seconds(expires_in_seconds as i64);

    let active_model = refresh_tokens::ActiveModel {
        user_id: Set(user_id.to_string()),
        token_hash: Set(token_hash),
        expires_at: Set(expires_at),
        revoked_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    active_model
        .insert(db)
        .await
        .map_err(|e| AppError::database(format!("Failed to create refresh token: {}", e)))?;

    Ok(())
}

/// Validates a refresh token and returns the associated user ID.
///
/// # Errors
///
/// Returns `Unauthorized` if the token is unknown, expired, or revoked.
pub async fn validate_refresh_token(db: &sea_orm::DbConn, token_value: &str) -> Result<String> {
    let token_hash = hash_refresh_token(token_value);

    let token_model = refresh_tokens::Entity::find()
        .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
        .filter(refresh_tokens::Column::RevokedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

    if token_model.expires_at < Utc::now() {
        return Err(AppError::unauthorized("Refresh token has expired"));
    }

    Ok(token_model.user_id)
}

/// Revokes a single refresh token.
///
/// # Errors
///
/// Returns `Unauthorized` when the token does not exist.
pub async fn revoke_refresh_token(db: &sea_orm::DbConn, token_value: &str) -> Result<()> {
    let token_hash = hash_refresh_token(token_value);
    let now = Utc::now();

    let update_result = refresh_tokens::Entity::update_many()
        .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Some(now)))
        .col_expr(refresh_tokens::Column::UpdatedAt, Expr::value(now))
        .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
        .exec(db)
        .await?;

    if update_result.rows_affected == 0 {
        return Err(AppError::unauthorized("Refresh token not found"));
    }

    Ok(())
}

/// Revokes all refresh tokens for a user (logout everywhere).
pub async fn revoke_all_user_tokens(db: &sea_orm::DbConn, user_id: &str) -> Result<()> {
    let now = Utc::now();

    refresh_tokens::Entity::update_many()
        .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Some(now)))
        .col_expr(refresh_tokens::Column::UpdatedAt, Expr::value(now))
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .filter(refresh_tokens::Column::RevokedAt.is_null())
        .exec(db)
        .await?;

    Ok(())
}

/// Deletes expired refresh tokens, returning the number removed.
pub async fn cleanup_expired_tokens(db: &sea_orm::DbConn) -> Result<u64> {
    let delete_result = refresh_tokens::Entity::delete_many()
        .filter(refresh_tokens::Column::ExpiresAt.lt(Utc::now()))
        .exec(db)
        .await?;

    Ok(delete_result.rows_affected)
}

/// Generates a secure random refresh token value.
///
/// URL-safe base64 over 256 bits of randomness.
pub fn generate_refresh_token() -> String {
    let random_bytes = rand::random::<[u8; 32]>();
    general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Hash a refresh token for storage and lookup.
fn hash_refresh_token(token_value: &str) -> String {
    blake3::hash(token_value.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_refresh_token() {
        let token1 = generate_refresh_token();
        let token2 = generate_refresh_token();

        assert_ne!(token1, token2);

        // URL-safe base64, 32 bytes without padding
        assert_eq!(token1.len(), 43);
        assert!(token1
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_refresh_token_hashing_deterministic() {
        let hash1 = hash_refresh_token("test-token-value");
        let hash2 = hash_refresh_token("test-token-value");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_refresh_token_hashing_distinguishes_tokens() {
        assert_ne!(hash_refresh_token("token-a"), hash_refresh_token("token-b"));
    }
}
