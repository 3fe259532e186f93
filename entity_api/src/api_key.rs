//! Issuance and lookup of API keys.
//!
//! Only the sha-256 of a token is stored. The plaintext exists exactly once,
//! in the issuance response; every later request is authenticated by hashing
//! the presented token and looking the digest up.

use super::error::Error;
use entity::api_keys::{ActiveModel, Entity, Model};
use entity::{users, Id};
use log::*;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection, QueryOrder, TryIntoModel};
use sha2::{Digest, Sha256};

const TOKEN_PREFIX: &str = "vexa_";
const TOKEN_RANDOM_LEN: usize = 40;

/// Hex sha-256 of a presented token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generates a fresh plaintext token.
pub fn generate_token() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{TOKEN_PREFIX}{random}")
}

/// Issues a new key for a user. Returns the stored row and the plaintext
/// token; the plaintext is not recoverable afterwards.
pub async fn create(
    db: &DatabaseConnection,
    user_id: Id,
    label: Option<String>,
) -> Result<(Model, String), Error> {
    let token = generate_token();

    debug!("Issuing API key for user: {user_id}");

    let active_model = ActiveModel {
        user_id: Set(user_id),
        token_hash: Set(hash_token(&token)),
        label: Set(label),
        created_at: Set(chrono::Utc::now().into()),
        revoked_at: Set(None),
        ..Default::default()
    };

    let model = active_model.save(db).await?.try_into_model()?;
    Ok((model, token))
}

/// Authenticates a presented token: hash, look up a live key, resolve the
/// owning user. `None` for unknown or revoked tokens.
pub async fn find_user_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<users::Model>, Error> {
    let digest = hash_token(token);

    let result = Entity::find()
        .filter(entity::api_keys::Column::TokenHash.eq(digest))
        .filter(entity::api_keys::Column::RevokedAt.is_null())
        .find_also_related(users::Entity)
        .one(db)
        .await?;

    Ok(result.and_then(|(_key, user)| user))
}

pub async fn list_by_user(db: &DatabaseConnection, user_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(entity::api_keys::Column::UserId.eq(user_id))
        .order_by_asc(entity::api_keys::Column::Id)
        .all(db)
        .await?)
}

/// Marks a key revoked. Idempotent; revoking an already-revoked key succeeds.
pub async fn revoke(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    use sea_orm::sea_query::Expr;

    let result = Entity::update_many()
        .col_expr(
            entity::api_keys::Column::RevokedAt,
            Expr::value(Some(chrono::DateTime::<chrono::FixedOffset>::from(
                chrono::Utc::now(),
            ))),
        )
        .filter(entity::api_keys::Column::Id.eq(id))
        .filter(entity::api_keys::Column::RevokedAt.is_null())
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Distinguish "already revoked" (fine) from "no such key".
        if Entity::find_by_id(id).one(db).await?.is_none() {
            return Err(Error::not_found());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_carry_the_prefix_and_length() {
        let token = generate_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + TOKEN_RANDOM_LEN);
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_hash_token_is_deterministic_hex_sha256() {
        let digest = hash_token("vexa_abc");
        assert_eq!(digest, hash_token("vexa_abc"));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest, hash_token("vexa_abd"));
    }
}
