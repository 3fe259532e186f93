//! Administrative user operations: user CRUD and API-key issuance.
//!
//! The admin plane is the only writer of users; webhook settings changed here
//! take effect on the next terminal transition (the dispatcher re-reads the
//! owner at delivery time).

use crate::error::Error;
use entity::users::Model;
use entity::Id;
use entity_api::{api_key, user};
use sea_orm::DatabaseConnection;

pub use entity_api::api_key::find_user_by_token;

pub async fn create(db: &DatabaseConnection, model: Model) -> Result<Model, Error> {
    Ok(user::create(db, model).await?)
}

pub async fn update(db: &DatabaseConnection, id: Id, model: Model) -> Result<Model, Error> {
    Ok(user::update(db, id, model).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Ok(user::find_by_id(db, id).await?)
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(user::list(db).await?)
}

/// Issues an API key; the plaintext token appears in this response and
/// nowhere else afterwards.
pub async fn issue_api_key(
    db: &DatabaseConnection,
    user_id: Id,
    label: Option<String>,
) -> Result<(entity::api_keys::Model, String), Error> {
    // Ensure the user exists before minting a token for it.
    user::find_by_id(db, user_id).await?;
    Ok(api_key::create(db, user_id, label).await?)
}

pub async fn revoke_api_key(db: &DatabaseConnection, key_id: Id) -> Result<(), Error> {
    Ok(api_key::revoke(db, key_id).await?)
}

pub async fn list_api_keys(
    db: &DatabaseConnection,
    user_id: Id,
) -> Result<Vec<entity::api_keys::Model>, Error> {
    Ok(api_key::list_by_user(db, user_id).await?)
}
