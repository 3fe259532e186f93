//! CRUD operations for the users table. Users are created administratively.

use super::error::Error;
use entity::users::{ActiveModel, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, QueryOrder, TryIntoModel,
};

/// Creates a new user record
pub async fn create(db: &DatabaseConnection, user_model: Model) -> Result<Model, Error> {
    debug!("New user to be created: {}", user_model.email);

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        email: Set(user_model.email),
        display_name: Set(user_model.display_name),
        max_concurrent_bots: Set(user_model.max_concurrent_bots),
        webhook_url: Set(user_model.webhook_url),
        webhook_secret: Set(user_model.webhook_secret),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(active_model.save(db).await?.try_into_model()?)
}

/// Updates an existing user record
pub async fn update(db: &DatabaseConnection, id: Id, model: Model) -> Result<Model, Error> {
    let result = Entity::find_by_id(id).one(db).await?;

    match result {
        Some(existing) => {
            debug!("Updating user: {id}");

            let active_model = ActiveModel {
                id: Unchanged(existing.id),
                email: Unchanged(existing.email),
                display_name: Set(model.display_name),
                max_concurrent_bots: Set(model.max_concurrent_bots),
                webhook_url: Set(model.webhook_url),
                webhook_secret: Set(model.webhook_secret),
                webhook_last_error: Unchanged(existing.webhook_last_error),
                created_at: Unchanged(existing.created_at),
                updated_at: Set(chrono::Utc::now().into()),
            };

            Ok(active_model.update(db).await?.try_into_model()?)
        }
        None => Err(Error::not_found()),
    }
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(entity::users::Column::Email.eq(email))
        .one(db)
        .await?)
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .order_by_asc(entity::users::Column::Id)
        .all(db)
        .await?)
}

/// Records the outcome of the user's most recent webhook delivery; `None`
/// clears a previous failure after a successful send.
pub async fn record_webhook_error(
    db: &DatabaseConnection,
    id: Id,
    error: Option<String>,
) -> Result<(), Error> {
    use sea_orm::sea_query::Expr;

    Entity::update_many()
        .col_expr(entity::users::Column::WebhookLastError, Expr::value(error))
        .col_expr(
            entity::users::Column::UpdatedAt,
            Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(
                chrono::Utc::now(),
            )),
        )
        .filter(entity::users::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::error::EntityApiErrorKind;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user() -> Model {
        let now = chrono::Utc::now();
        Model {
            id: 1,
            email: "u1@example.com".to_string(),
            display_name: Some("User One".to_string()),
            max_concurrent_bots: 2,
            webhook_url: None,
            webhook_secret: None,
            webhook_last_error: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_by_id_returns_the_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user()]])
            .into_connection();

        let found = find_by_id(&db, 1).await.unwrap();
        assert_eq!(found.email, "u1@example.com");
    }

    #[tokio::test]
    async fn find_by_id_reports_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Model>::new()])
            .into_connection();

        let result = find_by_id(&db, 42).await;
        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound
        );
    }
}
