//! CRUD operations for the media_files table.

use super::error::Error;
use entity::media_files::{ActiveModel, Entity, Model};
use entity::media_kind::MediaKind;
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection, QueryOrder, TryIntoModel};

/// Records one stored artifact of a recording.
pub async fn create(
    db: &DatabaseConnection,
    recording_id: Id,
    kind: MediaKind,
    format: &str,
    size_bytes: i64,
    duration_seconds: Option<i32>,
    storage_key: &str,
) -> Result<Model, Error> {
    debug!("Recording media file {storage_key} for recording {recording_id}");

    let active_model = ActiveModel {
        recording_id: Set(recording_id),
        kind: Set(kind),
        format: Set(format.to_string()),
        size_bytes: Set(size_bytes),
        duration_seconds: Set(duration_seconds),
        storage_key: Set(storage_key.to_string()),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    };

    Ok(active_model.save(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

pub async fn list_by_recording(
    db: &DatabaseConnection,
    recording_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(entity::media_files::Column::RecordingId.eq(recording_id))
        .order_by_asc(entity::media_files::Column::Id)
        .all(db)
        .await?)
}
