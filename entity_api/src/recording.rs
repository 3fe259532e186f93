//! CRUD operations for the recordings table.

use super::error::Error;
use entity::meetings;
use entity::recording_source::RecordingSource;
use entity::recording_status::RecordingStatus;
use entity::recordings::{ActiveModel, Entity, Model, Relation};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, JoinType, QueryOrder, QuerySelect, TryIntoModel,
};
use uuid::Uuid;

/// Creates a recording row at worker start.
pub async fn create(
    db: &DatabaseConnection,
    meeting_id: Id,
    session_uid: Uuid,
    source: RecordingSource,
) -> Result<Model, Error> {
    debug!("Creating recording for meeting: {meeting_id}");

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        meeting_id: Set(meeting_id),
        session_uid: Set(session_uid),
        source: Set(source),
        status: Set(RecordingStatus::Recording),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(active_model.save(db).await?.try_into_model()?)
}

/// Updates just the status of a recording
pub async fn update_status(
    db: &DatabaseConnection,
    id: Id,
    status: RecordingStatus,
    error_message: Option<String>,
) -> Result<Model, Error> {
    let result = Entity::find_by_id(id).one(db).await?;

    match result {
        Some(existing) => {
            debug!("Updating recording status to {:?}: {id}", status);

            let active_model = ActiveModel {
                id: Unchanged(existing.id),
                meeting_id: Unchanged(existing.meeting_id),
                session_uid: Unchanged(existing.session_uid),
                source: Unchanged(existing.source),
                status: Set(status),
                error_message: Set(error_message),
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

/// Owner-scoped lookup; recordings are reached through their meeting's owner.
pub async fn find_by_id_for_owner(
    db: &DatabaseConnection,
    id: Id,
    owner_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(entity::recordings::Column::Id.eq(id))
        .join(JoinType::InnerJoin, Relation::Meetings.def())
        .filter(meetings::Column::UserId.eq(owner_id))
        .one(db)
        .await?)
}

pub async fn list_by_owner(db: &DatabaseConnection, owner_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .join(JoinType::InnerJoin, Relation::Meetings.def())
        .filter(meetings::Column::UserId.eq(owner_id))
        .order_by_desc(entity::recordings::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn find_by_meeting(db: &DatabaseConnection, meeting_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(entity::recordings::Column::MeetingId.eq(meeting_id))
        .order_by_desc(entity::recordings::Column::CreatedAt)
        .all(db)
        .await?)
}

/// The recording rows the worker is still allowed to finalize: the latest
/// non-deleted row for the session.
pub async fn find_open_by_meeting_session(
    db: &DatabaseConnection,
    meeting_id: Id,
    session_uid: Uuid,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(entity::recordings::Column::MeetingId.eq(meeting_id))
        .filter(entity::recordings::Column::SessionUid.eq(session_uid))
        .filter(entity::recordings::Column::Status.eq(RecordingStatus::Recording))
        .order_by_desc(entity::recordings::Column::CreatedAt)
        .one(db)
        .await?)
}
