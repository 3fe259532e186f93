//! Operations for the append-only transcript_segments table.
//!
//! Segments arrive from the transcription path and are keyed by
//! (meeting_id, session_uid, start_ms); re-delivery of the same segment is a
//! no-op. The control plane's only write besides ingest is deletion during
//! meeting anonymization.

use super::error::Error;
use entity::transcript_segments::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder};
use uuid::Uuid;

/// One incoming segment from the transcription path.
#[derive(Debug, Clone)]
pub struct SegmentInput {
    pub start_ms: i32,
    pub end_ms: i32,
    pub text: String,
    pub speaker: Option<String>,
    pub language: Option<String>,
}

/// Idempotent batch ingest; duplicate (meeting, session, start_ms) rows are
/// silently skipped.
pub async fn ingest(
    db: &DatabaseConnection,
    meeting_id: Id,
    session_uid: Uuid,
    segments: Vec<SegmentInput>,
) -> Result<(), Error> {
    if segments.is_empty() {
        return Ok(());
    }

    debug!(
        "Ingesting {} transcript segment(s) for meeting {meeting_id}",
        segments.len()
    );

    let now = chrono::Utc::now();
    let rows: Vec<ActiveModel> = segments
        .into_iter()
        .map(|segment| ActiveModel {
            meeting_id: Set(meeting_id),
            session_uid: Set(session_uid),
            start_ms: Set(segment.start_ms),
            end_ms: Set(segment.end_ms),
            text: Set(segment.text),
            speaker: Set(segment.speaker),
            language: Set(segment.language),
            created_at: Set(now.into()),
            ..Default::default()
        })
        .collect();

    Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([Column::MeetingId, Column::SessionUid, Column::StartMs])
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(db)
        .await?;

    Ok(())
}

pub async fn list_by_meeting(db: &DatabaseConnection, meeting_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::MeetingId.eq(meeting_id))
        .order_by_asc(Column::StartMs)
        .all(db)
        .await?)
}

/// Removes every segment of a meeting; part of anonymization when called
/// outside the registry transaction.
pub async fn delete_by_meeting(db: &DatabaseConnection, meeting_id: Id) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::MeetingId.eq(meeting_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
