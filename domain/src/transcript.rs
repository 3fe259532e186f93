//! Transcript access and ingest.
//!
//! Segments are produced by the transcription path and ingested through the
//! worker callback plane; users read them scoped to their own meetings. A
//! share token, stored in the meeting's data bag, opens one meeting's
//! transcript to unauthenticated readers until the meeting is anonymized
//! (the scrub removes the token along with the rest of the bag).

use crate::error::Error;
use crate::meeting;
use entity::meetings::Model as Meeting;
use entity::platform::Platform;
use entity::transcript_segments::Model as Segment;
use entity::Id;
use entity_api::transcript_segment;
use log::*;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

pub use entity_api::transcript_segment::SegmentInput;

const SHARE_TOKEN_KEY: &str = "share_token";

/// Segments of the caller's meeting, ordered by start offset.
pub async fn list(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<(Meeting, Vec<Segment>), Error> {
    let meeting = meeting::find_latest(db, owner_id, platform, native_meeting_id)
        .await?
        .ok_or_else(Error::not_found)?;

    let segments = transcript_segment::list_by_meeting(db, meeting.id).await?;
    Ok((meeting, segments))
}

/// Ingest from the worker callback plane; idempotent per segment key.
pub async fn ingest(
    db: &DatabaseConnection,
    meeting_id: Id,
    session_uid: Uuid,
    segments: Vec<SegmentInput>,
) -> Result<(), Error> {
    Ok(transcript_segment::ingest(db, meeting_id, session_uid, segments).await?)
}

/// Creates (or returns) the meeting's share token.
pub async fn share(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<String, Error> {
    let meeting = meeting::find_latest(db, owner_id, platform, native_meeting_id)
        .await?
        .ok_or_else(Error::not_found)?;

    if let Some(existing) = meeting
        .data
        .get(SHARE_TOKEN_KEY)
        .and_then(|value| value.as_str())
    {
        return Ok(existing.to_string());
    }

    let token = Uuid::new_v4().simple().to_string();
    let mut patch = serde_json::Map::new();
    patch.insert(
        SHARE_TOKEN_KEY.to_string(),
        serde_json::Value::String(token.clone()),
    );
    meeting::patch_data(
        db,
        owner_id,
        platform,
        native_meeting_id,
        serde_json::Value::Object(patch),
    )
    .await?;

    info!("Issued transcript share token for meeting {}", meeting.id);
    Ok(token)
}

/// Resolves a share token to its transcript, no authentication involved.
pub async fn find_shared(
    db: &DatabaseConnection,
    token: &str,
) -> Result<(Meeting, Vec<Segment>), Error> {
    // The token lives in the data bag, so anonymization revokes it for free.
    let meetings = entity_api::meeting::list_with_share_token(db, SHARE_TOKEN_KEY, token).await?;
    let meeting = meetings.into_iter().next().ok_or_else(Error::not_found)?;
    let segments = transcript_segment::list_by_meeting(db, meeting.id).await?;
    Ok((meeting, segments))
}
