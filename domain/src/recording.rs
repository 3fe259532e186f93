//! Recording and media-file operations.
//!
//! Recording rows are created by the lifecycle layer at worker start; this
//! module covers the read paths, the worker's finalized-media upload, and
//! user-initiated deletion. Upload failures mark the recording failed but
//! never touch the meeting's lifecycle (recording is a best-effort side
//! channel).

use crate::error::Error;
use crate::storage::{object_key, Storage};
use entity::media_files::Model as MediaFile;
use entity::media_kind::MediaKind;
use entity::recording_status::RecordingStatus;
use entity::recordings::Model as Recording;
use entity::Id;
use entity_api::{media_file, recording};
use log::*;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

/// A recording with its media rows, the read-path response shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordingWithMedia {
    #[serde(flatten)]
    pub recording: Recording,
    pub media_files: Vec<MediaFile>,
}

pub async fn list_for_owner(
    db: &DatabaseConnection,
    owner_id: Id,
) -> Result<Vec<RecordingWithMedia>, Error> {
    let recordings = recording::list_by_owner(db, owner_id).await?;
    let mut enriched = Vec::with_capacity(recordings.len());
    for rec in recordings {
        if rec.status == RecordingStatus::Deleted {
            continue;
        }
        let media_files = media_file::list_by_recording(db, rec.id).await?;
        enriched.push(RecordingWithMedia {
            recording: rec,
            media_files,
        });
    }
    Ok(enriched)
}

/// Owner-scoped fetch; deleted recordings answer as missing.
pub async fn find_for_owner(
    db: &DatabaseConnection,
    recording_id: Id,
    owner_id: Id,
) -> Result<RecordingWithMedia, Error> {
    let rec = recording::find_by_id_for_owner(db, recording_id, owner_id)
        .await?
        .filter(|rec| rec.status != RecordingStatus::Deleted)
        .ok_or_else(Error::not_found)?;

    let media_files = media_file::list_by_recording(db, rec.id).await?;
    Ok(RecordingWithMedia {
        recording: rec,
        media_files,
    })
}

/// Marks one recording deleted and forgets its media rows.
pub async fn delete_for_owner(
    db: &DatabaseConnection,
    recording_id: Id,
    owner_id: Id,
) -> Result<(), Error> {
    let rec = recording::find_by_id_for_owner(db, recording_id, owner_id)
        .await?
        .ok_or_else(Error::not_found)?;

    recording::update_status(db, rec.id, RecordingStatus::Deleted, None).await?;
    info!("Recording {} deleted by its owner", rec.id);
    Ok(())
}

/// Accepts the worker's finalized media blob: store the bytes under the
/// object-key convention, record the media row, and complete the recording.
pub async fn finalize_upload(
    db: &DatabaseConnection,
    storage: &Storage,
    meeting_id: Id,
    session_uid: Uuid,
    format: &str,
    duration_seconds: Option<i32>,
    bytes: &[u8],
) -> Result<MediaFile, Error> {
    let rec = recording::find_open_by_meeting_session(db, meeting_id, session_uid)
        .await?
        .ok_or_else(Error::not_found)?;

    let key = object_key(meeting_id, session_uid, format);
    match storage.save(&key, bytes).await {
        Ok(size) => {
            let media = media_file::create(
                db,
                rec.id,
                MediaKind::Audio,
                format,
                size as i64,
                duration_seconds,
                &key,
            )
            .await?;
            recording::update_status(db, rec.id, RecordingStatus::Completed, None).await?;
            info!(
                "Recording {} completed with {} bytes at {key}",
                rec.id, size
            );
            Ok(media)
        }
        Err(e) => {
            warn!("Recording {} upload failed: {e}", rec.id);
            let _ = recording::update_status(
                db,
                rec.id,
                RecordingStatus::Failed,
                Some(e.to_string()),
            )
            .await;
            Err(e)
        }
    }
}

/// Resolves the media file for raw serving, owner-scoped through the
/// recording row.
pub async fn media_for_raw(
    db: &DatabaseConnection,
    storage: &Storage,
    recording_id: Id,
    file_id: Id,
    owner_id: Id,
) -> Result<(MediaFile, std::path::PathBuf), Error> {
    let with_media = find_for_owner(db, recording_id, owner_id).await?;
    let media = with_media
        .media_files
        .into_iter()
        .find(|media| media.id == file_id)
        .ok_or_else(Error::not_found)?;

    let path = storage.local_path(&media.storage_key)?;
    Ok((media, path))
}
