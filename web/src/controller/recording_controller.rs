//! Controller for recordings and raw media playback.
//!
//! The raw endpoint honors `Range` requests with 206 + `Content-Range` and
//! always sets `Content-Disposition: inline`, so browser audio elements can
//! seek without downloading the whole file.

use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::{AppState, Error};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use domain::recording as RecordingApi;
use domain::Id;
use log::*;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// GET /recordings
///
/// The caller's recordings with their media files, newest first.
#[utoipa::path(
    get,
    path = "/recordings",
    responses(
        (status = 200, description = "Recordings"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("api_key" = []))
)]
pub async fn index(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let recordings = RecordingApi::list_for_owner(app_state.db_conn_ref(), user.id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), recordings)))
}

/// GET /recordings/{id}
#[utoipa::path(
    get,
    path = "/recordings/{id}",
    params(("id" = Id, Path, description = "Recording id")),
    responses(
        (status = 200, description = "Recording with media files"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such recording for this caller"),
    ),
    security(("api_key" = []))
)]
pub async fn read(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    let recording = RecordingApi::find_for_owner(app_state.db_conn_ref(), id, user.id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), recording)))
}

/// DELETE /recordings/{id}
#[utoipa::path(
    delete,
    path = "/recordings/{id}",
    params(("id" = Id, Path, description = "Recording id")),
    responses(
        (status = 200, description = "Recording deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such recording for this caller"),
    ),
    security(("api_key" = []))
)]
pub async fn delete(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    RecordingApi::delete_for_owner(app_state.db_conn_ref(), id, user.id).await?;
    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        serde_json::json!({ "deleted": id }),
    )))
}

/// One satisfiable byte range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    end: u64,
}

/// Parses a `Range: bytes=...` header against a known length. Only single
/// ranges are supported; multipart ranges answer as unsatisfiable.
fn parse_range(header: &str, len: u64) -> Option<ByteRange> {
    let spec = header.strip_prefix("bytes=")?;
    if spec.contains(',') || len == 0 {
        return None;
    }

    let (start_str, end_str) = spec.split_once('-')?;
    match (start_str.is_empty(), end_str.is_empty()) {
        // bytes=N-M
        (false, false) => {
            let start: u64 = start_str.parse().ok()?;
            let end: u64 = end_str.parse().ok()?;
            if start > end || start >= len {
                return None;
            }
            Some(ByteRange {
                start,
                end: end.min(len - 1),
            })
        }
        // bytes=N-
        (false, true) => {
            let start: u64 = start_str.parse().ok()?;
            if start >= len {
                return None;
            }
            Some(ByteRange {
                start,
                end: len - 1,
            })
        }
        // bytes=-K (final K bytes)
        (true, false) => {
            let suffix: u64 = end_str.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            Some(ByteRange {
                start: len.saturating_sub(suffix),
                end: len - 1,
            })
        }
        (true, true) => None,
    }
}

fn content_type_for(format: &str) -> &'static str {
    match format {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "webm" => "audio/webm",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// GET /recordings/{id}/media/{file_id}/raw
///
/// Raw media bytes. Without `Range`: 200 and the full file. With a
/// satisfiable `Range`: 206, `Content-Range`, and exactly the requested
/// bytes. Unsatisfiable ranges answer 416. Always inline for playback.
#[utoipa::path(
    get,
    path = "/recordings/{id}/media/{file_id}/raw",
    params(
        ("id" = Id, Path, description = "Recording id"),
        ("file_id" = Id, Path, description = "Media file id"),
    ),
    responses(
        (status = 200, description = "Full media bytes"),
        (status = 206, description = "Requested byte range"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such media for this caller"),
        (status = 416, description = "Unsatisfiable range"),
    ),
    security(("api_key" = []))
)]
pub async fn raw(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((id, file_id)): Path<(Id, Id)>,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let (media, path) = RecordingApi::media_for_raw(
        app_state.db_conn_ref(),
        &app_state.storage,
        id,
        file_id,
        user.id,
    )
    .await?;

    let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
        warn!("Media file {} missing on disk: {e}", media.id);
        Error::Domain(domain::error::Error {
            source: Some(Box::new(e)),
            error_kind: domain::error::DomainErrorKind::Internal(
                domain::error::InternalErrorKind::Entity(domain::error::EntityErrorKind::NotFound),
            ),
        })
    })?;
    let len = metadata.len();
    let content_type = content_type_for(&media.format);

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let Some(range_header) = range_header else {
        let bytes = tokio::fs::read(&path).await?;
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, len)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_DISPOSITION, "inline")
            .body(Body::from(bytes))
            .unwrap());
    };

    let Some(range) = parse_range(range_header, len) else {
        return Ok(Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{len}"))
            .header(header::CONTENT_DISPOSITION, "inline")
            .body(Body::empty())
            .unwrap());
    };

    let chunk_len = range.end - range.start + 1;
    let mut file = tokio::fs::File::open(&path).await?;
    file.seek(std::io::SeekFrom::Start(range.start)).await?;
    let mut bytes = vec![0u8; chunk_len as usize];
    file.read_exact(&mut bytes).await?;

    Ok(Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, chunk_len)
        .header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{len}", range.start, range.end),
        )
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_DISPOSITION, "inline")
        .body(Body::from(bytes))
        .unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_bounded() {
        assert_eq!(
            parse_range("bytes=0-99", 1000),
            Some(ByteRange { start: 0, end: 99 })
        );
        assert_eq!(
            parse_range("bytes=500-999", 1000),
            Some(ByteRange {
                start: 500,
                end: 999
            })
        );
    }

    #[test]
    fn test_parse_range_clamps_the_end_to_the_file() {
        assert_eq!(
            parse_range("bytes=900-5000", 1000),
            Some(ByteRange {
                start: 900,
                end: 999
            })
        );
    }

    #[test]
    fn test_parse_range_open_ended_and_suffix_forms() {
        assert_eq!(
            parse_range("bytes=200-", 1000),
            Some(ByteRange {
                start: 200,
                end: 999
            })
        );
        assert_eq!(
            parse_range("bytes=-100", 1000),
            Some(ByteRange {
                start: 900,
                end: 999
            })
        );
        assert_eq!(
            parse_range("bytes=-5000", 1000),
            Some(ByteRange { start: 0, end: 999 })
        );
    }

    #[test]
    fn test_parse_range_rejects_unsatisfiable_and_malformed() {
        assert_eq!(parse_range("bytes=1000-1200", 1000), None);
        assert_eq!(parse_range("bytes=50-20", 1000), None);
        assert_eq!(parse_range("bytes=-0", 1000), None);
        assert_eq!(parse_range("bytes=", 1000), None);
        assert_eq!(parse_range("bytes=a-b", 1000), None);
        assert_eq!(parse_range("items=0-10", 1000), None);
        assert_eq!(parse_range("bytes=0-10,20-30", 1000), None);
        assert_eq!(parse_range("bytes=0-10", 0), None);
    }

    #[test]
    fn test_range_length_matches_the_contract() {
        // A Range: bytes=N-M response must carry exactly M-N+1 bytes.
        let range = parse_range("bytes=10-19", 100).unwrap();
        assert_eq!(range.end - range.start + 1, 10);
    }

    #[test]
    fn test_content_types_cover_common_formats() {
        assert_eq!(content_type_for("wav"), "audio/wav");
        assert_eq!(content_type_for("webm"), "audio/webm");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod raw_endpoint_tests {
    use super::*;
    use axum::http::header::HeaderValue;
    use clap::Parser;
    use domain::command_bus::CommandBus;
    use domain::lifecycle::LifecycleManager;
    use domain::storage::Storage;
    use domain::{media_files, media_kind, recording_source, recording_status, recordings, users};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use service::config::Config;
    use std::sync::Arc;

    const MEDIA_KEY: &str = "recordings/1/session.wav";
    const MEDIA_BYTES: &[u8] = b"0123456789abcdef";

    fn owner() -> users::Model {
        let now = chrono::Utc::now();
        users::Model {
            id: 1,
            email: "u1@example.com".to_string(),
            display_name: None,
            max_concurrent_bots: 2,
            webhook_url: None,
            webhook_secret: None,
            webhook_last_error: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn recording() -> recordings::Model {
        let now = chrono::Utc::now();
        recordings::Model {
            id: 1,
            meeting_id: 1,
            session_uid: uuid::Uuid::nil(),
            source: recording_source::RecordingSource::Bot,
            status: recording_status::RecordingStatus::Completed,
            error_message: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn media_file() -> media_files::Model {
        media_files::Model {
            id: 1,
            recording_id: 1,
            kind: media_kind::MediaKind::Audio,
            format: "wav".to_string(),
            size_bytes: MEDIA_BYTES.len() as i64,
            duration_seconds: Some(1),
            storage_key: MEDIA_KEY.to_string(),
            created_at: chrono::Utc::now().into(),
        }
    }

    async fn state_with_media(storage_root: &std::path::Path) -> AppState {
        let mut config = Config::parse_from(["vexa_orchestrator"]);
        config.storage_root = storage_root.to_string_lossy().into_owned();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![recording()]])
                .append_query_results([vec![media_file()]])
                .into_connection(),
        );

        let media_path = storage_root.join(MEDIA_KEY);
        tokio::fs::create_dir_all(media_path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&media_path, MEDIA_BYTES).await.unwrap();

        let state_file =
            std::env::temp_dir().join(format!("vexa-raw-test-{}.json", uuid::Uuid::new_v4()));
        let lifecycle = LifecycleManager::new(
            Arc::clone(&db),
            config.clone(),
            Arc::new(domain::ProcessOrchestrator::new(
                "vexa-bot".to_string(),
                state_file,
            )),
            CommandBus::disconnected(),
            events::EventPublisher::new(),
        );
        let storage = Storage::from_config(&config);

        AppState::new(service::AppState::new(config, &db), lifecycle, storage)
    }

    #[tokio::test]
    async fn test_raw_without_range_serves_the_full_file_inline() {
        let dir = tempfile::tempdir().unwrap();
        let app_state = state_with_media(dir.path()).await;

        let response = raw(
            crate::extractors::authenticated_user::AuthenticatedUser(owner()),
            State(app_state),
            Path((1, 1)),
            HeaderMap::new(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION),
            Some(&HeaderValue::from_static("inline"))
        );
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], MEDIA_BYTES);
    }

    #[tokio::test]
    async fn test_raw_with_range_answers_206_and_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let app_state = state_with_media(dir.path()).await;

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=4-7"));

        let response = raw(
            crate::extractors::authenticated_user::AuthenticatedUser(owner()),
            State(app_state),
            Path((1, 1)),
            headers,
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE),
            Some(&HeaderValue::from_static("bytes 4-7/16"))
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION),
            Some(&HeaderValue::from_static("inline"))
        );
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"4567");
    }

    #[tokio::test]
    async fn test_raw_with_unsatisfiable_range_answers_416() {
        let dir = tempfile::tempdir().unwrap();
        let app_state = state_with_media(dir.path()).await;

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=99-120"));

        let response = raw(
            crate::extractors::authenticated_user::AuthenticatedUser(owner()),
            State(app_state),
            Path((1, 1)),
            headers,
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE),
            Some(&HeaderValue::from_static("bytes */16"))
        );
    }
}
