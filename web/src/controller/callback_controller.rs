//! Controller for the worker callback plane.
//!
//! Workers authenticate with the per-meeting bearer token issued at dispatch,
//! not with user API keys. Status callbacks feed the lifecycle state machine;
//! the other two endpoints take finalized media and transcript segments.

use crate::controller::ApiResponse;
use crate::{AppState, Error};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use bot_worker::types::callback::StatusCallback;
use domain::recording as RecordingApi;
use domain::transcript::{self as TranscriptApi, SegmentInput};
use log::*;
use serde::Deserialize;
use uuid::Uuid;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn unauthorized() -> Error {
    Error::Domain(domain::error::Error {
        source: None,
        error_kind: domain::error::DomainErrorKind::Internal(
            domain::error::InternalErrorKind::Entity(
                domain::error::EntityErrorKind::Unauthenticated,
            ),
        ),
    })
}

/// PUT /internal/callback/{connection_id}
///
/// Worker status callback. Idempotent per (connection_id, status).
pub async fn status(
    State(app_state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    headers: HeaderMap,
    Json(callback): Json<StatusCallback>,
) -> Result<impl IntoResponse, Error> {
    let token = bearer_token(&headers).ok_or_else(unauthorized)?;

    debug!(
        "Worker callback {} for connection {connection_id}",
        callback.status.as_str()
    );

    app_state
        .lifecycle
        .handle_callback(connection_id, token, callback)
        .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        serde_json::json!({ "status": "ok" }),
    )))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default = "UploadParams::default_format")]
    pub format: String,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
}

impl UploadParams {
    fn default_format() -> String {
        "webm".to_string()
    }
}

/// POST /internal/callback/{connection_id}/recording
///
/// Finalized media upload from the worker. The blob lands under the storage
/// key convention and the recording row completes; upload failures mark the
/// recording failed without touching the meeting.
pub async fn upload_recording(
    State(app_state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    let token = bearer_token(&headers).ok_or_else(unauthorized)?;
    let meeting = app_state
        .lifecycle
        .authorize_worker(connection_id, token)
        .await?;

    info!(
        "Worker uploading {} bytes of {} media for meeting {}",
        body.len(),
        params.format,
        meeting.id
    );

    let media = RecordingApi::finalize_upload(
        app_state.db_conn_ref(),
        &app_state.storage,
        meeting.id,
        meeting.session_uid,
        &params.format,
        params.duration_seconds,
        &body,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), media)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SegmentParams {
    pub start_ms: i32,
    pub end_ms: i32,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    pub segments: Vec<SegmentParams>,
}

/// POST /internal/callback/{connection_id}/transcript
///
/// Transcript segment ingest from the transcription path; duplicate segment
/// keys are silently skipped.
pub async fn ingest_transcript(
    State(app_state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    headers: HeaderMap,
    Json(params): Json<IngestParams>,
) -> Result<impl IntoResponse, Error> {
    let token = bearer_token(&headers).ok_or_else(unauthorized)?;
    let meeting = app_state
        .lifecycle
        .authorize_worker(connection_id, token)
        .await?;

    let segments: Vec<SegmentInput> = params
        .segments
        .into_iter()
        .map(|segment| SegmentInput {
            start_ms: segment.start_ms,
            end_ms: segment.end_ms,
            text: segment.text,
            speaker: segment.speaker,
            language: segment.language,
        })
        .collect();

    let count = segments.len();
    TranscriptApi::ingest(
        app_state.db_conn_ref(),
        meeting.id,
        meeting.session_uid,
        segments,
    )
    .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        serde_json::json!({ "ingested": count }),
    )))
}
