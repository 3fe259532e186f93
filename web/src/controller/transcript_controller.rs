//! Controller for transcript reads and share links.

use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::{AppState, Error};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::meeting as MeetingApi;
use domain::transcript as TranscriptApi;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TranscriptResponse {
    meeting: domain::meetings::Model,
    segments: Vec<domain::transcript_segments::Model>,
}

#[derive(Debug, Serialize)]
struct ShareResponse {
    token: String,
    path: String,
}

/// GET /transcripts/{platform}/{native_meeting_id}
///
/// The meeting's transcript, ordered by start offset. Answers 404 once the
/// meeting was anonymized.
#[utoipa::path(
    get,
    path = "/transcripts/{platform}/{native_meeting_id}",
    params(
        ("platform" = String, Path, description = "Conferencing platform"),
        ("native_meeting_id" = String, Path, description = "Platform-native meeting id"),
    ),
    responses(
        (status = 200, description = "Transcript segments"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such meeting for this caller"),
    ),
    security(("api_key" = []))
)]
pub async fn read(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    let platform = MeetingApi::resolve_platform(&platform)?;
    let (meeting, segments) = TranscriptApi::list(
        app_state.db_conn_ref(),
        user.id,
        platform,
        &native_meeting_id,
    )
    .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        TranscriptResponse { meeting, segments },
    )))
}

/// POST /transcripts/{platform}/{native_meeting_id}/share
///
/// Issue (or return) a share token opening this transcript to
/// unauthenticated readers. Anonymizing the meeting revokes it.
#[utoipa::path(
    post,
    path = "/transcripts/{platform}/{native_meeting_id}/share",
    params(
        ("platform" = String, Path, description = "Conferencing platform"),
        ("native_meeting_id" = String, Path, description = "Platform-native meeting id"),
    ),
    responses(
        (status = 200, description = "Share token"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such meeting for this caller"),
    ),
    security(("api_key" = []))
)]
pub async fn share(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    let platform = MeetingApi::resolve_platform(&platform)?;
    let token = TranscriptApi::share(
        app_state.db_conn_ref(),
        user.id,
        platform,
        &native_meeting_id,
    )
    .await?;

    let path = format!("/transcripts/shared/{token}");
    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        ShareResponse { token, path },
    )))
}

/// GET /transcripts/shared/{token}
///
/// Public read of a shared transcript.
#[utoipa::path(
    get,
    path = "/transcripts/shared/{token}",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Transcript segments"),
        (status = 404, description = "Unknown or revoked token"),
    )
)]
pub async fn shared(
    State(app_state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let (meeting, segments) =
        TranscriptApi::find_shared(app_state.db_conn_ref(), &token).await?;
    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        TranscriptResponse { meeting, segments },
    )))
}
