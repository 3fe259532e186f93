//! Controller for meeting records: listing, metadata edits, and
//! anonymizing deletion.

use crate::controller::{validation_error, ApiResponse};
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::{AppState, Error};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::meeting as MeetingApi;
use domain::meetings;
use log::*;

/// GET /meetings
///
/// Every meeting the caller owns, newest first. Anonymized rows appear with a
/// null native id and an empty data bag.
#[utoipa::path(
    get,
    path = "/meetings",
    responses(
        (status = 200, description = "The caller's meetings", body = [meetings::Model]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("api_key" = []))
)]
pub async fn index(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let meetings = MeetingApi::list(app_state.db_conn_ref(), user.id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), meetings)))
}

/// PATCH /meetings/{platform}/{native_meeting_id}
///
/// Merge the body into the meeting's data bag; explicit nulls remove keys.
#[utoipa::path(
    patch,
    path = "/meetings/{platform}/{native_meeting_id}",
    params(
        ("platform" = String, Path, description = "Conferencing platform"),
        ("native_meeting_id" = String, Path, description = "Platform-native meeting id"),
    ),
    responses(
        (status = 200, description = "Data bag updated", body = meetings::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such meeting for this caller"),
        (status = 422, description = "Body is not a JSON object"),
    ),
    security(("api_key" = []))
)]
pub async fn update(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
    Json(patch): Json<serde_json::Value>,
) -> Result<impl IntoResponse, Error> {
    if !patch.is_object() {
        return Err(validation_error());
    }

    let platform = MeetingApi::resolve_platform(&platform)?;
    let meeting = MeetingApi::patch_data(
        app_state.db_conn_ref(),
        user.id,
        platform,
        &native_meeting_id,
        patch,
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), meeting)))
}

/// DELETE /meetings/{platform}/{native_meeting_id}
///
/// Anonymize the meeting: null the native id, scrub the data bag, drop
/// transcripts and recording artifacts. Idempotent; repeating the call
/// answers 200 with the already-scrubbed row.
#[utoipa::path(
    delete,
    path = "/meetings/{platform}/{native_meeting_id}",
    params(
        ("platform" = String, Path, description = "Conferencing platform"),
        ("native_meeting_id" = String, Path, description = "Platform-native meeting id"),
    ),
    responses(
        (status = 200, description = "Meeting anonymized", body = meetings::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such meeting for this caller"),
        (status = 409, description = "Meeting is still running; stop it first"),
    ),
    security(("api_key" = []))
)]
pub async fn delete(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    let platform = MeetingApi::resolve_platform(&platform)?;

    info!(
        "User {} deleting meeting {}/{}",
        user.id, platform, native_meeting_id
    );

    let meeting = MeetingApi::delete(
        app_state.db_conn_ref(),
        user.id,
        platform,
        &native_meeting_id,
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), meeting)))
}
