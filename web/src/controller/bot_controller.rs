//! Controller for bot dispatch and control.
//!
//! Dispatch admission, stop, and in-flight reconfigure all route through the
//! lifecycle manager; this layer only validates shapes and scopes lookups to
//! the caller.

use crate::controller::{not_found_error, validation_error, ApiResponse};
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::bot::{DispatchRequest, ReconfigureRequest};
use crate::{AppState, Error};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::lifecycle::DispatchParams;
use domain::meeting as MeetingApi;
use domain::meetings;
use log::*;

/// POST /bots
///
/// Admit a dispatch request and start a worker for it.
#[utoipa::path(
    post,
    path = "/bots",
    request_body = DispatchRequest,
    responses(
        (status = 201, description = "Bot dispatched", body = meetings::Model),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "A bot already exists for this meeting"),
        (status = 422, description = "Native meeting id or config invalid"),
        (status = 429, description = "Concurrent-bot limit reached"),
    ),
    security(("api_key" = []))
)]
pub async fn dispatch(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(body): Json<DispatchRequest>,
) -> Result<impl IntoResponse, Error> {
    let platform = MeetingApi::resolve_platform(&body.platform)?;
    let native_meeting_id = body.native_meeting_id.clone();
    let passcode = body.passcode.clone();
    let config = body.into_config().map_err(|_| validation_error())?;

    info!(
        "User {} dispatching bot to {}/{}",
        user.id, platform, native_meeting_id
    );

    let meeting = app_state
        .lifecycle
        .dispatch(
            &user,
            DispatchParams {
                platform,
                native_meeting_id,
                passcode,
                config,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), meeting)),
    ))
}

/// DELETE /bots/{platform}/{native_meeting_id}
///
/// Ask the bot to leave. 200 when a stop was initiated or the meeting is
/// already terminal; 404 when the caller has no such meeting.
#[utoipa::path(
    delete,
    path = "/bots/{platform}/{native_meeting_id}",
    params(
        ("platform" = String, Path, description = "Conferencing platform"),
        ("native_meeting_id" = String, Path, description = "Platform-native meeting id"),
    ),
    responses(
        (status = 200, description = "Stop initiated or already terminal", body = meetings::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such meeting for this caller"),
    ),
    security(("api_key" = []))
)]
pub async fn stop(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    let platform = MeetingApi::resolve_platform(&platform)?;
    let db = app_state.db_conn_ref();

    if let Some(meeting) =
        MeetingApi::find_active(db, user.id, platform, &native_meeting_id).await?
    {
        let updated = app_state.lifecycle.stop(&meeting).await?;
        return Ok(Json(ApiResponse::new(StatusCode::OK.into(), updated)));
    }

    match MeetingApi::find_latest(db, user.id, platform, &native_meeting_id).await? {
        Some(meeting) if meeting.status.is_terminal() => {
            debug!("Stop of meeting {} is a no-op; already terminal", meeting.id);
            Ok(Json(ApiResponse::new(StatusCode::OK.into(), meeting)))
        }
        _ => Err(not_found_error()),
    }
}

/// PUT /bots/{platform}/{native_meeting_id}/config
///
/// Reconfigure the in-flight bot's language/task. Publishes exactly one
/// reconfigure command on the meeting's channel.
#[utoipa::path(
    put,
    path = "/bots/{platform}/{native_meeting_id}/config",
    params(
        ("platform" = String, Path, description = "Conferencing platform"),
        ("native_meeting_id" = String, Path, description = "Platform-native meeting id"),
    ),
    request_body = ReconfigureRequest,
    responses(
        (status = 200, description = "Reconfigure issued", body = meetings::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No active meeting for this caller"),
        (status = 422, description = "Meeting is not reconfigurable in its current status"),
    ),
    security(("api_key" = []))
)]
pub async fn reconfigure(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
    Json(body): Json<ReconfigureRequest>,
) -> Result<impl IntoResponse, Error> {
    if let Some(task) = body.task.as_deref() {
        if !matches!(task, "transcribe" | "translate") {
            return Err(validation_error());
        }
    }

    let platform = MeetingApi::resolve_platform(&platform)?;
    let meeting =
        MeetingApi::find_active(app_state.db_conn_ref(), user.id, platform, &native_meeting_id)
            .await?
            .ok_or_else(not_found_error)?;

    let updated = app_state
        .lifecycle
        .reconfigure(&meeting, body.language, body.task)
        .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), updated)))
}

/// GET /bots/status
///
/// The caller's non-terminal meetings.
#[utoipa::path(
    get,
    path = "/bots/status",
    responses(
        (status = 200, description = "Active meetings", body = [meetings::Model]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("api_key" = []))
)]
pub async fn status(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let meetings = MeetingApi::list_active(app_state.db_conn_ref(), user.id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), meetings)))
}
