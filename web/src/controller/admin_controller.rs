//! Controller for the admin plane: user CRUD and API-key issuance.
//!
//! Guarded by the admin bearer token, not by user API keys. The only place a
//! plaintext API key ever appears is the issuance response.

use crate::controller::ApiResponse;
use crate::params::user::{CreateParams, TokenParams, UpdateParams};
use crate::{AppState, Error};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::api_keys;
use domain::user as UserApi;
use domain::users;
use domain::Id;
use log::*;
use serde::Serialize;

/// POST /admin/users
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateParams,
    responses(
        (status = 201, description = "User created", body = users::Model),
        (status = 401, description = "Unauthorized"),
    ),
    security(("admin_token" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    info!("Admin creating user {}", params.email);

    let now = chrono::Utc::now();
    let model = domain::users::Model {
        id: 0,
        email: params.email,
        display_name: params.display_name,
        max_concurrent_bots: params.max_concurrent_bots.unwrap_or(2),
        webhook_url: params.webhook_url,
        webhook_secret: params.webhook_secret,
        webhook_last_error: None,
        created_at: now.into(),
        updated_at: now.into(),
    };

    let user = UserApi::create(app_state.db_conn_ref(), model).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), user)),
    ))
}

/// GET /admin/users
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [users::Model]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("admin_token" = []))
)]
pub async fn index_users(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let users = UserApi::list(app_state.db_conn_ref()).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), users)))
}

/// GET /admin/users/{id}
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = users::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such user"),
    ),
    security(("admin_token" = []))
)]
pub async fn read_user(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    let user = UserApi::find_by_id(app_state.db_conn_ref(), id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), user)))
}

/// PATCH /admin/users/{id}
///
/// Partial update; absent fields keep their value, explicit nulls clear the
/// webhook settings.
#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    params(("id" = Id, Path, description = "User id")),
    request_body = UpdateParams,
    responses(
        (status = 200, description = "User updated", body = users::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such user"),
    ),
    security(("admin_token" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<UpdateParams>,
) -> Result<impl IntoResponse, Error> {
    let db = app_state.db_conn_ref();
    let existing = UserApi::find_by_id(db, id).await?;

    let model = domain::users::Model {
        display_name: params.display_name.or(existing.display_name.clone()),
        max_concurrent_bots: params
            .max_concurrent_bots
            .unwrap_or(existing.max_concurrent_bots),
        webhook_url: match params.webhook_url {
            Some(value) => value,
            None => existing.webhook_url.clone(),
        },
        webhook_secret: match params.webhook_secret {
            Some(value) => value,
            None => existing.webhook_secret.clone(),
        },
        ..existing
    };

    let user = UserApi::update(db, id, model).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), user)))
}

#[derive(Debug, Serialize)]
struct IssuedToken {
    id: Id,
    /// The plaintext API key; shown exactly once
    token: String,
    label: Option<String>,
}

/// POST /admin/users/{id}/tokens
#[utoipa::path(
    post,
    path = "/admin/users/{id}/tokens",
    params(("id" = Id, Path, description = "User id")),
    request_body = TokenParams,
    responses(
        (status = 201, description = "API key issued; plaintext appears only here"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such user"),
    ),
    security(("admin_token" = []))
)]
pub async fn issue_token(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<TokenParams>,
) -> Result<impl IntoResponse, Error> {
    let (key, token) =
        UserApi::issue_api_key(app_state.db_conn_ref(), id, params.label.clone()).await?;

    info!("Admin issued API key {} for user {id}", key.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED.into(),
            IssuedToken {
                id: key.id,
                token,
                label: key.label,
            },
        )),
    ))
}

/// GET /admin/users/{id}/tokens
#[utoipa::path(
    get,
    path = "/admin/users/{id}/tokens",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "The user's API keys (hashes only)", body = [api_keys::Model]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("admin_token" = []))
)]
pub async fn list_tokens(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    let keys = UserApi::list_api_keys(app_state.db_conn_ref(), id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), keys)))
}

/// DELETE /admin/tokens/{id}
#[utoipa::path(
    delete,
    path = "/admin/tokens/{id}",
    params(("id" = Id, Path, description = "API key id")),
    responses(
        (status = 200, description = "Key revoked"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such key"),
    ),
    security(("admin_token" = []))
)]
pub async fn revoke_token(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    UserApi::revoke_api_key(app_state.db_conn_ref(), id).await?;
    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        serde_json::json!({ "revoked": id }),
    )))
}
