//! API-key and admin-token authentication middleware.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::*;

pub(crate) const API_KEY_HEADER: &str = "x-api-key";

/// Authenticates the user plane: the `X-API-Key` header must hash to a live
/// key. The owning user lands in request extensions for the
/// `AuthenticatedUser` extractor.
pub async fn require_api_key(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let Some(token) = token else {
        return (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response();
    };

    match domain::user::find_user_by_token(app_state.db_conn_ref(), &token).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            debug!("Rejected request with unknown or revoked API key");
            (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
        }
        Err(e) => {
            warn!("API key lookup failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
        }
    }
}

/// Authenticates the admin plane: `Authorization: Bearer` must equal the
/// configured admin token. With no token configured the plane is disabled.
pub async fn require_admin(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = app_state.config().admin_api_token() else {
        warn!("Admin request rejected: no ADMIN_API_TOKEN configured");
        return (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response();
    };

    let presented = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(expected.as_str()) {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
    }
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::extractors::authenticated_user::AuthenticatedUser;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use clap::Parser;
    use domain::command_bus::CommandBus;
    use domain::lifecycle::LifecycleManager;
    use domain::storage::Storage;
    use domain::{api_keys, users};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_user() -> users::Model {
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

    fn test_api_key() -> api_keys::Model {
        api_keys::Model {
            id: 1,
            user_id: 1,
            token_hash: "irrelevant-for-the-mock".to_string(),
            label: None,
            created_at: chrono::Utc::now().into(),
            revoked_at: None,
        }
    }

    fn test_state(db: DatabaseConnection, admin_token: Option<&str>) -> AppState {
        let config = Config::parse_from(["vexa_orchestrator"])
            .set_admin_api_token(admin_token.map(str::to_owned));
        let db = Arc::new(db);
        let app = service::AppState::new(config.clone(), &db);

        let state_file =
            std::env::temp_dir().join(format!("vexa-auth-test-{}.json", uuid::Uuid::new_v4()));
        let orchestrator = Arc::new(domain::ProcessOrchestrator::new(
            "vexa-bot".to_string(),
            state_file,
        ));
        let lifecycle = LifecycleManager::new(
            Arc::clone(&db),
            config.clone(),
            orchestrator,
            CommandBus::disconnected(),
            events::EventPublisher::new(),
        );
        let storage = Storage::from_config(&config);

        AppState::new(app, lifecycle, storage)
    }

    async fn whoami(AuthenticatedUser(user): AuthenticatedUser) -> String {
        user.email
    }

    fn user_plane(app_state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(
                app_state.clone(),
                require_api_key,
            ))
            .with_state(app_state)
    }

    #[tokio::test]
    async fn test_require_api_key_rejects_a_missing_header() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = user_plane(test_state(db, None));

        let request = Request::builder()
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_api_key_rejects_an_unknown_key() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<(api_keys::Model, Option<users::Model>)>::new()])
            .into_connection();
        let app = user_plane(test_state(db, None));

        let request = Request::builder()
            .uri("/whoami")
            .header(API_KEY_HEADER, "vexa_not_a_real_key")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_api_key_plants_the_user_for_extractors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![(test_api_key(), Some(test_user()))]])
            .into_connection();
        let app = user_plane(test_state(db, None));

        let request = Request::builder()
            .uri("/whoami")
            .header(API_KEY_HEADER, "vexa_valid_key")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"u1@example.com");
    }

    fn admin_plane(app_state: AppState) -> Router {
        Router::new()
            .route("/admin/ping", get(|| async { "pong" }))
            .route_layer(axum::middleware::from_fn_with_state(
                app_state.clone(),
                require_admin,
            ))
            .with_state(app_state)
    }

    #[tokio::test]
    async fn test_require_admin_is_disabled_without_a_configured_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = admin_plane(test_state(db, None));

        let request = Request::builder()
            .uri("/admin/ping")
            .header("authorization", "Bearer anything")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_require_admin_rejects_a_wrong_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = admin_plane(test_state(db, Some("super-secret")));

        let request = Request::builder()
            .uri("/admin/ping")
            .header("authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_admin_accepts_the_configured_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = admin_plane(test_state(db, Some("super-secret")));

        let request = Request::builder()
            .uri("/admin/ping")
            .header("authorization", "Bearer super-secret")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
