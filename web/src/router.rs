use crate::{controller::health_check_controller, middleware::auth, params, AppState};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::controller::{
    admin_controller, bot_controller, callback_controller, meeting_controller,
    recording_controller, transcript_controller,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Vexa Bot Orchestrator API"
        ),
        paths(
            bot_controller::dispatch,
            bot_controller::stop,
            bot_controller::reconfigure,
            bot_controller::status,
            meeting_controller::index,
            meeting_controller::update,
            meeting_controller::delete,
            transcript_controller::read,
            transcript_controller::share,
            transcript_controller::shared,
            recording_controller::index,
            recording_controller::read,
            recording_controller::delete,
            recording_controller::raw,
            admin_controller::create_user,
            admin_controller::index_users,
            admin_controller::read_user,
            admin_controller::update_user,
            admin_controller::issue_token,
            admin_controller::list_tokens,
            admin_controller::revoke_token,
        ),
        components(
            schemas(
                domain::meetings::Model,
                domain::users::Model,
                domain::api_keys::Model,
                domain::recordings::Model,
                domain::media_files::Model,
                domain::transcript_segments::Model,
                params::bot::DispatchRequest,
                params::bot::ReconfigureRequest,
                params::user::CreateParams,
                params::user::UpdateParams,
                params::user::TokenParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "vexa", description = "Meeting bot orchestration API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// The user plane authenticates with a per-user API key header; the admin
// plane with a bearer token.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    auth::API_KEY_HEADER,
                    "Per-user API key issued via the admin plane",
                ))),
            );
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(bot_routes(app_state.clone()))
        .merge(meeting_routes(app_state.clone()))
        .merge(transcript_routes(app_state.clone()))
        .merge(recording_routes(app_state.clone()))
        .merge(shared_transcript_routes(app_state.clone()))
        .merge(callback_routes(app_state.clone()))
        .merge(admin_routes(app_state.clone()))
        .merge(health_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn bot_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/bots", post(bot_controller::dispatch))
        .route("/bots/status", get(bot_controller::status))
        .route(
            "/bots/:platform/:native_meeting_id",
            delete(bot_controller::stop),
        )
        .route(
            "/bots/:platform/:native_meeting_id/config",
            put(bot_controller::reconfigure),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            auth::require_api_key,
        ))
        .with_state(app_state)
}

fn meeting_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/meetings", get(meeting_controller::index))
        .route(
            "/meetings/:platform/:native_meeting_id",
            patch(meeting_controller::update),
        )
        .route(
            "/meetings/:platform/:native_meeting_id",
            delete(meeting_controller::delete),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            auth::require_api_key,
        ))
        .with_state(app_state)
}

fn transcript_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/transcripts/:platform/:native_meeting_id",
            get(transcript_controller::read),
        )
        .route(
            "/transcripts/:platform/:native_meeting_id/share",
            post(transcript_controller::share),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            auth::require_api_key,
        ))
        .with_state(app_state)
}

// Share links are the one unauthenticated read surface.
fn shared_transcript_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/transcripts/shared/:token",
            get(transcript_controller::shared),
        )
        .with_state(app_state)
}

fn recording_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/recordings", get(recording_controller::index))
        .route("/recordings/:id", get(recording_controller::read))
        .route("/recordings/:id", delete(recording_controller::delete))
        .route(
            "/recordings/:id/media/:file_id/raw",
            get(recording_controller::raw),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            auth::require_api_key,
        ))
        .with_state(app_state)
}

// Workers authenticate with their per-meeting token, not an API key.
fn callback_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/internal/callback/:connection_id",
            put(callback_controller::status),
        )
        .route(
            "/internal/callback/:connection_id/recording",
            post(callback_controller::upload_recording),
        )
        .route(
            "/internal/callback/:connection_id/transcript",
            post(callback_controller::ingest_transcript),
        )
        .with_state(app_state)
}

fn admin_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/admin/users", post(admin_controller::create_user))
        .route("/admin/users", get(admin_controller::index_users))
        .route("/admin/users/:id", get(admin_controller::read_user))
        .route("/admin/users/:id", patch(admin_controller::update_user))
        .route(
            "/admin/users/:id/tokens",
            post(admin_controller::issue_token),
        )
        .route(
            "/admin/users/:id/tokens",
            get(admin_controller::list_tokens),
        )
        .route(
            "/admin/tokens/:id",
            delete(admin_controller::revoke_token),
        )
        .route_layer(from_fn_with_state(app_state.clone(), auth::require_admin))
        .with_state(app_state)
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}
