pub use self::error::{Error, Result};
use domain::lifecycle::LifecycleManager;
use domain::storage::Storage;
use log::*;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod controller;
mod error;
mod extractors;
mod middleware;
mod params;
mod router;

/// Web-layer state: the infrastructure state plus the long-lived domain
/// services controllers call into. Clone is cheap; everything is Arc-backed.
#[derive(Clone)]
pub struct AppState {
    pub app: service::AppState,
    pub lifecycle: Arc<LifecycleManager>,
    pub storage: Storage,
}

impl AppState {
    pub fn new(
        app: service::AppState,
        lifecycle: Arc<LifecycleManager>,
        storage: Storage,
    ) -> Self {
        Self {
            app,
            lifecycle,
            storage,
        }
    }

    pub fn db_conn_ref(&self) -> &sea_orm::DatabaseConnection {
        self.app.db_conn_ref()
    }

    pub fn config(&self) -> &service::config::Config {
        &self.app.config
    }
}

pub async fn init_server(app_state: AppState) -> Result<()> {
    let host = app_state.app.config.interface.as_ref().unwrap();
    let port = app_state.app.config.port;
    let server_url = format!("{host}:{port}");

    let listen_addr = SocketAddr::from_str(&server_url).unwrap();

    let origins: Vec<axum::http::HeaderValue> = app_state
        .app
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    info!("Server starting... listening for connections on http://{host}:{port}");

    let listener = TcpListener::bind(listen_addr).await.unwrap();
    axum::serve(listener, router::define_routes(app_state).layer(cors))
        .await
        .unwrap();

    Ok(())
}
