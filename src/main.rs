use domain::command_bus::CommandBus;
use domain::lifecycle::LifecycleManager;
use domain::storage::Storage;
use domain::webhook::{WebhookDispatcher, WebhookHandler, WebhookPolicy};
use events::EventPublisher;
use log::*;
use migration::{Migrator, MigratorTrait};
use service::config::{Config, WorkerSubstrate};
use service::logging::Logger;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!(
        "Starting Vexa orchestrator ({} substrate, {} storage)...",
        config.orchestrator, config.storage_backend
    );

    let db = Arc::new(
        service::init_database(&config)
            .await
            .expect("Failed to connect to the database"),
    );

    Migrator::up(db.as_ref(), None)
        .await
        .expect("Failed to run database migrations");

    if config.skip_transcription_check {
        warn!("SKIP_TRANSCRIPTION_CHECK set; not probing the transcription sink");
    } else if let Err(e) = domain::transcription::probe(&config).await {
        error!("Transcription sink probe failed: {e}");
        std::process::exit(1);
    }

    let bus = CommandBus::connect(config.redis_url())
        .await
        .expect("Failed to connect to the command bus");

    let orchestrator: Arc<dyn domain::Orchestrator> = match config.orchestrator {
        WorkerSubstrate::Container => Arc::new(
            domain::DockerOrchestrator::new(config.bot_image.clone())
                .expect("Failed to connect to the container runtime"),
        ),
        WorkerSubstrate::Process => Arc::new(domain::ProcessOrchestrator::new(
            config.bot_command.clone(),
            PathBuf::from(&config.worker_state_file),
        )),
    };

    let webhook_policy = WebhookPolicy {
        attempts: config.webhook_attempts,
        base_delay: Duration::from_secs(1),
        request_timeout: Duration::from_secs(10),
        allow_private_destinations: config.webhook_allow_private_ips,
    };
    let dispatcher = WebhookDispatcher::spawn(Arc::clone(&db), webhook_policy);
    let publisher = EventPublisher::new()
        .with_handler(Arc::new(WebhookHandler::new(Arc::clone(&db), dispatcher)));

    let lifecycle = LifecycleManager::new(
        Arc::clone(&db),
        config.clone(),
        orchestrator,
        bus,
        publisher,
    );

    if let Err(e) = lifecycle.reconcile().await {
        warn!("Startup reconciliation failed: {e}");
    }

    let _background_tasks = domain::tasks::spawn_background_tasks(Arc::clone(&lifecycle));

    let storage = Storage::from_config(&config);
    let app_state = web::AppState::new(
        service::AppState::new(config, &db),
        lifecycle,
        storage,
    );

    web::init_server(app_state).await.unwrap();
}
