use log::info;
use migration::{Migrator, MigratorTrait};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Seeding database [{}]...", config.database_url());

    let db = Arc::new(service::init_database(&config).await.unwrap());

    Migrator::up(db.as_ref(), None).await.unwrap();

    entity_api::seed_database(db.as_ref()).await;
}
