use chrono::Utc;
use log::info;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub use entity::{
    api_keys, completion_reason, failure_stage, media_files, media_kind, meeting_status, meetings,
    platform, recording_source, recording_status, recordings, transcript_segments, users, Id,
};

pub mod api_key;
pub mod error;
pub mod media_file;
pub mod meeting;
pub mod recording;
pub mod transcript_segment;
pub mod user;

/// Seeds a fresh database with an admin user and a working API key so a new
/// deployment can dispatch its first bot without the admin plane.
pub async fn seed_database(db: &DatabaseConnection) {
    let now = Utc::now();

    let admin_user = users::ActiveModel {
        email: Set("admin@vexa.local".to_owned()),
        display_name: Set(Some("Vexa Admin".to_owned())),
        max_concurrent_bots: Set(2),
        webhook_url: Set(None),
        webhook_secret: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    let (_key, token) = api_key::create(
        db,
        admin_user.id.clone().unwrap(),
        Some("seeded".to_owned()),
    )
    .await
    .unwrap();

    info!("Seeded admin user admin@vexa.local with API key: {token}");
}
