pub use sea_orm_migration::prelude::*;

mod m20251105_000001_create_schema_and_users;
mod m20251105_000002_create_meetings;
mod m20251106_000001_create_recordings_and_transcripts;
mod m20260114_000001_add_anonymized_key_digest;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251105_000001_create_schema_and_users::Migration),
            Box::new(m20251105_000002_create_meetings::Migration),
            Box::new(m20251106_000001_create_recordings_and_transcripts::Migration),
            Box::new(m20260114_000001_add_anonymized_key_digest::Migration),
        ]
    }
}
