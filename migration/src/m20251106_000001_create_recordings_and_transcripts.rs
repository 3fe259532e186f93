use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create recording_source enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vexa.recording_source AS ENUM (
                    'bot',
                    'external'
                )",
            )
            .await?;

        // Create recording_status enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vexa.recording_status AS ENUM (
                    'recording',
                    'completed',
                    'failed',
                    'deleted'
                )",
            )
            .await?;

        // Create media_kind enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vexa.media_kind AS ENUM (
                    'audio',
                    'video'
                )",
            )
            .await?;

        // Create recordings table
        let create_recordings_sql = r#"
            CREATE TABLE IF NOT EXISTS vexa.recordings (
                id SERIAL PRIMARY KEY,
                meeting_id INTEGER NOT NULL
                    REFERENCES vexa.meetings(id) ON DELETE CASCADE,
                session_uid UUID NOT NULL,
                source vexa.recording_source NOT NULL DEFAULT 'bot',
                status vexa.recording_status NOT NULL DEFAULT 'recording',
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;
        manager
            .get_connection()
            .execute_unprepared(create_recordings_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS recordings_meeting_id_idx
                    ON vexa.recordings(meeting_id)",
            )
            .await?;

        // Create media_files table
        let create_media_files_sql = r#"
            CREATE TABLE IF NOT EXISTS vexa.media_files (
                id SERIAL PRIMARY KEY,
                recording_id INTEGER NOT NULL
                    REFERENCES vexa.recordings(id) ON DELETE CASCADE,
                kind vexa.media_kind NOT NULL DEFAULT 'audio',
                format VARCHAR(16) NOT NULL,
                size_bytes BIGINT NOT NULL,
                duration_seconds INTEGER,
                storage_key TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;
        manager
            .get_connection()
            .execute_unprepared(create_media_files_sql)
            .await?;

        // Create transcript_segments table; the segment key makes re-delivery
        // of the same segment a no-op
        let create_segments_sql = r#"
            CREATE TABLE IF NOT EXISTS vexa.transcript_segments (
                id SERIAL PRIMARY KEY,
                meeting_id INTEGER NOT NULL
                    REFERENCES vexa.meetings(id) ON DELETE CASCADE,
                session_uid UUID NOT NULL,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL,
                text TEXT NOT NULL,
                speaker VARCHAR(255),
                language VARCHAR(16),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT transcript_segments_key UNIQUE (meeting_id, session_uid, start_ms)
            )
        "#;
        manager
            .get_connection()
            .execute_unprepared(create_segments_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "vexa.transcript_segments",
            "vexa.media_files",
            "vexa.recordings",
        ] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TABLE IF EXISTS {table}"))
                .await?;
        }
        for type_name in [
            "vexa.media_kind",
            "vexa.recording_status",
            "vexa.recording_source",
        ] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TYPE IF EXISTS {type_name}"))
                .await?;
        }
        Ok(())
    }
}
