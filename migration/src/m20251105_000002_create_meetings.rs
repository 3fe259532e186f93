use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create platform enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vexa.platform AS ENUM (
                    'google_meet',
                    'teams',
                    'zoom'
                )",
            )
            .await?;

        // Create meeting_status enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vexa.meeting_status AS ENUM (
                    'requested',
                    'joining',
                    'awaiting_admission',
                    'active',
                    'completing',
                    'completed',
                    'failed'
                )",
            )
            .await?;

        // Create completion_reason enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vexa.completion_reason AS ENUM (
                    'stopped',
                    'left_alone'
                )",
            )
            .await?;

        // Create failure_stage enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE vexa.failure_stage AS ENUM (
                    'spawn',
                    'admission',
                    'platform',
                    'signal',
                    'heartbeat_lost',
                    'concurrency'
                )",
            )
            .await?;

        // Create meetings table
        let create_meetings_sql = r#"
            CREATE TABLE IF NOT EXISTS vexa.meetings (
                id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL
                    REFERENCES vexa.users(id),
                platform vexa.platform NOT NULL,
                native_meeting_id VARCHAR(255),
                passcode VARCHAR(255),
                status vexa.meeting_status NOT NULL DEFAULT 'requested',
                worker_ref VARCHAR(255),
                session_uid UUID NOT NULL,
                connection_id UUID,
                worker_token VARCHAR(64),
                config JSONB NOT NULL DEFAULT '{}',
                data JSONB NOT NULL DEFAULT '{}',
                start_time TIMESTAMPTZ,
                end_time TIMESTAMPTZ,
                completion_reason vexa.completion_reason,
                failure_stage vexa.failure_stage,
                last_error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;
        manager
            .get_connection()
            .execute_unprepared(create_meetings_sql)
            .await?;

        // The uniqueness invariant: at most one non-terminal meeting per
        // (owner, platform, native id). Racing dispatches both pass the
        // pre-check inside their own transactions; this index decides.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS meetings_dispatch_key_active_idx
                    ON vexa.meetings(user_id, platform, native_meeting_id)
                    WHERE status NOT IN ('completed', 'failed')",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS meetings_user_status_idx
                    ON vexa.meetings(user_id, status)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS meetings_connection_id_idx
                    ON vexa.meetings(connection_id)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS vexa.meetings")
            .await?;
        for type_name in [
            "vexa.failure_stage",
            "vexa.completion_reason",
            "vexa.meeting_status",
            "vexa.platform",
        ] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TYPE IF EXISTS {type_name}"))
                .await?;
        }
        Ok(())
    }
}
