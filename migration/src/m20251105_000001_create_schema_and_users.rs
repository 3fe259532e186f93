use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the orchestrator's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS vexa;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO vexa, public;")
            .await?;

        let create_users_sql = r#"
            CREATE TABLE IF NOT EXISTS vexa.users (
                id SERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                display_name VARCHAR(255),
                max_concurrent_bots INTEGER NOT NULL DEFAULT 2,
                webhook_url TEXT,
                webhook_secret TEXT,
                webhook_last_error TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;
        manager
            .get_connection()
            .execute_unprepared(create_users_sql)
            .await?;

        let create_api_keys_sql = r#"
            CREATE TABLE IF NOT EXISTS vexa.api_keys (
                id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL
                    REFERENCES vexa.users(id) ON DELETE CASCADE,
                token_hash VARCHAR(64) NOT NULL UNIQUE,
                label VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                revoked_at TIMESTAMPTZ
            )
        "#;
        manager
            .get_connection()
            .execute_unprepared(create_api_keys_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS api_keys_user_id_idx ON vexa.api_keys(user_id)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS vexa.api_keys")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS vexa.users")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS vexa CASCADE;")
            .await?;
        Ok(())
    }
}
