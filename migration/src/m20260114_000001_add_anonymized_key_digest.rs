use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Lets a repeated DELETE resolve an already-anonymized meeting whose
        // native id is gone.
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE vexa.meetings
                    ADD COLUMN IF NOT EXISTS anonymized_key_digest VARCHAR(64)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS meetings_anonymized_key_digest_idx
                    ON vexa.meetings(anonymized_key_digest)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE vexa.meetings DROP COLUMN IF EXISTS anonymized_key_digest",
            )
            .await?;
        Ok(())
    }
}
