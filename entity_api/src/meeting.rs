//! Registry operations for the meetings table.
//!
//! This module is the single writer of meeting rows. The two invariants that
//! make the lifecycle state machine safe under racing callbacks are enforced
//! here and nowhere else:
//!
//! * at most one non-terminal meeting per (owner, platform, native id),
//!   backed by a partial unique index so a dispatch race loses at insert;
//! * every status change goes through [`transition`], a conditional update
//!   that only succeeds while the row's current status is inside the caller's
//!   from-set.

use super::error::{EntityApiErrorKind, Error};
use chrono::{DateTime, FixedOffset};
use entity::completion_reason::CompletionReason;
use entity::failure_stage::FailureStage;
use entity::media_files;
use entity::meeting_status::MeetingStatus;
use entity::meetings::{self, ActiveModel, Entity, MeetingConfig, Model};
use entity::platform::Platform;
use entity::recording_status::RecordingStatus;
use entity::recordings;
use entity::transcript_segments;
use entity::users;
use entity::Id;
use log::*;
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::prelude::*, ActiveValue::Set, DatabaseConnection, PaginatorTrait, QueryOrder,
    TransactionTrait, TryIntoModel,
};
use uuid::Uuid;

/// Fields a transition may patch together with the status column, inside the
/// same conditional update.
#[derive(Debug, Default)]
pub struct TransitionPatch {
    pub start_time: Option<DateTime<FixedOffset>>,
    pub end_time: Option<DateTime<FixedOffset>>,
    pub completion_reason: Option<CompletionReason>,
    pub failure_stage: Option<FailureStage>,
    pub last_error_message: Option<String>,
    /// Null out worker_ref as part of the same write
    pub clear_worker_ref: bool,
}

impl TransitionPatch {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Admits a dispatch request: validates the native id format, checks the
/// uniqueness and concurrency invariants, and inserts the row in `requested`.
///
/// The pre-checks give callers typed errors; the partial unique index is what
/// actually decides a dispatch race, surfacing as `UniquenessConflict` from
/// the insert.
pub async fn create_request(
    db: &DatabaseConnection,
    owner: &users::Model,
    platform: Platform,
    native_meeting_id: &str,
    passcode: Option<String>,
    config: MeetingConfig,
) -> Result<Model, Error> {
    if !platform.validate_native_id(native_meeting_id) {
        debug!("Rejected native meeting id {native_meeting_id:?} for platform {platform}");
        return Err(Error::validation());
    }
    if let Some(ref code) = passcode {
        if !platform.validate_passcode(code) {
            debug!("Rejected passcode for platform {platform}");
            return Err(Error::validation());
        }
    }

    let txn = db.begin().await?;

    let duplicates = Entity::find()
        .filter(meetings::Column::UserId.eq(owner.id))
        .filter(meetings::Column::Platform.eq(platform))
        .filter(meetings::Column::NativeMeetingId.eq(native_meeting_id))
        .filter(meetings::Column::Status.is_in(MeetingStatus::non_terminal()))
        .count(&txn)
        .await?;
    if duplicates > 0 {
        return Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::UniquenessConflict,
        });
    }

    let active = Entity::find()
        .filter(meetings::Column::UserId.eq(owner.id))
        .filter(meetings::Column::Status.is_in(MeetingStatus::non_terminal()))
        .count(&txn)
        .await?;
    if active >= owner.max_concurrent_bots.max(0) as u64 {
        debug!(
            "User {} is at the concurrency ceiling ({} active, max {})",
            owner.id, active, owner.max_concurrent_bots
        );
        return Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::ConcurrencyLimit,
        });
    }

    let now = chrono::Utc::now();
    let meeting = ActiveModel {
        user_id: Set(owner.id),
        platform: Set(platform),
        native_meeting_id: Set(Some(native_meeting_id.to_string())),
        passcode: Set(passcode),
        status: Set(MeetingStatus::Requested),
        session_uid: Set(Uuid::new_v4()),
        config: Set(config),
        data: Set(serde_json::json!({})),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(&txn)
    .await?
    .try_into_model()?;

    txn.commit().await?;

    Ok(meeting)
}

/// Conditional status update: succeeds only while the row's current status is
/// in `from_set`. Racing callbacks serialize here; the loser observes
/// `InvalidTransition` and must treat it as "someone else got there first".
pub async fn transition(
    db: &DatabaseConnection,
    meeting_id: Id,
    from_set: &[MeetingStatus],
    to: MeetingStatus,
    patch: TransitionPatch,
) -> Result<Model, Error> {
    let now = chrono::Utc::now();

    let mut update = Entity::update_many()
        .col_expr(meetings::Column::Status, Expr::value(to))
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(now)),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .filter(meetings::Column::Status.is_in(from_set.iter().copied()));

    if let Some(start_time) = patch.start_time {
        update = update.col_expr(meetings::Column::StartTime, Expr::value(Some(start_time)));
    }
    if let Some(end_time) = patch.end_time {
        update = update.col_expr(meetings::Column::EndTime, Expr::value(Some(end_time)));
    }
    if let Some(reason) = patch.completion_reason {
        update = update.col_expr(
            meetings::Column::CompletionReason,
            Expr::value(Some(reason)),
        );
    }
    if let Some(stage) = patch.failure_stage {
        update = update.col_expr(meetings::Column::FailureStage, Expr::value(Some(stage)));
    }
    if let Some(message) = patch.last_error_message {
        update = update.col_expr(
            meetings::Column::LastErrorMessage,
            Expr::value(Some(message)),
        );
    }
    if patch.clear_worker_ref {
        update = update.col_expr(
            meetings::Column::WorkerRef,
            Expr::value(Option::<String>::None),
        );
    }

    let result = update.exec(db).await?;

    if result.rows_affected == 0 {
        // Either the row is gone or it is outside the from-set.
        return match Entity::find_by_id(meeting_id).one(db).await? {
            Some(current) => {
                debug!(
                    "Transition of meeting {} to {} refused: current status is {}",
                    meeting_id, to, current.status
                );
                Err(Error {
                    source: None,
                    error_kind: EntityApiErrorKind::InvalidTransition,
                })
            }
            None => Err(Error::not_found()),
        };
    }

    find_by_id(db, meeting_id).await
}

/// Stores the callback identity handed to a worker before it is started, so
/// callbacks arriving mid-spawn can already be resolved. Idempotent.
pub async fn assign_connection(
    db: &DatabaseConnection,
    meeting_id: Id,
    connection_id: Uuid,
    worker_token: &str,
) -> Result<(), Error> {
    Entity::update_many()
        .col_expr(
            meetings::Column::ConnectionId,
            Expr::value(Some(connection_id)),
        )
        .col_expr(
            meetings::Column::WorkerToken,
            Expr::value(Some(worker_token.to_string())),
        )
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Attaches a started worker to its meeting row. Idempotent.
pub async fn attach_worker(
    db: &DatabaseConnection,
    meeting_id: Id,
    worker_ref: &str,
) -> Result<(), Error> {
    Entity::update_many()
        .col_expr(
            meetings::Column::WorkerRef,
            Expr::value(Some(worker_ref.to_string())),
        )
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Clears the worker handle. Idempotent.
pub async fn detach_worker(db: &DatabaseConnection, meeting_id: Id) -> Result<(), Error> {
    Entity::update_many()
        .col_expr(
            meetings::Column::WorkerRef,
            Expr::value(Option::<String>::None),
        )
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .exec(db)
        .await?;
    Ok(())
}

/// One-way digest of a dispatch key. Anonymization records it so a repeated
/// delete can still resolve the row after the native id itself is gone.
pub fn dispatch_key_digest(owner_id: Id, platform: Platform, native_meeting_id: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(
        format!("{owner_id}|{platform}|{native_meeting_id}").as_bytes(),
    ))
}

/// Anonymizes a meeting inside one transaction: nulls the native id, empties
/// the data bag, deletes transcript rows, deletes media rows, and marks
/// recordings deleted. Repeated calls are no-ops.
pub async fn anonymize(db: &DatabaseConnection, meeting_id: Id) -> Result<Model, Error> {
    let txn = db.begin().await?;

    let meeting = Entity::find_by_id(meeting_id)
        .one(&txn)
        .await?
        .ok_or_else(Error::not_found)?;

    let digest = meeting
        .anonymized_key_digest
        .clone()
        .or_else(|| {
            meeting
                .native_meeting_id
                .as_deref()
                .map(|native| dispatch_key_digest(meeting.user_id, meeting.platform, native))
        });

    transcript_segments::Entity::delete_many()
        .filter(transcript_segments::Column::MeetingId.eq(meeting_id))
        .exec(&txn)
        .await?;

    let recording_ids: Vec<Id> = recordings::Entity::find()
        .filter(recordings::Column::MeetingId.eq(meeting_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|recording| recording.id)
        .collect();

    if !recording_ids.is_empty() {
        media_files::Entity::delete_many()
            .filter(media_files::Column::RecordingId.is_in(recording_ids.clone()))
            .exec(&txn)
            .await?;

        recordings::Entity::update_many()
            .col_expr(
                recordings::Column::Status,
                Expr::value(RecordingStatus::Deleted),
            )
            .col_expr(
                recordings::Column::UpdatedAt,
                Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
            )
            .filter(recordings::Column::Id.is_in(recording_ids))
            .exec(&txn)
            .await?;
    }

    Entity::update_many()
        .col_expr(
            meetings::Column::NativeMeetingId,
            Expr::value(Option::<String>::None),
        )
        .col_expr(
            meetings::Column::Passcode,
            Expr::value(Option::<String>::None),
        )
        .col_expr(meetings::Column::Data, Expr::value(serde_json::json!({})))
        .col_expr(
            meetings::Column::AnonymizedKeyDigest,
            Expr::value(digest.clone()),
        )
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    info!("Anonymized meeting {meeting_id}");

    Ok(Model {
        native_meeting_id: None,
        passcode: None,
        data: serde_json::json!({}),
        anonymized_key_digest: digest,
        ..meeting
    })
}

/// Meetings whose data bag carries the given share token. The token lives in
/// the bag on purpose: anonymization scrubs the bag and revokes the share.
pub async fn list_with_share_token(
    db: &DatabaseConnection,
    key: &str,
    token: &str,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Expr::cust_with_values(
            "data ->> ? = ?",
            [
                sea_orm::Value::from(key.to_string()),
                sea_orm::Value::from(token.to_string()),
            ],
        ))
        .all(db)
        .await?)
}

/// Resolves a previously-anonymized meeting by its dispatch-key digest.
pub async fn find_anonymized_by_digest(
    db: &DatabaseConnection,
    digest: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::AnonymizedKeyDigest.eq(digest))
        .order_by_desc(meetings::Column::UpdatedAt)
        .one(db)
        .await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

/// The caller-scoped lookup behind /bots/{platform}/{native_id}: the single
/// non-terminal meeting for the dispatch key, if any.
pub async fn find_active_by_owner_platform_native(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::UserId.eq(owner_id))
        .filter(meetings::Column::Platform.eq(platform))
        .filter(meetings::Column::NativeMeetingId.eq(native_meeting_id))
        .filter(meetings::Column::Status.is_in(MeetingStatus::non_terminal()))
        .one(db)
        .await?)
}

/// Any-status lookup for the meetings/transcripts/recordings read paths.
/// Anonymized rows have a null native id and never match.
pub async fn find_latest_by_owner_platform_native(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::UserId.eq(owner_id))
        .filter(meetings::Column::Platform.eq(platform))
        .filter(meetings::Column::NativeMeetingId.eq(native_meeting_id))
        .order_by_desc(meetings::Column::CreatedAt)
        .one(db)
        .await?)
}

pub async fn find_by_connection_id(
    db: &DatabaseConnection,
    connection_id: Uuid,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::ConnectionId.eq(connection_id))
        .one(db)
        .await?)
}

pub async fn list_by_owner(db: &DatabaseConnection, owner_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::UserId.eq(owner_id))
        .order_by_desc(meetings::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list_active_by_owner(
    db: &DatabaseConnection,
    owner_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::UserId.eq(owner_id))
        .filter(meetings::Column::Status.is_in(MeetingStatus::non_terminal()))
        .order_by_desc(meetings::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn count_active_by_owner(db: &DatabaseConnection, owner_id: Id) -> Result<u64, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::UserId.eq(owner_id))
        .filter(meetings::Column::Status.is_in(MeetingStatus::non_terminal()))
        .count(db)
        .await?)
}

/// All meetings for a dispatch key regardless of owner; reconciliation uses
/// this when a worker reappears that the registry no longer tracks.
pub async fn list_by_platform_native(
    db: &DatabaseConnection,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::Platform.eq(platform))
        .filter(meetings::Column::NativeMeetingId.eq(native_meeting_id))
        .all(db)
        .await?)
}

pub async fn list_non_terminal(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::Status.is_in(MeetingStatus::non_terminal()))
        .all(db)
        .await?)
}

/// Meetings stuck in `requested` since before `cutoff`; the reaper fails them.
pub async fn list_stuck_requested(
    db: &DatabaseConnection,
    cutoff: DateTime<FixedOffset>,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(meetings::Column::Status.eq(MeetingStatus::Requested))
        .filter(meetings::Column::CreatedAt.lt(cutoff))
        .all(db)
        .await?)
}

/// Patches the stored config after a reconfigure was published.
pub async fn update_config(
    db: &DatabaseConnection,
    meeting_id: Id,
    config: MeetingConfig,
) -> Result<Model, Error> {
    Entity::update_many()
        .col_expr(meetings::Column::Config, Expr::value(config))
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .exec(db)
        .await?;
    find_by_id(db, meeting_id).await
}

/// Replaces the user-facing data bag (PATCH /meetings).
pub async fn update_data(
    db: &DatabaseConnection,
    meeting_id: Id,
    data: serde_json::Value,
) -> Result<Model, Error> {
    Entity::update_many()
        .col_expr(meetings::Column::Data, Expr::value(data))
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .exec(db)
        .await?;
    find_by_id(db, meeting_id).await
}

/// Records a delivery or runtime error on the row without touching status.
pub async fn record_error(
    db: &DatabaseConnection,
    meeting_id: Id,
    message: &str,
) -> Result<(), Error> {
    Entity::update_many()
        .col_expr(
            meetings::Column::LastErrorMessage,
            Expr::value(Some(message.to_string())),
        )
        .col_expr(
            meetings::Column::UpdatedAt,
            Expr::value(DateTime::<FixedOffset>::from(chrono::Utc::now())),
        )
        .filter(meetings::Column::Id.eq(meeting_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        let mut row = BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }

    fn owner(max_concurrent_bots: i32) -> users::Model {
        let now = chrono::Utc::now();
        users::Model {
            id: 1,
            email: "owner@example.com".to_string(),
            display_name: None,
            max_concurrent_bots,
            webhook_url: None,
            webhook_secret: None,
            webhook_last_error: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn meeting(status: MeetingStatus) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: 7,
            user_id: 1,
            platform: Platform::GoogleMeet,
            native_meeting_id: Some("abc-defg-hij".to_string()),
            passcode: None,
            status,
            worker_ref: None,
            session_uid: Uuid::new_v4(),
            connection_id: None,
            worker_token: None,
            config: MeetingConfig::default(),
            data: serde_json::json!({}),
            anonymized_key_digest: None,
            start_time: None,
            end_time: None,
            completion_reason: None,
            failure_stage: None,
            last_error_message: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn create_request_rejects_malformed_native_id_before_touching_the_db() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = create_request(
            &db,
            &owner(2),
            Platform::GoogleMeet,
            "not-a-meet-code!",
            None,
            MeetingConfig::default(),
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::ValidationError
        );
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn create_request_returns_conflict_when_dispatch_key_is_taken() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(1)]])
            .into_connection();

        let result = create_request(
            &db,
            &owner(2),
            Platform::GoogleMeet,
            "abc-defg-hij",
            None,
            MeetingConfig::default(),
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::UniquenessConflict
        );
    }

    #[tokio::test]
    async fn create_request_returns_limit_at_the_concurrency_ceiling() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(0)], vec![count_row(2)]])
            .into_connection();

        let result = create_request(
            &db,
            &owner(2),
            Platform::GoogleMeet,
            "abc-defg-hij",
            None,
            MeetingConfig::default(),
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::ConcurrencyLimit
        );
    }

    #[tokio::test]
    async fn create_request_inserts_a_requested_row_under_the_ceiling() {
        let inserted = meeting(MeetingStatus::Requested);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(0)], vec![count_row(1)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 7,
                rows_affected: 1,
            }])
            .append_query_results([vec![inserted.clone()]])
            .into_connection();

        let result = create_request(
            &db,
            &owner(2),
            Platform::GoogleMeet,
            "abc-defg-hij",
            None,
            MeetingConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.id, 7);
        assert_eq!(result.status, MeetingStatus::Requested);
    }

    #[tokio::test]
    async fn transition_refuses_a_row_outside_the_from_set() {
        // The conditional update matches nothing; the follow-up read finds the
        // row already terminal.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![meeting(MeetingStatus::Completed)]])
            .into_connection();

        let result = transition(
            &db,
            7,
            &[MeetingStatus::Joining],
            MeetingStatus::AwaitingAdmission,
            TransitionPatch::none(),
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::InvalidTransition
        );
    }

    #[tokio::test]
    async fn transition_reports_not_found_for_a_missing_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<Model>::new()])
            .into_connection();

        let result = transition(
            &db,
            999,
            &[MeetingStatus::Requested],
            MeetingStatus::Joining,
            TransitionPatch::none(),
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound
        );
    }

    #[tokio::test]
    async fn transition_applies_and_returns_the_updated_row() {
        let updated = Model {
            status: MeetingStatus::Joining,
            ..meeting(MeetingStatus::Requested)
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![updated.clone()]])
            .into_connection();

        let result = transition(
            &db,
            7,
            &[MeetingStatus::Requested],
            MeetingStatus::Joining,
            TransitionPatch::none(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, MeetingStatus::Joining);
    }

    #[tokio::test]
    async fn anonymize_scrubs_identifiers_and_reports_the_scrubbed_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![meeting(MeetingStatus::Completed)]])
            .append_exec_results([
                // delete transcript segments
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                },
            ])
            .append_query_results([Vec::<recordings::Model>::new()])
            .append_exec_results([
                // scrub the meeting row
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        let result = anonymize(&db, 7).await.unwrap();

        assert_eq!(result.native_meeting_id, None);
        assert_eq!(result.passcode, None);
        assert_eq!(result.data, serde_json::json!({}));
    }

    #[tokio::test]
    async fn anonymize_unknown_meeting_reports_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Model>::new()])
            .into_connection();

        let result = anonymize(&db, 999).await;
        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound
        );
    }
}
