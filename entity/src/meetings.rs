//! SeaORM Entity for the meetings table, the unit of orchestration.
//! The registry is the single writer of these rows; every status change goes
//! through its conditional update.

use crate::completion_reason::CompletionReason;
use crate::failure_stage::FailureStage;
use crate::meeting_status::MeetingStatus;
use crate::platform::Platform;
use crate::Id;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the transcription sink should do with captured audio.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionTask {
    Transcribe,
    Translate,
}

/// Bot configuration captured at dispatch time. Immutable for the life of the
/// meeting except for `language` and `task`, which a reconfigure may patch.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct MeetingConfig {
    pub language: Option<String>,
    pub task: Option<TranscriptionTask>,
    pub bot_name: Option<String>,
    #[serde(default)]
    pub voice_agent_enabled: bool,
    #[serde(default)]
    pub recording_enabled: bool,
    #[serde(default = "MeetingConfig::default_capture_audio")]
    pub capture_audio: bool,
    #[serde(default)]
    pub capture_video: bool,
    pub transcription_tier: Option<String>,
}

impl MeetingConfig {
    fn default_capture_audio() -> bool {
        true
    }
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            language: None,
            task: None,
            bot_name: None,
            voice_agent_enabled: false,
            recording_enabled: false,
            capture_audio: true,
            capture_video: false,
            transcription_tier: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::meetings::Model)]
#[sea_orm(schema_name = "vexa", table_name = "meetings")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub user_id: Id,

    pub platform: Platform,

    /// Platform-native identifier; nulled by anonymization
    pub native_meeting_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,

    pub status: MeetingStatus,

    /// Opaque handle to the running worker (container id or pid); non-null
    /// exactly while the bot is joining, waiting in the lobby, or active
    pub worker_ref: Option<String>,

    /// Stable UUID for the single audio session; survives reconfigure
    #[schema(value_type = String, format = Uuid)]
    pub session_uid: Uuid,

    /// Correlates status callbacks from the worker instance started for this
    /// meeting; assigned at dispatch
    #[serde(skip_serializing)]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub connection_id: Option<Uuid>,

    /// Bearer token the worker presents on its callbacks and uploads
    #[serde(skip_serializing)]
    pub worker_token: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub config: MeetingConfig,

    /// User-supplied metadata bag; emptied by anonymization
    #[sea_orm(column_type = "JsonBinary")]
    #[schema(value_type = Object)]
    pub data: Json,

    /// One-way digest of (owner, platform, native id), written by
    /// anonymization so repeated deletes still resolve the row
    #[serde(skip_serializing)]
    pub anonymized_key_digest: Option<String>,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_time: Option<DateTimeWithTimeZone>,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub end_time: Option<DateTimeWithTimeZone>,

    pub completion_reason: Option<CompletionReason>,

    pub failure_stage: Option<FailureStage>,

    pub last_error_message: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,

    #[sea_orm(has_many = "super::recordings::Entity")]
    Recordings,

    #[sea_orm(has_many = "super::transcript_segments::Entity")]
    TranscriptSegments,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::recordings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recordings.def()
    }
}

impl Related<super::transcript_segments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TranscriptSegments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_config_defaults_capture_audio_only() {
        let config: MeetingConfig = serde_json::from_str("{}").unwrap();
        assert!(config.capture_audio);
        assert!(!config.capture_video);
        assert!(!config.recording_enabled);
        assert!(!config.voice_agent_enabled);
        assert_eq!(config.language, None);
        assert_eq!(config.task, None);
    }

    #[test]
    fn test_transcription_task_uses_snake_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&TranscriptionTask::Transcribe).unwrap(),
            "\"transcribe\""
        );
        assert_eq!(
            serde_json::from_str::<TranscriptionTask>("\"translate\"").unwrap(),
            TranscriptionTask::Translate
        );
    }
}
