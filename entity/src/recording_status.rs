use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status of a recording through its lifecycle.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    EnumIter,
    Deserialize,
    Default,
    Serialize,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "recording_status")]
pub enum RecordingStatus {
    /// Worker started with recording enabled; capture in progress
    #[sea_orm(string_value = "recording")]
    #[default]
    Recording,
    /// Worker uploaded finalized media
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Capture or upload failed; see error_message
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Removed as part of meeting deletion
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingStatus::Recording => write!(fmt, "recording"),
            RecordingStatus::Completed => write!(fmt, "completed"),
            RecordingStatus::Failed => write!(fmt, "failed"),
            RecordingStatus::Deleted => write!(fmt, "deleted"),
        }
    }
}
