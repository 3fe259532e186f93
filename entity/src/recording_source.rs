use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a recording's media came from.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "recording_source")]
pub enum RecordingSource {
    /// Captured by the dispatched bot worker
    #[sea_orm(string_value = "bot")]
    Bot,
    /// Uploaded out-of-band by the user
    #[sea_orm(string_value = "external")]
    External,
}
