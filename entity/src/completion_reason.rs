use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Why a meeting ended `completed`. Populated only on the terminal transition.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "completion_reason")]
pub enum CompletionReason {
    /// Operator- or worker-initiated clean leave
    #[sea_orm(string_value = "stopped")]
    Stopped,
    /// Bot left because it was alone in the meeting
    #[sea_orm(string_value = "left_alone")]
    LeftAlone,
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionReason::Stopped => write!(fmt, "stopped"),
            CompletionReason::LeftAlone => write!(fmt, "left_alone"),
        }
    }
}
