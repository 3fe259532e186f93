use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which stage a meeting failed in. Populated only on the terminal transition.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "failure_stage")]
pub enum FailureStage {
    /// The substrate never produced a running worker
    #[sea_orm(string_value = "spawn")]
    Spawn,
    /// The platform rejected the bot or admission timed out
    #[sea_orm(string_value = "admission")]
    Admission,
    /// The worker's platform handler raised, or the platform is unsupported
    #[sea_orm(string_value = "platform")]
    Platform,
    /// The worker was killed by a signal
    #[sea_orm(string_value = "signal")]
    Signal,
    /// No heartbeat inside the watchdog window
    #[sea_orm(string_value = "heartbeat_lost")]
    HeartbeatLost,
    /// Lost the admission-time concurrency re-check
    #[sea_orm(string_value = "concurrency")]
    Concurrency,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureStage::Spawn => "spawn",
            FailureStage::Admission => "admission",
            FailureStage::Platform => "platform",
            FailureStage::Signal => "signal",
            FailureStage::HeartbeatLost => "heartbeat_lost",
            FailureStage::Concurrency => "concurrency",
        };
        write!(fmt, "{s}")
    }
}
