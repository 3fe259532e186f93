use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status of a meeting's bot through its lifecycle.
///
/// Every status change goes through the registry's conditional update, so the
/// observed sequence for any one meeting is always a path in this graph:
///
/// ```text
/// requested -> joining -> awaiting_admission -> active -> completing -> completed
///                      \                      \         \
///                       `-> failed             `-> failed `-> failed
/// ```
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "meeting_status")]
pub enum MeetingStatus {
    /// Row inserted, worker not yet started
    #[sea_orm(string_value = "requested")]
    #[default]
    Requested,
    /// Worker accepted by the substrate and navigating into the meeting
    #[sea_orm(string_value = "joining")]
    Joining,
    /// Worker is in the lobby / waiting room
    #[sea_orm(string_value = "awaiting_admission")]
    AwaitingAdmission,
    /// Worker admitted, audio session live
    #[sea_orm(string_value = "active")]
    Active,
    /// Leave issued, waiting for the worker to confirm exit
    #[sea_orm(string_value = "completing")]
    Completing,
    /// Terminal: clean end of session
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Terminal: any failure path
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl MeetingStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MeetingStatus::Completed | MeetingStatus::Failed)
    }

    /// The statuses during which a worker_ref must be attached.
    pub fn has_worker(&self) -> bool {
        matches!(
            self,
            MeetingStatus::Joining | MeetingStatus::AwaitingAdmission | MeetingStatus::Active
        )
    }

    /// All non-terminal statuses, the from-set for `stop` and hard kills.
    pub fn non_terminal() -> [MeetingStatus; 5] {
        [
            MeetingStatus::Requested,
            MeetingStatus::Joining,
            MeetingStatus::AwaitingAdmission,
            MeetingStatus::Active,
            MeetingStatus::Completing,
        ]
    }

    /// The forward-edge predicate of the lifecycle graph. Terminal entries from
    /// any non-terminal state are always legal (timeouts and hard kills).
    pub fn can_transition_to(&self, to: MeetingStatus) -> bool {
        use MeetingStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, to) {
            (_, Completed) | (_, Failed) => true,
            (Requested, Joining) => true,
            (Joining, AwaitingAdmission) => true,
            (Joining, Active) | (AwaitingAdmission, Active) => true,
            (Requested, Completing)
            | (Joining, Completing)
            | (AwaitingAdmission, Completing)
            | (Active, Completing) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::Requested => write!(fmt, "requested"),
            MeetingStatus::Joining => write!(fmt, "joining"),
            MeetingStatus::AwaitingAdmission => write!(fmt, "awaiting_admission"),
            MeetingStatus::Active => write!(fmt, "active"),
            MeetingStatus::Completing => write!(fmt, "completing"),
            MeetingStatus::Completed => write!(fmt, "completed"),
            MeetingStatus::Failed => write!(fmt, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_terminal_statuses_admit_no_transitions() {
        for to in MeetingStatus::iter() {
            assert!(!MeetingStatus::Completed.can_transition_to(to));
            assert!(!MeetingStatus::Failed.can_transition_to(to));
        }
    }

    #[test]
    fn test_happy_path_is_a_legal_walk() {
        let path = [
            MeetingStatus::Requested,
            MeetingStatus::Joining,
            MeetingStatus::AwaitingAdmission,
            MeetingStatus::Active,
            MeetingStatus::Completing,
            MeetingStatus::Completed,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_backward_edges_are_rejected() {
        assert!(!MeetingStatus::Active.can_transition_to(MeetingStatus::Joining));
        assert!(!MeetingStatus::Completing.can_transition_to(MeetingStatus::Active));
        assert!(!MeetingStatus::Joining.can_transition_to(MeetingStatus::Requested));
    }

    #[test]
    fn test_every_non_terminal_status_can_fail() {
        for from in MeetingStatus::non_terminal() {
            assert!(from.can_transition_to(MeetingStatus::Failed));
        }
    }

    #[test]
    fn test_worker_ref_window_matches_statuses() {
        assert!(!MeetingStatus::Requested.has_worker());
        assert!(MeetingStatus::Joining.has_worker());
        assert!(MeetingStatus::AwaitingAdmission.has_worker());
        assert!(MeetingStatus::Active.has_worker());
        assert!(!MeetingStatus::Completing.has_worker());
        assert!(!MeetingStatus::Completed.has_worker());
    }
}
