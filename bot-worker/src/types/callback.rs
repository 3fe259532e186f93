//! Status-callback schema: worker -> orchestrator over HTTP.
//!
//! A worker reports its lifecycle over a single callback endpoint keyed by
//! its connection id. Deliveries are at-least-once; the orchestrator treats
//! each (connection_id, status) pair idempotently.

use serde::{Deserialize, Serialize};

/// The lifecycle stage a worker reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Navigating into the meeting
    Joining,
    /// Parked in the lobby / waiting room
    AwaitingAdmission,
    /// Admitted; audio session live
    Active,
    /// Periodic heartbeat while active
    StatusUpdate,
    /// Final report before the worker exits
    Exit,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Joining => "joining",
            WorkerStatus::AwaitingAdmission => "awaiting_admission",
            WorkerStatus::Active => "active",
            WorkerStatus::StatusUpdate => "status_update",
            WorkerStatus::Exit => "exit",
        }
    }
}

/// Body of a worker status callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCallback {
    pub status: WorkerStatus,

    /// Exit reason string on `exit` callbacks, e.g. "self_initiated_leave"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,

    /// Container name, when the worker knows it (container substrate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    /// How many participants the worker currently sees, itself included.
    /// Carried on heartbeats; drives the alone-since timers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_snake_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&WorkerStatus::AwaitingAdmission).unwrap(),
            "\"awaiting_admission\""
        );
        assert_eq!(
            serde_json::from_str::<WorkerStatus>("\"status_update\"").unwrap(),
            WorkerStatus::StatusUpdate
        );
    }

    #[test]
    fn test_minimal_callback_parses() {
        let callback: StatusCallback = serde_json::from_str(r#"{"status": "active"}"#).unwrap();
        assert_eq!(callback.status, WorkerStatus::Active);
        assert_eq!(callback.reason, None);
        assert_eq!(callback.participant_count, None);
    }

    #[test]
    fn test_exit_callback_carries_reason_and_code() {
        let callback: StatusCallback = serde_json::from_str(
            r#"{"status": "exit", "reason": "self_initiated_leave", "exit_code": 0}"#,
        )
        .unwrap();
        assert_eq!(callback.status, WorkerStatus::Exit);
        assert_eq!(callback.reason.as_deref(), Some("self_initiated_leave"));
        assert_eq!(callback.exit_code, Some(0));
    }
}
