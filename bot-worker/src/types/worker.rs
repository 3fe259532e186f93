//! Worker handle, state, and start-request types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normative exit codes for the worker process. The process orchestrator
/// reports these verbatim; the lifecycle layer maps them to terminal
/// statuses when the worker vanished without reporting a reason.
pub mod exit_code {
    /// Normal completion or self-initiated leave
    pub const NORMAL: i32 = 0;
    /// Generic failure
    pub const FAILURE: i32 = 1;
    /// Bad or unparsable worker configuration
    pub const BAD_CONFIG: i32 = 2;
    /// Killed by SIGINT
    pub const SIGINT: i32 = 130;
    /// Killed by SIGTERM
    pub const SIGTERM: i32 = 143;
}

/// Opaque handle to a running worker: a container id for the container
/// substrate, a pid for the process substrate. Only the orchestrator that
/// issued a handle may interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerRef(pub String);

impl WorkerRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerRef {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

/// Observed state of a worker as reported by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Exited { code: i32 },
    /// The substrate has no record of the worker (reaped, host restart)
    Missing,
}

/// Everything an orchestrator needs to start one worker.
///
/// The worker receives its configuration as a JSON blob in its environment
/// plus the endpoints it phones home to; it never talks to the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub meeting_id: i32,
    pub platform: String,
    pub native_meeting_id: String,
    pub passcode: Option<String>,
    /// Session identity, stable across reconfigure
    pub session_uid: Uuid,
    /// Correlates status callbacks from this worker instance
    pub connection_id: Uuid,
    /// Full bot configuration, serialized for the worker's environment
    pub config: serde_json::Value,
    /// Per-meeting bearer token the worker presents on callbacks
    pub meeting_token: String,
    /// Where the worker sends status callbacks and uploads
    pub callback_url: String,
    /// Redis endpoint carrying the command bus
    pub command_bus_url: String,
    /// Speech-to-text sink the worker streams audio to
    pub transcription_url: String,
    pub transcription_api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_ref_displays_raw_handle() {
        let worker = WorkerRef("abc123".to_string());
        assert_eq!(worker.to_string(), "abc123");
        assert_eq!(worker.as_str(), "abc123");
    }

    #[test]
    fn test_start_request_serializes_for_worker_env() {
        let request = StartRequest {
            meeting_id: 42,
            platform: "google_meet".to_string(),
            native_meeting_id: "abc-defg-hij".to_string(),
            passcode: None,
            session_uid: Uuid::new_v4(),
            connection_id: Uuid::new_v4(),
            config: serde_json::json!({"language": "en"}),
            meeting_token: "tok".to_string(),
            callback_url: "http://orchestrator:18056".to_string(),
            command_bus_url: "redis://redis:6379".to_string(),
            transcription_url: "ws://transcriber:9090".to_string(),
            transcription_api_key: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["meeting_id"], 42);
        assert_eq!(value["platform"], "google_meet");
        assert_eq!(value["config"]["language"], "en");
    }
}
