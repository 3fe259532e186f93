//! The single exit reducer.
//!
//! Every path that terminates a meeting funnels through [`map_exit`]: worker
//! exit callbacks, exit codes observed by the process substrate, watchdog
//! expiry, and fallback kills. Nothing else decides a terminal status.

use bot_worker::types::worker::exit_code;
use entity::completion_reason::CompletionReason;
use entity::failure_stage::FailureStage;
use entity::meeting_status::MeetingStatus;

/// The outcome of the reducer: a terminal status plus exactly one of
/// completion_reason (completed) or failure_stage (failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    pub status: MeetingStatus,
    pub completion_reason: Option<CompletionReason>,
    pub failure_stage: Option<FailureStage>,
}

impl Terminal {
    pub fn completed(reason: CompletionReason) -> Self {
        Terminal {
            status: MeetingStatus::Completed,
            completion_reason: Some(reason),
            failure_stage: None,
        }
    }

    pub fn failed(stage: FailureStage) -> Self {
        Terminal {
            status: MeetingStatus::Failed,
            completion_reason: None,
            failure_stage: Some(stage),
        }
    }
}

/// Maps a worker-reported exit onto a terminal status.
///
/// `reason` wins when present; the exit code only decides when the worker
/// vanished without reporting one. `pending_reason` is the completion reason
/// the lifecycle manager promised before publishing a leave (the left-alone
/// case); it overrides `stopped` on clean exits only.
pub fn map_exit(
    reason: Option<&str>,
    code: Option<i32>,
    pending_reason: Option<CompletionReason>,
) -> Terminal {
    if let Some(reason) = reason {
        return match reason {
            "self_initiated_leave" | "self_initiated_leave_from_browser" | "normal_completion" => {
                Terminal::completed(pending_reason.unwrap_or(CompletionReason::Stopped))
            }
            "left_alone" | "startup_alone_timeout" | "post_speaker_alone_timeout" => {
                Terminal::completed(CompletionReason::LeftAlone)
            }
            "admission_failed" | "rejected" => Terminal::failed(FailureStage::Admission),
            "platform_handler_exception" | "unknown_platform" => {
                Terminal::failed(FailureStage::Platform)
            }
            "signal_sigterm" | "signal_sigint" => Terminal::failed(FailureStage::Signal),
            // Unknown reason strings fall through to the exit code.
            _ => map_code(code, pending_reason),
        };
    }
    map_code(code, pending_reason)
}

/// A worker unreachable past the watchdog window.
pub fn heartbeat_lost() -> Terminal {
    Terminal::failed(FailureStage::HeartbeatLost)
}

fn map_code(code: Option<i32>, pending_reason: Option<CompletionReason>) -> Terminal {
    match code {
        Some(exit_code::NORMAL) => {
            Terminal::completed(pending_reason.unwrap_or(CompletionReason::Stopped))
        }
        Some(exit_code::BAD_CONFIG) => Terminal::failed(FailureStage::Spawn),
        Some(exit_code::SIGINT) | Some(exit_code::SIGTERM) => {
            Terminal::failed(FailureStage::Signal)
        }
        _ => Terminal::failed(FailureStage::Platform),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_leaves_complete_as_stopped() {
        for reason in [
            "self_initiated_leave",
            "self_initiated_leave_from_browser",
            "normal_completion",
        ] {
            let terminal = map_exit(Some(reason), Some(0), None);
            assert_eq!(terminal, Terminal::completed(CompletionReason::Stopped));
        }
    }

    #[test]
    fn test_alone_exits_complete_as_left_alone() {
        for reason in [
            "left_alone",
            "startup_alone_timeout",
            "post_speaker_alone_timeout",
        ] {
            let terminal = map_exit(Some(reason), Some(0), None);
            assert_eq!(terminal, Terminal::completed(CompletionReason::LeftAlone));
        }
    }

    #[test]
    fn test_admission_rejections_fail_at_admission() {
        for reason in ["admission_failed", "rejected"] {
            let terminal = map_exit(Some(reason), Some(1), None);
            assert_eq!(terminal, Terminal::failed(FailureStage::Admission));
        }
    }

    #[test]
    fn test_platform_errors_fail_at_platform() {
        for reason in ["platform_handler_exception", "unknown_platform"] {
            let terminal = map_exit(Some(reason), Some(1), None);
            assert_eq!(terminal, Terminal::failed(FailureStage::Platform));
        }
    }

    #[test]
    fn test_signals_fail_at_signal() {
        assert_eq!(
            map_exit(Some("signal_sigterm"), Some(143), None),
            Terminal::failed(FailureStage::Signal)
        );
        assert_eq!(
            map_exit(Some("signal_sigint"), Some(130), None),
            Terminal::failed(FailureStage::Signal)
        );
    }

    #[test]
    fn test_exit_codes_decide_when_no_reason_was_reported() {
        assert_eq!(
            map_exit(None, Some(0), None),
            Terminal::completed(CompletionReason::Stopped)
        );
        assert_eq!(
            map_exit(None, Some(2), None),
            Terminal::failed(FailureStage::Spawn)
        );
        assert_eq!(
            map_exit(None, Some(130), None),
            Terminal::failed(FailureStage::Signal)
        );
        assert_eq!(
            map_exit(None, Some(143), None),
            Terminal::failed(FailureStage::Signal)
        );
        assert_eq!(
            map_exit(None, Some(1), None),
            Terminal::failed(FailureStage::Platform)
        );
        assert_eq!(
            map_exit(None, None, None),
            Terminal::failed(FailureStage::Platform)
        );
    }

    #[test]
    fn test_pending_left_alone_overrides_stopped_on_clean_exits_only() {
        let clean = map_exit(
            Some("self_initiated_leave"),
            Some(0),
            Some(CompletionReason::LeftAlone),
        );
        assert_eq!(clean, Terminal::completed(CompletionReason::LeftAlone));

        // A failure is still a failure, whatever was pending.
        let failed = map_exit(
            Some("platform_handler_exception"),
            Some(1),
            Some(CompletionReason::LeftAlone),
        );
        assert_eq!(failed, Terminal::failed(FailureStage::Platform));
    }

    #[test]
    fn test_unknown_reason_falls_through_to_the_exit_code() {
        assert_eq!(
            map_exit(Some("cosmic_rays"), Some(0), None),
            Terminal::completed(CompletionReason::Stopped)
        );
        assert_eq!(
            map_exit(Some("cosmic_rays"), None, None),
            Terminal::failed(FailureStage::Platform)
        );
    }

    #[test]
    fn test_heartbeat_lost_is_its_own_stage() {
        assert_eq!(
            heartbeat_lost(),
            Terminal::failed(FailureStage::HeartbeatLost)
        );
    }
}
