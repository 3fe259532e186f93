//! Request bodies for the bot control endpoints.

use domain::meetings::{MeetingConfig, TranscriptionTask};
use serde::Deserialize;
use utoipa::ToSchema;

/// Body of `POST /bots`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DispatchRequest {
    pub platform: String,
    pub native_meeting_id: String,
    #[serde(default)]
    pub passcode: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// "transcribe", "translate", or absent
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub bot_name: Option<String>,
    #[serde(default)]
    pub recording_enabled: Option<bool>,
    #[serde(default)]
    pub transcription_tier: Option<String>,
}

impl DispatchRequest {
    /// Builds the meeting config captured at dispatch time. Unknown task
    /// values are a validation error, not a silent default.
    pub fn into_config(self) -> Result<MeetingConfig, ()> {
        let task = match self.task.as_deref() {
            None => None,
            Some("transcribe") => Some(TranscriptionTask::Transcribe),
            Some("translate") => Some(TranscriptionTask::Translate),
            Some(_) => return Err(()),
        };
        Ok(MeetingConfig {
            language: self.language,
            task,
            bot_name: self.bot_name,
            recording_enabled: self.recording_enabled.unwrap_or(false),
            transcription_tier: self.transcription_tier,
            ..MeetingConfig::default()
        })
    }
}

/// Body of `PUT /bots/{platform}/{native_meeting_id}/config`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReconfigureRequest {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_request_builds_a_config() {
        let request: DispatchRequest = serde_json::from_str(
            r#"{
                "platform": "google_meet",
                "native_meeting_id": "abc-defg-hij",
                "language": "en",
                "task": "transcribe",
                "recording_enabled": true
            }"#,
        )
        .unwrap();

        let config = request.into_config().unwrap();
        assert_eq!(config.language.as_deref(), Some("en"));
        assert_eq!(config.task, Some(TranscriptionTask::Transcribe));
        assert!(config.recording_enabled);
        assert!(config.capture_audio);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let request: DispatchRequest = serde_json::from_str(
            r#"{
                "platform": "zoom",
                "native_meeting_id": "123456",
                "task": "summarize"
            }"#,
        )
        .unwrap();
        assert!(request.into_config().is_err());
    }
}
