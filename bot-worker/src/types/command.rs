//! Command-bus message schema: orchestrator -> worker.
//!
//! Commands travel as JSON over one Redis channel per meeting. The schema is
//! a closed tagged union on the `action` field; unknown actions fail to
//! deserialize and are dropped by the receiver. Every message carries the
//! meeting id it is addressed to, and receivers MUST drop messages whose
//! meeting id is not their own even though channel names are per-meeting.

use serde::{Deserialize, Serialize};

/// Name of the per-meeting command channel.
pub fn command_channel(meeting_id: i32) -> String {
    format!("bot_commands:meeting:{meeting_id}")
}

/// Content type for `screen_show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenContentType {
    Image,
    Text,
}

/// Control-plane commands addressed to one in-flight worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BotCommand {
    /// Change transcription language/task mid-session
    Reconfigure {
        meeting_id: i32,
        language: Option<String>,
        task: Option<String>,
    },
    /// Leave the meeting gracefully
    Leave { meeting_id: i32 },
    /// Synthesize speech from text into the meeting
    Speak {
        meeting_id: i32,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
    },
    /// Play pre-rendered audio into the meeting
    SpeakAudio {
        meeting_id: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_base64: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample_rate: Option<u32>,
    },
    /// Interrupt any in-progress speech
    SpeakStop { meeting_id: i32 },
    /// Post a message into the meeting chat
    ChatSend { meeting_id: i32, text: String },
    /// Ask the worker to report the chat backlog on the event channel
    ChatRead { meeting_id: i32 },
    /// Present content via the worker's screen share
    ScreenShow {
        meeting_id: i32,
        #[serde(rename = "type")]
        content_type: ScreenContentType,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Stop presenting
    ScreenStop { meeting_id: i32 },
    /// Replace the bot's avatar image
    AvatarSet {
        meeting_id: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_base64: Option<String>,
    },
    /// Restore the default avatar
    AvatarReset { meeting_id: i32 },
}

impl BotCommand {
    /// The meeting this command is addressed to.
    pub fn meeting_id(&self) -> i32 {
        match self {
            BotCommand::Reconfigure { meeting_id, .. }
            | BotCommand::Leave { meeting_id }
            | BotCommand::Speak { meeting_id, .. }
            | BotCommand::SpeakAudio { meeting_id, .. }
            | BotCommand::SpeakStop { meeting_id }
            | BotCommand::ChatSend { meeting_id, .. }
            | BotCommand::ChatRead { meeting_id }
            | BotCommand::ScreenShow { meeting_id, .. }
            | BotCommand::ScreenStop { meeting_id }
            | BotCommand::AvatarSet { meeting_id, .. }
            | BotCommand::AvatarReset { meeting_id } => *meeting_id,
        }
    }

    /// The wire value of the `action` tag.
    pub fn action(&self) -> &'static str {
        match self {
            BotCommand::Reconfigure { .. } => "reconfigure",
            BotCommand::Leave { .. } => "leave",
            BotCommand::Speak { .. } => "speak",
            BotCommand::SpeakAudio { .. } => "speak_audio",
            BotCommand::SpeakStop { .. } => "speak_stop",
            BotCommand::ChatSend { .. } => "chat_send",
            BotCommand::ChatRead { .. } => "chat_read",
            BotCommand::ScreenShow { .. } => "screen_show",
            BotCommand::ScreenStop { .. } => "screen_stop",
            BotCommand::AvatarSet { .. } => "avatar_set",
            BotCommand::AvatarReset { .. } => "avatar_reset",
        }
    }

    /// Receiver-side guard: parse a raw bus payload and keep it only when it
    /// is well-formed AND addressed to `meeting_id`. Anything else is None.
    pub fn parse_for(meeting_id: i32, payload: &str) -> Option<BotCommand> {
        serde_json::from_str::<BotCommand>(payload)
            .ok()
            .filter(|command| command.meeting_id() == meeting_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_name_is_stable() {
        assert_eq!(command_channel(7), "bot_commands:meeting:7");
    }

    #[test]
    fn test_reconfigure_wire_format() {
        let command = BotCommand::Reconfigure {
            meeting_id: 12,
            language: Some("fr".to_string()),
            task: Some("translate".to_string()),
        };

        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["action"], "reconfigure");
        assert_eq!(value["meeting_id"], 12);
        assert_eq!(value["language"], "fr");
        assert_eq!(value["task"], "translate");
    }

    #[test]
    fn test_screen_show_uses_type_field_on_the_wire() {
        let command = BotCommand::ScreenShow {
            meeting_id: 3,
            content_type: ScreenContentType::Image,
            url: Some("https://example.com/slide.png".to_string()),
            text: None,
        };

        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["action"], "screen_show");
        assert_eq!(value["type"], "image");
        assert!(value.get("text").is_none());
    }

    #[test]
    fn test_every_variant_round_trips() {
        let commands = vec![
            BotCommand::Leave { meeting_id: 1 },
            BotCommand::SpeakStop { meeting_id: 1 },
            BotCommand::ChatRead { meeting_id: 1 },
            BotCommand::ScreenStop { meeting_id: 1 },
            BotCommand::AvatarReset { meeting_id: 1 },
            BotCommand::ChatSend {
                meeting_id: 1,
                text: "hello".to_string(),
            },
            BotCommand::AvatarSet {
                meeting_id: 1,
                url: None,
                image_base64: Some("aGk=".to_string()),
            },
        ];
        for command in commands {
            let json = serde_json::to_string(&command).unwrap();
            let back: BotCommand = serde_json::from_str(&json).unwrap();
            assert_eq!(back, command);
        }
    }

    #[test]
    fn test_unknown_action_is_dropped() {
        let payload = r#"{"action": "self_destruct", "meeting_id": 1}"#;
        assert!(BotCommand::parse_for(1, payload).is_none());
    }

    #[test]
    fn test_command_for_another_meeting_is_dropped() {
        // A worker for meeting 1 must ignore a command addressed to meeting 2
        // even if it arrives on meeting 1's channel.
        let payload = r#"{"action": "leave", "meeting_id": 2}"#;
        assert!(BotCommand::parse_for(1, payload).is_none());
        assert!(BotCommand::parse_for(2, payload).is_some());
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        assert!(BotCommand::parse_for(1, "not json").is_none());
        assert!(BotCommand::parse_for(1, r#"{"action": "leave"}"#).is_none());
    }
}
