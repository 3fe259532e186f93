//! Event-channel message schema: worker -> orchestrator/observers.
//!
//! Events are published on one Redis channel per meeting, tagged on the
//! `event` field with dotted names. They observe send-order per meeting but
//! no global order, and are informational; durable state goes through the
//! registry, never through this channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the per-meeting event channel.
pub fn event_channel(meeting_id: i32) -> String {
    format!("va:meeting:{meeting_id}:events")
}

/// One message from a meeting's chat, as reported by `chat.messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
}

/// Worker-emitted events for one meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum BotEvent {
    #[serde(rename = "speak.started")]
    SpeakStarted { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "speak.completed")]
    SpeakCompleted { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "speak.interrupted")]
    SpeakInterrupted { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "speak.error")]
    SpeakError {
        meeting_id: i32,
        message: String,
        ts: DateTime<Utc>,
    },

    #[serde(rename = "chat.sent")]
    ChatSent { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "chat.messages")]
    ChatMessages {
        meeting_id: i32,
        messages: Vec<ChatMessage>,
        ts: DateTime<Utc>,
    },

    #[serde(rename = "screen.content_updated")]
    ScreenContentUpdated { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "screen.content_cleared")]
    ScreenContentCleared { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "screen.error")]
    ScreenError {
        meeting_id: i32,
        message: String,
        ts: DateTime<Utc>,
    },

    #[serde(rename = "avatar.set")]
    AvatarSet { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "avatar.reset")]
    AvatarReset { meeting_id: i32, ts: DateTime<Utc> },

    #[serde(rename = "voice_agent.initialized")]
    VoiceAgentInitialized { meeting_id: i32, ts: DateTime<Utc> },
}

impl BotEvent {
    /// The meeting this event belongs to.
    pub fn meeting_id(&self) -> i32 {
        match self {
            BotEvent::SpeakStarted { meeting_id, .. }
            | BotEvent::SpeakCompleted { meeting_id, .. }
            | BotEvent::SpeakInterrupted { meeting_id, .. }
            | BotEvent::SpeakError { meeting_id, .. }
            | BotEvent::ChatSent { meeting_id, .. }
            | BotEvent::ChatMessages { meeting_id, .. }
            | BotEvent::ScreenContentUpdated { meeting_id, .. }
            | BotEvent::ScreenContentCleared { meeting_id, .. }
            | BotEvent::ScreenError { meeting_id, .. }
            | BotEvent::AvatarSet { meeting_id, .. }
            | BotEvent::AvatarReset { meeting_id, .. }
            | BotEvent::VoiceAgentInitialized { meeting_id, .. } => *meeting_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_channel_name_is_stable() {
        assert_eq!(event_channel(42), "va:meeting:42:events");
    }

    #[test]
    fn test_event_tag_uses_dotted_names() {
        let event = BotEvent::SpeakStarted {
            meeting_id: 5,
            ts: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "speak.started");
        assert_eq!(value["meeting_id"], 5);
        assert!(value.get("ts").is_some());
    }

    #[test]
    fn test_chat_messages_round_trips() {
        let event = BotEvent::ChatMessages {
            meeting_id: 9,
            messages: vec![ChatMessage {
                sender: "Alice".to_string(),
                text: "hi".to_string(),
            }],
            ts: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: BotEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unknown_event_fails_to_parse() {
        let payload = r#"{"event": "telepathy.received", "meeting_id": 1}"#;
        assert!(serde_json::from_str::<BotEvent>(payload).is_err());
    }
}
