//! Redis client for the per-meeting command and event channels.
//!
//! Publication is best-effort: the bus carries liveness-coupled messages
//! only, and callers fall back to hard termination through the worker
//! orchestrator when a publish fails. Durable state never travels here.

use crate::error::Error;
use bot_worker::types::command::{command_channel, BotCommand};
use bot_worker::types::event::{event_channel, BotEvent};
use log::*;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// One Redis connection per orchestrator process, multiplexed across
/// meetings. `ConnectionManager` reconnects on its own after hiccups.
#[derive(Clone)]
pub struct CommandBus {
    connection: Option<ConnectionManager>,
}

impl CommandBus {
    pub async fn connect(redis_url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        info!("Connected command bus: {redis_url}");
        Ok(Self {
            connection: Some(connection),
        })
    }

    /// A bus with no backing connection: every publish reports the bus as
    /// unavailable, which exercises the hard-terminate fallback. For tests
    /// and single-process development runs without Redis.
    pub fn disconnected() -> Self {
        Self { connection: None }
    }

    fn bus_down() -> Error {
        Error {
            source: None,
            error_kind: crate::error::DomainErrorKind::External(
                crate::error::ExternalErrorKind::Bus,
            ),
        }
    }

    /// Publishes a command on the meeting's command channel.
    pub async fn publish_command(&self, command: &BotCommand) -> Result<(), Error> {
        let channel = command_channel(command.meeting_id());
        let payload = serde_json::to_string(command).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::DomainErrorKind::Internal(
                crate::error::InternalErrorKind::Other("Failed to encode command".to_string()),
            ),
        })?;

        debug!(
            "Publishing {} on {channel} for meeting {}",
            command.action(),
            command.meeting_id()
        );

        let mut connection = self.connection.clone().ok_or_else(Self::bus_down)?;
        let _receivers: i64 = connection.publish(channel, payload).await?;
        Ok(())
    }

    /// Publishes an event on the meeting's event channel.
    pub async fn publish_event(&self, event: &BotEvent) -> Result<(), Error> {
        let channel = event_channel(event.meeting_id());
        let payload = serde_json::to_string(event).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::DomainErrorKind::Internal(
                crate::error::InternalErrorKind::Other("Failed to encode event".to_string()),
            ),
        })?;

        let mut connection = self.connection.clone().ok_or_else(Self::bus_down)?;
        let _receivers: i64 = connection.publish(channel, payload).await?;
        Ok(())
    }

    /// Liveness probe used by the health endpoint.
    pub async fn ping(&self) -> Result<(), Error> {
        let mut connection = self.connection.clone().ok_or_else(Self::bus_down)?;
        let _pong: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok(())
    }
}
