//! Event system infrastructure for the orchestrator.
//!
//! This crate provides the in-process event system that decouples the
//! lifecycle state machine from its side effects (webhook delivery,
//! recording cleanup).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum of business events emitted by the lifecycle layer
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates (entity, domain, etc.),
//! avoiding circular dependencies. Entity data is carried as serialized JSON
//! values.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A type alias that represents any Entity's internal id field data type.
/// This matches the definition in the entity crate to maintain compatibility.
pub type Id = i32;

/// Domain events emitted when lifecycle operations complete.
///
/// The lifecycle layer decides what each event carries; meeting data travels
/// as `serde_json::Value` so this crate needs no entity dependency.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A meeting moved to a new non-terminal status.
    MeetingStatusChanged {
        meeting_id: Id,
        owner_id: Id,
        /// New status as its wire string, e.g. "awaiting_admission"
        status: String,
    },

    /// A meeting reached a terminal status. Fired exactly once per meeting;
    /// the webhook dispatcher keys off this event.
    MeetingEnded {
        meeting_id: Id,
        owner_id: Id,
        /// Serialized webhook payload: identifiers captured before any
        /// anonymization, final status, reason/stage, timestamps
        payload: Value,
    },
}

/// Trait for handling domain events.
/// Implementations perform side effects like webhook delivery or cleanup.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional
    /// handler. Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers, sequentially.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &DomainEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_registered_handler() {
        let first = Arc::new(CountingHandler {
            seen: AtomicUsize::new(0),
        });
        let second = Arc::new(CountingHandler {
            seen: AtomicUsize::new(0),
        });

        let publisher = EventPublisher::new()
            .with_handler(first.clone())
            .with_handler(second.clone());

        publisher
            .publish(DomainEvent::MeetingEnded {
                meeting_id: 1,
                owner_id: 2,
                payload: serde_json::json!({"status": "completed"}),
            })
            .await;

        assert_eq!(first.seen.load(Ordering::SeqCst), 1);
        assert_eq!(second.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_with_no_handlers_is_a_noop() {
        let publisher = EventPublisher::new();
        publisher
            .publish(DomainEvent::MeetingStatusChanged {
                meeting_id: 1,
                owner_id: 2,
                status: "active".to_string(),
            })
            .await;
    }
}
