// src/runtime/event_bus.rs

use super::system_events::SystemEvent;
use tokio::sync::broadcast::{self, error::SendError, Receiver, Sender};

/// Broadcasts channel lifecycle events to every actor on one channel endpoint.
/// Internally uses tokio::sync::broadcast.
#[derive(Debug, Clone)]
pub struct EventBus {
  sender: Sender<SystemEvent>,
}

impl EventBus {
  pub fn with_capacity(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    tracing::debug!(capacity = capacity.max(1), "Created new EventBus");
    Self { sender }
  }

  /// Publishes an event onto the bus.
  ///
  /// Returns the number of receivers the event reached, or an error when nobody is
  /// subscribed (no live actors on the channel).
  pub fn publish(&self, event: SystemEvent) -> Result<usize, SendError<SystemEvent>> {
    tracing::trace!(event = ?event, "Publishing event");
    self.sender.send(event)
  }

  /// Each receiver sees every event published *after* it subscribed.
  /// Subscribe before the actor is spawned so no lifecycle event can be missed.
  pub fn subscribe(&self) -> Receiver<SystemEvent> {
    self.sender.subscribe()
  }

  pub fn subscriber_count(&self) -> usize {
    self.sender.receiver_count()
  }
}
