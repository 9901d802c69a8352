// src/config.rs

use std::time::Duration;

/// Default capacity for actor mailboxes and in-process channel queues.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;
/// Default capacity of a channel's event bus.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;
/// Default upper bound for one encoded protocol frame body.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;
/// Default bound on how long `term()` waits for live pairs to finish.
pub const DEFAULT_TERM_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one channel endpoint (content or privileged side) and the actors
/// spawned on it.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
  /// Bounded capacity of each actor mailbox and of in-process transport queues. Min 1.
  pub mailbox_capacity: usize,
  /// Capacity of the broadcast bus carrying channel lifecycle events. Min 1.
  pub event_bus_capacity: usize,
  /// Largest accepted frame body on stream transports.
  pub max_frame_size: usize,
  /// How long `term()` waits for pairs to reach `Destroyed` before giving up.
  pub term_timeout: Duration,
  /// Privileged side only: construction requests beyond this many live widgets are
  /// answered with `ConstructFailed`. `None` means unlimited.
  pub max_live_widgets: Option<usize>,
}

impl Default for ChannelConfig {
  fn default() -> Self {
    Self {
      mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
      event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
      max_frame_size: DEFAULT_MAX_FRAME_SIZE,
      term_timeout: DEFAULT_TERM_TIMEOUT,
      max_live_widgets: None,
    }
  }
}

impl ChannelConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
    self.mailbox_capacity = capacity.max(1);
    self
  }

  pub fn with_event_bus_capacity(mut self, capacity: usize) -> Self {
    self.event_bus_capacity = capacity.max(1);
    self
  }

  pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
    self.max_frame_size = max_frame_size;
    self
  }

  pub fn with_term_timeout(mut self, timeout: Duration) -> Self {
    self.term_timeout = timeout;
    self
  }

  pub fn with_max_live_widgets(mut self, limit: Option<usize>) -> Self {
    self.max_live_widgets = limit;
    self
  }

  pub(crate) fn effective_mailbox_capacity(&self) -> usize {
    self.mailbox_capacity.max(1)
  }

  pub(crate) fn effective_event_bus_capacity(&self) -> usize {
    self.event_bus_capacity.max(1)
  }
}
