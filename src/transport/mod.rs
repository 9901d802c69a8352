// src/transport/mod.rs

//! Ordered, reliable channels carrying [`Envelope`]s between the two processes.
//!
//! A transport hands out a [`ChannelEnd`]; the content side wraps one in a
//! `ContentChannel`, the privileged side in a `WidgetHost`.

pub mod inproc;
pub mod stream;

use crate::error::WidgetError;
use crate::protocol::Envelope;

use parking_lot::Mutex;
use std::sync::Arc;

/// First transport failure seen on a channel, kept so the dispatcher can tell a
/// channel error from a plain disconnect once the inbound queue closes.
#[derive(Debug, Clone, Default)]
pub(crate) struct FaultSlot(Arc<Mutex<Option<String>>>);

impl FaultSlot {
  pub(crate) fn record(&self, error_msg: String) {
    let mut slot = self.0.lock();
    if slot.is_none() {
      *slot = Some(error_msg);
    }
  }

  pub(crate) fn take(&self) -> Option<String> {
    self.0.lock().take()
  }
}

/// One endpoint of a widget channel.
///
/// Normally consumed by `ContentChannel::new` or `WidgetHost::new`. It can also be
/// driven directly, which is how a test plays the part of a remote process.
/// Dropping the end (or calling [`ChannelEnd::close`]) disconnects the peer.
#[derive(Debug)]
pub struct ChannelEnd {
  pub(crate) outbound: async_channel::Sender<Envelope>,
  pub(crate) inbound: async_channel::Receiver<Envelope>,
  pub(crate) fault: FaultSlot,
}

impl ChannelEnd {
  pub(crate) fn new(
    outbound: async_channel::Sender<Envelope>,
    inbound: async_channel::Receiver<Envelope>,
    fault: FaultSlot,
  ) -> Self {
    Self {
      outbound,
      inbound,
      fault,
    }
  }

  pub async fn send(&self, envelope: Envelope) -> Result<(), WidgetError> {
    self
      .outbound
      .send(envelope)
      .await
      .map_err(|_| WidgetError::ChannelClosed)
  }

  /// Waits for the next inbound envelope. Fails once the peer is gone and every
  /// queued envelope has been received.
  pub async fn recv(&self) -> Result<Envelope, WidgetError> {
    match self.inbound.recv().await {
      Ok(envelope) => Ok(envelope),
      Err(_) => match self.fault.take() {
        Some(error_msg) => Err(WidgetError::ProtocolViolation(error_msg)),
        None => Err(WidgetError::ChannelClosed),
      },
    }
  }

  pub fn try_recv(&self) -> Option<Envelope> {
    self.inbound.try_recv().ok()
  }

  /// Closes both directions without any teardown handshake.
  pub fn close(&self) {
    self.outbound.close();
    self.inbound.close();
  }

  pub fn is_closed(&self) -> bool {
    self.outbound.is_closed() && self.inbound.is_closed()
  }
}
