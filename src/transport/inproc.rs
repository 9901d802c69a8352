// src/transport/inproc.rs

use crate::config::ChannelConfig;
use crate::transport::{ChannelEnd, FaultSlot};

/// Creates two cross-connected channel ends living in the same process.
///
/// Each direction is a bounded `async-channel` queue of `mailbox_capacity`
/// envelopes, so ordering and backpressure match the stream transport. Dropping
/// one end closes the other's inbound queue once it has been drained.
pub fn pair(config: &ChannelConfig) -> (ChannelEnd, ChannelEnd) {
  let capacity = config.effective_mailbox_capacity();
  let (a_to_b_tx, a_to_b_rx) = async_channel::bounded(capacity);
  let (b_to_a_tx, b_to_a_rx) = async_channel::bounded(capacity);
  tracing::debug!(capacity, "Created inproc widget channel pair");
  (
    ChannelEnd::new(a_to_b_tx, b_to_a_rx, FaultSlot::default()),
    ChannelEnd::new(b_to_a_tx, a_to_b_rx, FaultSlot::default()),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::WidgetError;
  use crate::message::PairId;
  use crate::protocol::{Envelope, WidgetMessage};

  #[tokio::test]
  async fn delivers_in_order_then_reports_disconnect() {
    let (a, b) = pair(&ChannelConfig::default());
    for msg in [WidgetMessage::SetFocus, WidgetMessage::RequestDestroy] {
      a.send(Envelope::new(PairId::new(1), msg)).await.unwrap();
    }
    drop(a);

    assert_eq!(b.recv().await.unwrap().msg, WidgetMessage::SetFocus);
    assert_eq!(b.recv().await.unwrap().msg, WidgetMessage::RequestDestroy);
    assert!(matches!(b.recv().await, Err(WidgetError::ChannelClosed)));
    assert!(matches!(
      b.send(Envelope::new(PairId::new(1), WidgetMessage::Created)).await,
      Err(WidgetError::ChannelClosed)
    ));
  }
}
