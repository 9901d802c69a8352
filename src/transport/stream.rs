// src/transport/stream.rs

use crate::config::ChannelConfig;
use crate::protocol::{Envelope, WidgetCodec};
use crate::transport::{ChannelEnd, FaultSlot};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};

/// Runs the widget protocol over a byte stream (Unix socket, TCP, pipe, duplex).
///
/// Spawns one reader and one writer task. End of stream is reported to the owner as
/// a peer disconnect; an I/O or framing error as a channel error. Closing the
/// returned end flushes pending frames and shuts the write half down.
pub fn stream<IO>(io: IO, config: &ChannelConfig) -> ChannelEnd
where
  IO: AsyncRead + AsyncWrite + Send + 'static,
{
  let capacity = config.effective_mailbox_capacity();
  let (outbound_tx, outbound_rx) = async_channel::bounded::<Envelope>(capacity);
  let (inbound_tx, inbound_rx) = async_channel::bounded::<Envelope>(capacity);
  let fault = FaultSlot::default();

  let (read_half, write_half) = tokio::io::split(io);
  let frames = FramedRead::new(read_half, WidgetCodec::with_max_frame_size(config.max_frame_size));
  let sink = FramedWrite::new(write_half, WidgetCodec::with_max_frame_size(config.max_frame_size));

  tokio::spawn(run_writer(sink, outbound_rx.clone(), inbound_tx.clone(), fault.clone()));
  tokio::spawn(run_reader(frames, inbound_tx, outbound_rx, fault.clone()));
  tracing::debug!(capacity, max_frame_size = config.max_frame_size, "Started stream widget transport");

  ChannelEnd::new(outbound_tx, inbound_rx, fault)
}

async fn run_writer<W>(
  mut sink: FramedWrite<W, WidgetCodec>,
  outbound: async_channel::Receiver<Envelope>,
  inbound_tx: async_channel::Sender<Envelope>,
  fault: FaultSlot,
) where
  W: AsyncWrite + Unpin,
{
  while let Ok(envelope) = outbound.recv().await {
    let pair = envelope.pair;
    if let Err(e) = sink.send(envelope).await {
      if e.is_disconnect() {
        tracing::debug!(%pair, error = %e, "Stream peer went away, closing channel");
      } else {
        tracing::warn!(%pair, error = %e, "Stream transport write failed, closing channel");
      }
      fault.record(e.to_string());
      inbound_tx.close();
      outbound.close();
      return;
    }
  }
  tracing::debug!("Outbound queue closed, shutting down stream write half");
  if let Err(e) = sink.close().await {
    tracing::debug!(error = %e, "Error while closing stream write half");
  }
}

async fn run_reader<R>(
  mut frames: FramedRead<R, WidgetCodec>,
  inbound_tx: async_channel::Sender<Envelope>,
  outbound: async_channel::Receiver<Envelope>,
  fault: FaultSlot,
) where
  R: AsyncRead + Unpin,
{
  loop {
    match frames.next().await {
      Some(Ok(envelope)) => {
        if inbound_tx.send(envelope).await.is_err() {
          tracing::debug!("Inbound queue closed locally, stopping stream reader");
          break;
        }
      }
      Some(Err(e)) if e.is_disconnect() => {
        tracing::debug!(error = %e, "Stream peer went away mid-frame");
        break;
      }
      Some(Err(e)) => {
        tracing::warn!(error = %e, "Stream transport read failed");
        fault.record(e.to_string());
        break;
      }
      None => {
        tracing::debug!("Stream transport reached end of stream");
        break;
      }
    }
  }
  inbound_tx.close();
  // Nobody is left to read what we would send.
  outbound.close();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::WidgetError;
  use crate::message::{PairId, Rect};
  use crate::protocol::WidgetMessage;
  use tokio::io::AsyncWriteExt;

  #[tokio::test]
  async fn carries_envelopes_both_ways() {
    let config = ChannelConfig::default();
    let (left, right) = tokio::io::duplex(1024);
    let left = stream(left, &config);
    let right = stream(right, &config);

    let construct = Envelope::new(
      PairId::new(1),
      WidgetMessage::Construct {
        geometry: Rect::new(0.0, 0.0, 800.0, 600.0),
        visible: true,
      },
    );
    left.send(construct.clone()).await.unwrap();
    assert_eq!(right.recv().await.unwrap(), construct);

    right.send(Envelope::new(PairId::new(1), WidgetMessage::Created)).await.unwrap();
    assert_eq!(left.recv().await.unwrap().msg, WidgetMessage::Created);

    left.close();
    assert!(matches!(right.recv().await, Err(WidgetError::ChannelClosed)));
  }

  #[tokio::test]
  async fn garbage_on_the_wire_is_a_channel_error() {
    let (mut raw, io) = tokio::io::duplex(1024);
    let end = stream(io, &ChannelConfig::default());
    // Length prefix far above the default frame limit.
    raw.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

    assert!(matches!(end.recv().await, Err(WidgetError::ProtocolViolation(_))));
  }
}
