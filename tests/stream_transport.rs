// tests/stream_transport.rs

use plugwidget::transport::stream;
use plugwidget::{
  ChannelConfig, ContentChannel, DestroyReason, HeadlessBackend, SystemEvent, WidgetError, WidgetHost,
};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
mod common;

use common::{rect, RecordingListener};

#[tokio::test]
async fn test_full_pair_lifecycle_over_duplex() -> Result<(), WidgetError> {
  common::setup_tracing();
  let config = ChannelConfig::default();
  let (content_io, host_io) = tokio::io::duplex(4096);
  let backend = Arc::new(HeadlessBackend::new());
  let host = WidgetHost::new(stream::stream(host_io, &config), backend.clone(), config.clone());
  let content = ContentChannel::new(stream::stream(content_io, &config), config);
  let listener = RecordingListener::new();

  let proxy = content.create_widget_proxy(rect(0.0, 0.0, 800.0, 600.0), true, &listener)?;
  common::wait_until("pair to become live", || proxy.is_live()).await;
  proxy.set_geometry(rect(10.0, 10.0, 640.0, 480.0)).await?;
  proxy.set_visible(false).await?;
  proxy.destroy().await?;

  let reason = common::within("Destroyed", proxy.wait_destroyed()).await;
  assert_eq!(reason, DestroyReason::NormalShutdown);
  assert_eq!(backend.created_count(), 1);
  assert_eq!(backend.destroyed_count(), 1);
  common::wait_until("host to drop the pair", || host.live_widgets() == 0).await;
  Ok(())
}

#[tokio::test]
async fn test_dropped_stream_is_peer_loss() -> Result<(), WidgetError> {
  common::setup_tracing();
  let config = ChannelConfig::default();
  let (content_io, host_io) = tokio::io::duplex(4096);
  let backend = Arc::new(HeadlessBackend::new());
  let host = WidgetHost::new(stream::stream(host_io, &config), backend.clone(), config.clone());
  let content = ContentChannel::new(stream::stream(content_io, &config), config);
  let listener = RecordingListener::new();

  let proxy = content.create_widget_proxy(rect(0.0, 0.0, 10.0, 10.0), true, &listener)?;
  common::wait_until("pair to become live", || proxy.is_live()).await;

  host.disconnect();
  let reason = common::within("Destroyed", proxy.wait_destroyed()).await;
  assert_eq!(reason, DestroyReason::AbnormalShutdown);
  common::wait_until("native widget release", || backend.live_count() == 0).await;
  assert_eq!(backend.destroyed_count(), 1);
  Ok(())
}

#[tokio::test]
async fn test_corrupt_frame_is_channel_error() -> Result<(), WidgetError> {
  common::setup_tracing();
  let config = ChannelConfig::default();
  let (content_io, mut raw) = tokio::io::duplex(4096);
  let content = ContentChannel::new(stream::stream(content_io, &config), config);
  let mut events = content.events();
  let listener = RecordingListener::new();
  let proxy = content.create_widget_proxy(rect(0.0, 0.0, 10.0, 10.0), true, &listener)?;

  // Valid length prefix, then a body with an unknown message tag.
  let mut frame = Vec::new();
  frame.extend_from_slice(&9u32.to_be_bytes());
  frame.extend_from_slice(&proxy.pair_id().get().to_be_bytes());
  frame.push(0x7f);
  raw.write_all(&frame).await?;

  let reason = common::within("Destroyed", proxy.wait_destroyed()).await;
  assert_eq!(reason, DestroyReason::AbnormalShutdown);
  let event = common::within("channel error", async {
    loop {
      match events.recv().await {
        Ok(event @ SystemEvent::ChannelError { .. }) => break event,
        Ok(_) => continue,
        Err(e) => panic!("event bus error: {}", e),
      }
    }
  })
  .await;
  assert!(event.is_peer_loss());
  Ok(())
}
