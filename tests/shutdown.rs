// tests/shutdown.rs

use plugwidget::{ChannelConfig, DestroyReason, PairState, SystemEvent, WidgetError};
use std::time::Duration;
mod common;

use common::{rect, RecordingListener};

#[tokio::test]
async fn test_content_shutdown_reports_ancestor_deletion() -> Result<(), WidgetError> {
  let (content, host, backend) = common::inproc_setup(ChannelConfig::default());
  let listener = RecordingListener::new();
  let live = content.create_widget_proxy(rect(0.0, 0.0, 10.0, 10.0), true, &listener)?;
  common::wait_until("pair to become live", || live.is_live()).await;

  content.shutdown();
  let reason = common::within("Destroyed", live.wait_destroyed()).await;
  assert_eq!(reason, DestroyReason::AncestorDeletion);
  assert_eq!(live.state(), PairState::Destroyed);

  // The privileged side still gets a RequestDestroy and releases the widget.
  common::wait_until("native widget release", || backend.destroyed_count() == 1).await;
  common::wait_until("host to drop the pair", || host.live_widgets() == 0).await;

  let err = content
    .create_widget_proxy(rect(0.0, 0.0, 10.0, 10.0), true, &listener)
    .unwrap_err();
  assert!(matches!(err, WidgetError::InvalidState(_)));
  Ok(())
}

#[tokio::test]
async fn test_content_term_waits_for_proxies() -> Result<(), WidgetError> {
  let (content, host, backend) = common::inproc_setup(ChannelConfig::default());
  let mut host_events = host.events();
  let listener = RecordingListener::new();
  let proxies = vec![
    content.create_widget_proxy(rect(0.0, 0.0, 10.0, 10.0), true, &listener)?,
    content.create_widget_proxy(rect(0.0, 0.0, 20.0, 20.0), false, &listener)?,
  ];
  for proxy in &proxies {
    common::wait_until("pair to become live", || proxy.is_live()).await;
  }

  common::within("content term", content.term()).await?;
  assert_eq!(content.live_proxies(), 0);
  for proxy in &proxies {
    assert_eq!(proxy.destroy_reason(), Some(DestroyReason::AncestorDeletion));
  }
  assert_eq!(listener.destroyed().len(), 2);

  // Closing the channel after term is seen by the host as its peer going away.
  common::within("host peer loss", async {
    loop {
      match host_events.recv().await {
        Ok(SystemEvent::PeerDisconnected) => break,
        Ok(_) => continue,
        Err(e) => panic!("event bus error: {}", e),
      }
    }
  })
  .await;
  common::wait_until("native widgets released", || backend.live_count() == 0).await;
  assert_eq!(backend.destroyed_count(), 2);
  Ok(())
}

#[tokio::test]
async fn test_shutdown_is_idempotent() -> Result<(), WidgetError> {
  let (content, _host, _backend) = common::inproc_setup(ChannelConfig::default());
  let listener = RecordingListener::new();
  let proxy = content.create_widget_proxy(rect(0.0, 0.0, 10.0, 10.0), true, &listener)?;
  common::wait_until("pair to become live", || proxy.is_live()).await;

  content.shutdown();
  content.shutdown();
  common::within("content term", content.term()).await?;
  assert!(content.is_shutting_down());
  assert_eq!(listener.destroyed(), vec![(proxy.pair_id(), DestroyReason::AncestorDeletion)]);
  Ok(())
}

#[tokio::test]
async fn test_term_with_no_pairs_returns_immediately() -> Result<(), WidgetError> {
  let config = ChannelConfig::default().with_term_timeout(Duration::from_millis(100));
  let (content, host, _backend) = common::inproc_setup(config);
  common::within("content term", content.term()).await?;
  common::within("host term", host.term()).await?;
  Ok(())
}
