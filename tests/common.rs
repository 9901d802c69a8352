// tests/common.rs
#![allow(dead_code)] // Each test binary uses a different subset

use plugwidget::{
  inproc_channel, ChannelConfig, ContentChannel, DestroyReason, HeadlessBackend, PairId, Rect, WidgetHost,
  WidgetListener,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Once};
use std::time::Duration;

pub const STEP: Duration = Duration::from_millis(5);
pub const WAIT: Duration = Duration::from_secs(2);

static TRACING_INIT: Once = Once::new();

pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    // RUST_LOG overrides the default filter.
    let default_filter = "plugwidget=debug,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE)
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_test_writer()
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
  Rect::new(x, y, w, h)
}

/// Content channel and widget host joined in-process over a headless backend.
pub fn inproc_setup(config: ChannelConfig) -> (ContentChannel, WidgetHost, Arc<HeadlessBackend>) {
  setup_tracing();
  let backend = Arc::new(HeadlessBackend::new());
  let (content, host) = inproc_channel(backend.clone(), config);
  (content, host, backend)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
  Created(PairId),
  Destroyed(PairId, DestroyReason),
}

/// Listener that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
  calls: Mutex<Vec<Callback>>,
}

impl RecordingListener {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn calls(&self) -> Vec<Callback> {
    self.calls.lock().clone()
  }

  pub fn destroyed(&self) -> Vec<(PairId, DestroyReason)> {
    self
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Callback::Destroyed(pair, reason) => Some((pair, reason)),
        Callback::Created(_) => None,
      })
      .collect()
  }

  pub fn created(&self) -> Vec<PairId> {
    self
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Callback::Created(pair) => Some(pair),
        Callback::Destroyed(..) => None,
      })
      .collect()
  }
}

impl WidgetListener for RecordingListener {
  fn on_created(&self, pair: PairId) {
    self.calls.lock().push(Callback::Created(pair));
  }

  fn on_destroyed(&self, pair: PairId, reason: DestroyReason) {
    self.calls.lock().push(Callback::Destroyed(pair, reason));
  }
}

/// Polls `condition` until it holds, panicking after [`WAIT`].
pub async fn wait_until<F>(what: &str, mut condition: F)
where
  F: FnMut() -> bool,
{
  let deadline = tokio::time::Instant::now() + WAIT;
  while !condition() {
    if tokio::time::Instant::now() >= deadline {
      panic!("timed out waiting for {}", what);
    }
    tokio::time::sleep(STEP).await;
  }
}

/// Awaits `fut`, panicking after [`WAIT`].
pub async fn within<F: Future>(what: &str, fut: F) -> F::Output {
  match tokio::time::timeout(WAIT, fut).await {
    Ok(out) => out,
    Err(_) => panic!("timed out waiting for {}", what),
  }
}

/// Gives spawned actors a chance to run when nothing observable is expected.
pub async fn settle() {
  tokio::time::sleep(Duration::from_millis(50)).await;
}
