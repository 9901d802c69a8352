// src/content/proxy.rs

use crate::error::WidgetError;
use crate::lifecycle::{Lifecycle, PairState};
use crate::message::{DestroyReason, PairId, Rect};
use crate::runtime::{Command, MailboxSender, ReplySender};

use std::fmt;
use tokio::sync::{oneshot, watch};

/// Callbacks delivered to the client that owns a [`WidgetProxy`].
///
/// The proxy actor only keeps a weak reference to the listener. If the client
/// drops its last `Arc`, callbacks are skipped.
pub trait WidgetListener: Send + Sync {
  /// The privileged side created the native widget; the pair is live.
  fn on_created(&self, _pair: PairId) {}

  /// The pair reached `Destroyed`. Called exactly once per pair.
  fn on_destroyed(&self, pair: PairId, reason: DestroyReason);
}

/// Presentation state cached on the content side. Written only by the proxy actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxyState {
  /// Last geometry requested by the client, applied optimistically.
  pub geometry: Rect,
  pub visible: bool,
  pub lifecycle: Lifecycle,
}

/// Client handle to a remote native widget.
///
/// Operations only wait for the local proxy actor to accept them, never for the
/// privileged side. Once the pair is destroying or destroyed they succeed without
/// doing anything. Dropping the handle without calling [`WidgetProxy::destroy`]
/// tears the pair down with [`DestroyReason::Deletion`].
pub struct WidgetProxy {
  pair: PairId,
  user_tx: MailboxSender,
  state: watch::Receiver<ProxyState>,
}

impl WidgetProxy {
  pub(crate) fn new(pair: PairId, user_tx: MailboxSender, state: watch::Receiver<ProxyState>) -> Self {
    Self { pair, user_tx, state }
  }

  pub fn pair_id(&self) -> PairId {
    self.pair
  }

  pub fn geometry(&self) -> Rect {
    self.state.borrow().geometry
  }

  pub fn is_visible(&self) -> bool {
    self.state.borrow().visible
  }

  pub fn state(&self) -> PairState {
    self.state.borrow().lifecycle.state()
  }

  pub fn is_live(&self) -> bool {
    self.state.borrow().lifecycle.is_live()
  }

  /// Set once the pair is destroyed.
  pub fn destroy_reason(&self) -> Option<DestroyReason> {
    self.state.borrow().lifecycle.reason()
  }

  /// Moves and resizes the widget. Rejects negative or non-finite values.
  pub async fn set_geometry(&self, geometry: Rect) -> Result<(), WidgetError> {
    geometry.validate()?;
    self
      .request(|reply_tx| Command::UserSetGeometry { geometry, reply_tx })
      .await
  }

  pub async fn set_visible(&self, visible: bool) -> Result<(), WidgetError> {
    self
      .request(|reply_tx| Command::UserSetVisible { visible, reply_tx })
      .await
  }

  pub async fn set_focus(&self) -> Result<(), WidgetError> {
    self.request(|reply_tx| Command::UserSetFocus { reply_tx }).await
  }

  /// Requests teardown. The outcome arrives through `WidgetListener::on_destroyed`.
  /// Calling it again is a no-op.
  pub async fn destroy(&self) -> Result<(), WidgetError> {
    self.request(|reply_tx| Command::UserDestroy { reply_tx }).await
  }

  /// Waits until the pair is destroyed and returns the recorded reason.
  pub async fn wait_destroyed(&self) -> DestroyReason {
    let mut state = self.state.clone();
    loop {
      if let Some(reason) = state.borrow_and_update().lifecycle.reason() {
        return reason;
      }
      if state.changed().await.is_err() {
        // Actor gone without a recorded reason: it was dropped mid-flight.
        return state.borrow().lifecycle.reason().unwrap_or(DestroyReason::AbnormalShutdown);
      }
    }
  }

  async fn request<F>(&self, make_command: F) -> Result<(), WidgetError>
  where
    F: FnOnce(ReplySender) -> Command,
  {
    let (reply_tx, reply_rx) = oneshot::channel();
    if self.user_tx.send(make_command(reply_tx)).await.is_err() {
      // The actor already finished; the pair is destroyed.
      tracing::trace!(pair = %self.pair, "Proxy actor gone, operation is a no-op");
      return Ok(());
    }
    reply_rx.await.unwrap_or(Ok(()))
  }
}

impl fmt::Debug for WidgetProxy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = *self.state.borrow();
    f.debug_struct("WidgetProxy")
      .field("pair", &self.pair)
      .field("state", &state.lifecycle.state())
      .field("geometry", &state.geometry)
      .field("visible", &state.visible)
      .finish()
  }
}
