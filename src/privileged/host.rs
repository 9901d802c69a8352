// src/privileged/host.rs

use crate::config::ChannelConfig;
use crate::context::{ActorContext, InboundRouter, Role};
use crate::error::WidgetError;
use crate::message::{PairId, Rect};
use crate::privileged::actor::WidgetActor;
use crate::privileged::backend::NativeWidgetBackend;
use crate::protocol::{Direction, Envelope, WidgetMessage};
use crate::runtime::{mailbox, Command, SystemEvent};
use crate::transport::ChannelEnd;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Privileged-side endpoint of a widget channel.
///
/// Accepts construction requests from the content process, spawns one
/// [`WidgetActor`] per accepted pair and routes later messages to it. The host must
/// be created inside a tokio runtime.
pub struct WidgetHost {
  context: ActorContext,
}

impl WidgetHost {
  pub fn new(end: ChannelEnd, backend: Arc<dyn NativeWidgetBackend>, config: ChannelConfig) -> Self {
    let context = ActorContext::new(Role::Privileged, end, config);
    let router = HostRouter {
      context: context.clone(),
      backend,
    };
    context.spawn_dispatcher(router);
    tracing::info!("Widget host started");
    Self { context }
  }

  /// Number of pairs that have not yet reached `Destroyed`.
  pub fn live_widgets(&self) -> usize {
    self.context.registry().len()
  }

  /// Subscribes to this endpoint's channel and actor lifecycle events.
  pub fn events(&self) -> broadcast::Receiver<SystemEvent> {
    self.context.subscribe_monitor()
  }

  pub fn is_shutting_down(&self) -> bool {
    self.context.is_shutting_down()
  }

  /// Starts a graceful shutdown: every live widget is destroyed and reported to the
  /// content side as `Destroyed(NormalShutdown)`. New constructions are refused.
  pub fn shutdown(&self) {
    self.context.shutdown();
  }

  /// Shuts down, waits for every widget actor to finish, then closes the channel.
  pub async fn term(&self) -> Result<(), WidgetError> {
    self.context.term().await
  }

  /// Drops the channel without any teardown handshake, the way a crash would.
  /// Widget actors still release their native widgets.
  pub fn disconnect(&self) {
    tracing::warn!("Widget host disconnecting abruptly");
    self.context.close_channel();
  }
}

impl fmt::Debug for WidgetHost {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WidgetHost").field("context", &self.context).finish()
  }
}

struct HostRouter {
  context: ActorContext,
  backend: Arc<dyn NativeWidgetBackend>,
}

impl HostRouter {
  async fn on_construct(&self, pair: PairId, geometry: Rect, visible: bool) {
    if let Some(reason) = self.rejection_reason() {
      tracing::info!(%pair, reason, "Refusing widget construction");
      if let Err(e) = self.context.send_to_peer(pair, WidgetMessage::ConstructFailed).await {
        tracing::debug!(%pair, error = %e, "Could not send ConstructFailed");
      }
      return;
    }

    let (tx, rx) = mailbox(self.context.config().effective_mailbox_capacity());
    if let Err(e) = self.context.registry().register(pair, tx) {
      tracing::warn!(%pair, error = %e, "Refusing Construct for a reused pair id");
      if let Err(e) = self.context.send_to_peer(pair, WidgetMessage::ConstructFailed).await {
        tracing::debug!(%pair, error = %e, "Could not send ConstructFailed");
      }
      return;
    }
    WidgetActor::spawn(pair, self.context.clone(), rx, self.backend.clone(), geometry, visible);
  }

  fn rejection_reason(&self) -> Option<&'static str> {
    if self.context.is_shutting_down() {
      return Some("host is shutting down");
    }
    match self.context.config().max_live_widgets {
      Some(limit) if self.context.registry().len() >= limit => Some("live widget limit reached"),
      _ => None,
    }
  }
}

#[async_trait]
impl InboundRouter for HostRouter {
  async fn route(&self, envelope: Envelope) {
    let Envelope { pair, msg } = envelope;
    if msg.direction() != Direction::ToPrivileged {
      tracing::warn!(%pair, msg = msg.variant_name(), "Widget host dropping message meant for the content side");
      return;
    }
    if let WidgetMessage::Construct { geometry, visible } = msg {
      if !self.context.registry().contains(pair) {
        self.on_construct(pair, geometry, visible).await;
        return;
      }
    }

    match self.context.registry().get(pair) {
      Some(actor_mailbox) => {
        if actor_mailbox.send(Command::PeerMessage { msg }).await.is_err() {
          tracing::trace!(%pair, "Widget actor finished before message could be delivered");
        }
      }
      None => {
        tracing::trace!(%pair, msg = msg.variant_name(), "Dropping message for unknown or finished pair");
      }
    }
  }
}
