// src/content/mod.rs

//! The content process side: widget proxies and the channel that carries them.

pub(crate) mod actor;
pub mod proxy;

pub use proxy::{ProxyState, WidgetListener, WidgetProxy};

use crate::config::ChannelConfig;
use crate::context::{ActorContext, InboundRouter, Role};
use crate::error::WidgetError;
use crate::message::Rect;
use crate::protocol::{Direction, Envelope};
use crate::runtime::{Command, SystemEvent};
use crate::transport::ChannelEnd;
use actor::ProxyActor;

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// Content-side endpoint of a widget channel. Creates [`WidgetProxy`]s and routes
/// the privileged side's notifications to their actors.
///
/// Must be created inside a tokio runtime.
pub struct ContentChannel {
  context: ActorContext,
}

impl ContentChannel {
  pub fn new(end: ChannelEnd, config: ChannelConfig) -> Self {
    let context = ActorContext::new(Role::Content, end, config);
    context.spawn_dispatcher(ContentRouter {
      context: context.clone(),
    });
    tracing::info!("Content widget channel started");
    Self { context }
  }

  /// Requests a new native widget and returns its proxy right away.
  ///
  /// Only an invalid geometry or a channel that is shutting down fail here. Whether
  /// construction succeeded is reported later through `listener`.
  pub fn create_widget_proxy<L>(
    &self,
    geometry: Rect,
    visible: bool,
    listener: &Arc<L>,
  ) -> Result<WidgetProxy, WidgetError>
  where
    L: WidgetListener + 'static,
  {
    geometry.validate()?;
    if self.context.is_shutting_down() {
      return Err(WidgetError::InvalidState("content channel is shutting down"));
    }
    let weak: Weak<dyn WidgetListener> = Arc::downgrade(listener) as Weak<dyn WidgetListener>;
    let proxy = ProxyActor::spawn(self.context.clone(), geometry, visible, weak);
    tracing::debug!(pair = %proxy.pair_id(), %geometry, visible, "Widget proxy created");
    Ok(proxy)
  }

  /// Number of proxies whose pair has not yet reached `Destroyed`.
  pub fn live_proxies(&self) -> usize {
    self.context.registry().len()
  }

  /// Subscribes to this endpoint's channel and actor lifecycle events.
  pub fn events(&self) -> broadcast::Receiver<SystemEvent> {
    self.context.subscribe_monitor()
  }

  pub fn is_shutting_down(&self) -> bool {
    self.context.is_shutting_down()
  }

  /// Tears every pair down with [`DestroyReason::AncestorDeletion`](crate::DestroyReason)
  /// and refuses new proxies.
  pub fn shutdown(&self) {
    self.context.shutdown();
  }

  /// Shuts down, waits for every proxy actor to finish, then closes the channel.
  pub async fn term(&self) -> Result<(), WidgetError> {
    self.context.term().await
  }

  /// Drops the channel without any teardown handshake, the way a crash would.
  pub fn disconnect(&self) {
    tracing::warn!("Content widget channel disconnecting abruptly");
    self.context.close_channel();
  }
}

impl fmt::Debug for ContentChannel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContentChannel").field("context", &self.context).finish()
  }
}

struct ContentRouter {
  context: ActorContext,
}

#[async_trait]
impl InboundRouter for ContentRouter {
  async fn route(&self, envelope: Envelope) {
    let Envelope { pair, msg } = envelope;
    if msg.direction() != Direction::ToContent {
      tracing::warn!(%pair, msg = msg.variant_name(), "Content channel dropping message meant for the privileged side");
      return;
    }
    match self.context.registry().get(pair) {
      Some(actor_mailbox) => {
        if actor_mailbox.send(Command::PeerMessage { msg }).await.is_err() {
          tracing::trace!(%pair, "Proxy actor finished before message could be delivered");
        }
      }
      None => {
        tracing::trace!(%pair, msg = msg.variant_name(), "Dropping message for unknown or finished pair");
      }
    }
  }
}
