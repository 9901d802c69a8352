// src/context.rs

use crate::config::ChannelConfig;
use crate::error::WidgetError;
use crate::message::{DestroyReason, PairId};
use crate::protocol::{Envelope, WidgetMessage};
use crate::runtime::{ActorType, EventBus, PairRegistry, SystemEvent};
use crate::transport::{ChannelEnd, FaultSlot};

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Which process role a channel endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
  Content,
  Privileged,
}

/// Routes inbound envelopes to the actors of one channel endpoint.
#[async_trait]
pub(crate) trait InboundRouter: Send + Sync + 'static {
  async fn route(&self, envelope: Envelope);
}

/// State shared by every actor on one channel endpoint.
pub(crate) struct ContextInner {
  role: Role,
  config: ChannelConfig,
  /// Live pairs on this channel and their mailboxes.
  registry: PairRegistry,
  /// Channel-wide events the actors react to.
  control_bus: EventBus,
  /// Every event, actor start and stop included, for endpoint observers.
  monitor_bus: EventBus,
  outbound: async_channel::Sender<Envelope>,
  inbound: async_channel::Receiver<Envelope>,
  fault: FaultSlot,
  /// Set once `shutdown()` runs; never cleared.
  shutdown_initiated: AtomicBool,
  /// Set by the dispatcher before it publishes a peer-loss event.
  peer_lost: AtomicBool,
}

/// Cheap, cloneable handle to a channel endpoint's shared state.
#[derive(Clone)]
pub(crate) struct ActorContext {
  inner: Arc<ContextInner>,
}

impl ActorContext {
  pub(crate) fn new(role: Role, end: ChannelEnd, config: ChannelConfig) -> Self {
    let capacity = config.effective_event_bus_capacity();
    tracing::debug!(?role, "Creating widget channel context");
    Self {
      inner: Arc::new(ContextInner {
        role,
        config,
        registry: PairRegistry::new(),
        control_bus: EventBus::with_capacity(capacity),
        monitor_bus: EventBus::with_capacity(capacity),
        outbound: end.outbound,
        inbound: end.inbound,
        fault: end.fault,
        shutdown_initiated: AtomicBool::new(false),
        peer_lost: AtomicBool::new(false),
      }),
    }
  }

  pub(crate) fn config(&self) -> &ChannelConfig {
    &self.inner.config
  }

  pub(crate) fn registry(&self) -> &PairRegistry {
    &self.inner.registry
  }

  /// Channel-wide events only. Actors subscribe here, so one actor starting or
  /// stopping never wakes the others.
  pub(crate) fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
    self.inner.control_bus.subscribe()
  }

  /// Every event published on this endpoint.
  pub(crate) fn subscribe_monitor(&self) -> broadcast::Receiver<SystemEvent> {
    self.inner.monitor_bus.subscribe()
  }

  /// Publishes a channel-wide event to actors and observers. Returns false when no
  /// actor was subscribed.
  fn publish_channel_event(&self, event: SystemEvent) -> bool {
    let _ = self.inner.monitor_bus.publish(event.clone());
    self.inner.control_bus.publish(event).is_ok()
  }

  pub(crate) fn is_shutting_down(&self) -> bool {
    self.inner.shutdown_initiated.load(Ordering::Acquire)
  }

  pub(crate) fn is_peer_lost(&self) -> bool {
    self.inner.peer_lost.load(Ordering::Acquire)
  }

  /// Queues a message for the peer. Fails only when the channel is closed.
  pub(crate) async fn send_to_peer(&self, pair: PairId, msg: WidgetMessage) -> Result<(), WidgetError> {
    tracing::trace!(role = ?self.inner.role, %pair, msg = msg.variant_name(), "Sending to peer");
    self
      .inner
      .outbound
      .send(Envelope::new(pair, msg))
      .await
      .map_err(|_| WidgetError::ChannelClosed)
  }

  pub(crate) fn publish_actor_started(&self, pair: PairId, actor_type: ActorType) {
    // No subscribers just means nobody is watching; not an error.
    let _ = self.inner.monitor_bus.publish(SystemEvent::ActorStarted { pair, actor_type });
  }

  pub(crate) fn publish_actor_stopping(&self, pair: PairId, actor_type: ActorType, reason: DestroyReason) {
    let _ = self.inner.monitor_bus.publish(SystemEvent::ActorStopping {
      pair,
      actor_type,
      reason,
    });
  }

  /// Spawns the task that reads the inbound side of the channel and hands every
  /// envelope to `router`, in arrival order.
  pub(crate) fn spawn_dispatcher<R: InboundRouter>(&self, router: R) -> JoinHandle<()> {
    tokio::spawn(run_dispatcher(self.clone(), router))
  }

  /// Publishes `ChannelTerminating` once. Actors tear their pairs down in response.
  pub(crate) fn shutdown(&self) {
    if self
      .inner
      .shutdown_initiated
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      tracing::info!(role = ?self.inner.role, live = self.inner.registry.len(), "Widget channel shutdown initiated.");
      if !self.publish_channel_event(SystemEvent::ChannelTerminating) {
        tracing::debug!(role = ?self.inner.role, "No actors subscribed during shutdown.");
      }
    } else {
      tracing::debug!(role = ?self.inner.role, "Widget channel shutdown already initiated.");
    }
  }

  /// Shuts down, waits for every pair to reach `Destroyed`, then closes the channel.
  pub(crate) async fn term(&self) -> Result<(), WidgetError> {
    self.shutdown();
    let timeout = self.inner.config.term_timeout;
    let drained = tokio::time::timeout(timeout, self.inner.registry.wait_until_empty()).await;
    self.close_channel();
    match drained {
      Ok(()) => {
        tracing::info!(role = ?self.inner.role, "Widget channel termination complete.");
        Ok(())
      }
      Err(_) => {
        tracing::error!(
          role = ?self.inner.role,
          live = self.inner.registry.len(),
          ?timeout,
          "Widget channel termination timed out with pairs still live."
        );
        Err(WidgetError::Timeout)
      }
    }
  }

  /// Closes both directions with no handshake. Queued outbound envelopes are still
  /// delivered; the peer then observes a disconnect.
  pub(crate) fn close_channel(&self) {
    self.inner.outbound.close();
    self.inner.inbound.close();
  }
}

impl fmt::Debug for ActorContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ActorContext")
      .field("role", &self.inner.role)
      .field("live_pairs", &self.inner.registry.len())
      .field("shutdown_initiated", &self.is_shutting_down())
      .finish_non_exhaustive()
  }
}

async fn run_dispatcher<R: InboundRouter>(ctx: ActorContext, router: R) {
  let role = ctx.inner.role;
  tracing::debug!(?role, "Widget channel dispatcher started");
  let inbound = ctx.inner.inbound.clone();
  while let Ok(envelope) = inbound.recv().await {
    tracing::trace!(?role, pair = %envelope.pair, msg = envelope.msg.variant_name(), "Dispatching inbound message");
    router.route(envelope).await;
  }

  if ctx.is_shutting_down() {
    tracing::debug!(?role, "Widget channel dispatcher stopped after local shutdown");
    return;
  }

  // Flag first: actors that subscribe after the publish below still see the loss.
  ctx.inner.peer_lost.store(true, Ordering::Release);
  let event = match ctx.inner.fault.take() {
    Some(error_msg) => {
      tracing::warn!(?role, error = %error_msg, "Widget channel failed");
      SystemEvent::ChannelError { error_msg }
    }
    None => {
      tracing::info!(?role, "Widget channel peer disconnected");
      SystemEvent::PeerDisconnected
    }
  };
  ctx.inner.outbound.close();
  if !ctx.publish_channel_event(event) {
    tracing::debug!(?role, "No actors subscribed when the peer was lost");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transport::inproc;
  use tokio::sync::broadcast::error::TryRecvError;

  #[tokio::test]
  async fn actor_events_stay_off_the_control_bus() {
    let config = ChannelConfig::default();
    let (end, _peer) = inproc::pair(&config);
    let ctx = ActorContext::new(Role::Content, end, config);
    let mut control = ctx.subscribe();
    let mut monitor = ctx.subscribe_monitor();
    assert_eq!(ctx.inner.control_bus.subscriber_count(), 1);

    let pair = PairId::new(1);
    ctx.publish_actor_started(pair, ActorType::ProxyActor);
    ctx.publish_actor_stopping(pair, ActorType::ProxyActor, DestroyReason::Deletion);
    ctx.shutdown();

    assert!(matches!(control.try_recv(), Ok(SystemEvent::ChannelTerminating)));
    assert!(matches!(control.try_recv(), Err(TryRecvError::Empty)));

    assert!(matches!(monitor.try_recv(), Ok(SystemEvent::ActorStarted { .. })));
    assert!(matches!(monitor.try_recv(), Ok(SystemEvent::ActorStopping { .. })));
    assert!(matches!(monitor.try_recv(), Ok(SystemEvent::ChannelTerminating)));
    assert!(matches!(monitor.try_recv(), Err(TryRecvError::Empty)));
  }
}
