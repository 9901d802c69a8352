// src/privileged/actor.rs

use crate::context::ActorContext;
use crate::lifecycle::{Lifecycle, TeardownCause};
use crate::message::{DestroyReason, PairId, Rect};
use crate::privileged::backend::{NativeWidget, NativeWidgetBackend, WidgetOp};
use crate::protocol::{Direction, WidgetMessage};
use crate::runtime::{ActorDropGuard, ActorType, Command, MailboxReceiver, SystemEvent};

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Privileged-side half of an actor pair. Sole owner of one native widget.
pub(crate) struct WidgetActor {
  pair: PairId,
  context: ActorContext,
  mailbox: MailboxReceiver,
  events: broadcast::Receiver<SystemEvent>,
  backend: Arc<dyn NativeWidgetBackend>,
  widget: Option<NativeWidget>,
  lifecycle: Lifecycle,
  drop_guard: ActorDropGuard,
}

impl WidgetActor {
  /// Spawns the actor for a pair the host has already registered under `mailbox`.
  pub(crate) fn spawn(
    pair: PairId,
    context: ActorContext,
    mailbox: MailboxReceiver,
    backend: Arc<dyn NativeWidgetBackend>,
    geometry: Rect,
    visible: bool,
  ) -> JoinHandle<()> {
    // Subscribe before spawning so no channel event is missed.
    let events = context.subscribe();
    let drop_guard = ActorDropGuard::new(context.clone(), pair, ActorType::WidgetActor);
    let actor = WidgetActor {
      pair,
      context,
      mailbox,
      events,
      backend,
      widget: None,
      lifecycle: Lifecycle::new(),
      drop_guard,
    };
    tokio::spawn(actor.run_loop(geometry, visible))
  }

  async fn run_loop(mut self, geometry: Rect, visible: bool) {
    let pair = self.pair;
    tracing::info!(%pair, "WidgetActor started");
    self.context.publish_actor_started(pair, ActorType::WidgetActor);

    if !self.on_construct(geometry, visible).await {
      return;
    }

    loop {
      tokio::select! {
        biased;

        cmd_result = self.mailbox.recv() => {
          match cmd_result {
            Ok(Command::PeerMessage { msg }) => {
              if self.handle_peer_message(msg).await {
                break;
              }
            }
            Ok(other) => {
              tracing::warn!(%pair, command = other.variant_name(), "WidgetActor ignoring unexpected command");
            }
            Err(_) => {
              tracing::warn!(%pair, "WidgetActor mailbox closed unexpectedly");
              self.teardown(TeardownCause::PeerLost, false).await;
              break;
            }
          }
        }

        event_result = self.events.recv() => {
          let event = match event_result {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
              tracing::warn!(%pair, skipped, "WidgetActor lagged behind channel events");
              self.synthesize_missed_event()
            }
            Err(RecvError::Closed) => Some(SystemEvent::PeerDisconnected),
          };
          if let Some(event) = event {
            if self.handle_system_event(event).await {
              break;
            }
          }
        }
      }
    }
    tracing::info!(%pair, reason = ?self.lifecycle.reason(), "WidgetActor stopped");
  }

  /// Creates the native widget. Returns false when the pair ended instead.
  async fn on_construct(&mut self, geometry: Rect, visible: bool) -> bool {
    let pair = self.pair;
    if self.context.is_peer_lost() {
      tracing::debug!(%pair, "Peer already gone, skipping construction");
      self.finish(DestroyReason::AbnormalShutdown);
      return false;
    }
    if self.context.is_shutting_down() {
      tracing::debug!(%pair, "Host shutting down, refusing construction");
      let _ = self.context.send_to_peer(pair, WidgetMessage::ConstructFailed).await;
      self.finish(TeardownCause::ConstructionFailure.reason());
      return false;
    }

    match NativeWidget::create(self.backend.clone(), geometry, visible) {
      Ok(widget) => {
        tracing::debug!(%pair, handle = ?widget.handle(), "Native widget created");
        self.widget = Some(widget);
        if let Err(e) = self.lifecycle.mark_live() {
          tracing::error!(%pair, error = %e, "Invalid transition after construction");
        }
        if self.context.send_to_peer(pair, WidgetMessage::Created).await.is_err() {
          tracing::debug!(%pair, "Channel closed before Created could be sent");
          self.teardown(TeardownCause::PeerLost, false).await;
          return false;
        }
        true
      }
      Err(e) => {
        tracing::warn!(%pair, error = %e, "Native widget construction failed");
        if self.context.send_to_peer(pair, WidgetMessage::ConstructFailed).await.is_err() {
          tracing::debug!(%pair, "Channel closed before ConstructFailed could be sent");
        }
        self.finish(TeardownCause::ConstructionFailure.reason());
        false
      }
    }
  }

  /// Returns true once the pair is destroyed.
  async fn handle_peer_message(&mut self, msg: WidgetMessage) -> bool {
    let pair = self.pair;
    tracing::trace!(%pair, msg = msg.variant_name(), "WidgetActor received message");
    let op = match msg {
      WidgetMessage::SetGeometry { geometry } => WidgetOp::Geometry(geometry),
      WidgetMessage::SetVisible { visible } => WidgetOp::Visible(visible),
      WidgetMessage::SetFocus => WidgetOp::Focus,
      WidgetMessage::RequestDestroy => {
        self.teardown(TeardownCause::NormalTeardown, true).await;
        return true;
      }
      WidgetMessage::Construct { .. } => {
        tracing::warn!(%pair, "Duplicate Construct for an existing pair, ignoring");
        return false;
      }
      other => {
        debug_assert_eq!(other.direction(), Direction::ToContent);
        tracing::warn!(%pair, msg = other.variant_name(), "WidgetActor received a message meant for the content side");
        return false;
      }
    };

    let widget = match self.widget.as_ref() {
      Some(widget) => widget,
      None => return false,
    };
    match widget.apply(op) {
      Ok(()) => false,
      Err(e) => {
        tracing::warn!(%pair, ?op, error = %e, "Failed to apply widget operation, tearing pair down");
        self.teardown(TeardownCause::ApplyFailure, true).await;
        true
      }
    }
  }

  /// Returns true once the pair is destroyed.
  async fn handle_system_event(&mut self, event: SystemEvent) -> bool {
    match event {
      SystemEvent::ChannelTerminating => {
        tracing::debug!(pair = %self.pair, "Host terminating, destroying native widget");
        self.teardown(TeardownCause::NormalTeardown, true).await;
        true
      }
      event if event.is_peer_loss() => {
        tracing::debug!(pair = %self.pair, ?event, "Peer lost, destroying native widget");
        self.teardown(TeardownCause::PeerLost, false).await;
        true
      }
      _ => false,
    }
  }

  fn synthesize_missed_event(&self) -> Option<SystemEvent> {
    if self.context.is_peer_lost() {
      Some(SystemEvent::PeerDisconnected)
    } else if self.context.is_shutting_down() {
      Some(SystemEvent::ChannelTerminating)
    } else {
      None
    }
  }

  /// Releases the widget, optionally tells the content side, and finishes the pair.
  async fn teardown(&mut self, cause: TeardownCause, notify_peer: bool) {
    let reason = cause.reason();
    if self.lifecycle.is_live() {
      if let Err(e) = self.lifecycle.begin_destroy() {
        tracing::error!(pair = %self.pair, error = %e, "Invalid transition during teardown");
      }
    }
    self.release_widget();
    if notify_peer {
      if let Err(e) = self.context.send_to_peer(self.pair, WidgetMessage::Destroyed { reason }).await {
        tracing::debug!(pair = %self.pair, error = %e, "Could not report Destroyed to content side");
      }
    }
    self.finish(reason);
  }

  fn release_widget(&mut self) {
    if let Some(mut widget) = self.widget.take() {
      widget.release();
    }
  }

  /// Terminal hook. Safe to reach from any path; the widget is released at most once.
  fn finish(&mut self, reason: DestroyReason) {
    self.release_widget();
    if let Err(e) = self.lifecycle.terminate(reason) {
      tracing::error!(pair = %self.pair, error = %e, "Invalid transition to Destroyed");
    }
    tracing::debug!(pair = %self.pair, %reason, "Widget pair destroyed");
    self.context.registry().unregister(self.pair);
    self
      .context
      .publish_actor_stopping(self.pair, ActorType::WidgetActor, reason);
    self.drop_guard.waive();
  }
}
