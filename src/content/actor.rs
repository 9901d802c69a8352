// src/content/actor.rs

use crate::content::proxy::{ProxyState, WidgetListener, WidgetProxy};
use crate::context::ActorContext;
use crate::lifecycle::{Lifecycle, PairState, TeardownCause};
use crate::message::{DestroyReason, PairId, Rect};
use crate::protocol::{Direction, WidgetMessage};
use crate::runtime::{mailbox, ActorDropGuard, ActorType, Command, MailboxReceiver, ReplySender, SystemEvent};

use std::sync::Weak;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;

/// Content-side half of an actor pair.
///
/// Owns no native resource: it turns client operations into protocol messages and
/// folds the privileged side's notifications into the cached [`ProxyState`].
pub(crate) struct ProxyActor {
  pair: PairId,
  context: ActorContext,
  /// Protocol traffic routed here by the channel dispatcher.
  peer_mailbox: MailboxReceiver,
  /// Client operations. Closes when the `WidgetProxy` is dropped.
  user_mailbox: MailboxReceiver,
  user_open: bool,
  events: broadcast::Receiver<SystemEvent>,
  state: ProxyState,
  state_tx: watch::Sender<ProxyState>,
  listener: Option<Weak<dyn WidgetListener>>,
  /// Reason to record once a locally started teardown completes.
  pending_reason: Option<DestroyReason>,
  drop_guard: ActorDropGuard,
}

impl ProxyActor {
  /// Registers a new pair, spawns its actor and returns the client handle.
  pub(crate) fn spawn(
    context: ActorContext,
    geometry: Rect,
    visible: bool,
    listener: Weak<dyn WidgetListener>,
  ) -> WidgetProxy {
    let capacity = context.config().effective_mailbox_capacity();
    let (peer_tx, peer_mailbox) = mailbox(capacity);
    let (user_tx, user_mailbox) = mailbox(capacity);
    let pair = context.registry().register_new(peer_tx);
    let events = context.subscribe();

    let state = ProxyState {
      geometry,
      visible,
      lifecycle: Lifecycle::new(),
    };
    let (state_tx, state_rx) = watch::channel(state);
    let drop_guard = ActorDropGuard::new(context.clone(), pair, ActorType::ProxyActor);

    let actor = ProxyActor {
      pair,
      context,
      peer_mailbox,
      user_mailbox,
      user_open: true,
      events,
      state,
      state_tx,
      listener: Some(listener),
      pending_reason: None,
      drop_guard,
    };
    tokio::spawn(actor.run_loop());
    WidgetProxy::new(pair, user_tx, state_rx)
  }

  async fn run_loop(mut self) {
    let pair = self.pair;
    tracing::info!(%pair, "ProxyActor started");
    self.context.publish_actor_started(pair, ActorType::ProxyActor);

    if !self.send_construct().await {
      return;
    }

    loop {
      let done = tokio::select! {
        // Peer traffic first: a notification already queued wins over a
        // disconnect observed afterwards.
        biased;

        cmd_result = self.peer_mailbox.recv() => {
          match cmd_result {
            Ok(Command::PeerMessage { msg }) => self.on_peer_message(msg),
            Ok(other) => {
              tracing::warn!(%pair, command = other.variant_name(), "ProxyActor got a user command on its peer mailbox");
              false
            }
            Err(_) => {
              self.finish(TeardownCause::PeerLost.reason());
              true
            }
          }
        }

        cmd_result = self.user_mailbox.recv(), if self.user_open => {
          match cmd_result {
            Ok(command) => self.on_user_command(command).await,
            Err(_) => {
              self.user_open = false;
              self.on_released().await
            }
          }
        }

        event_result = self.events.recv() => {
          let event = match event_result {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
              tracing::warn!(%pair, skipped, "ProxyActor lagged behind channel events");
              self.synthesize_missed_event()
            }
            Err(RecvError::Closed) => Some(SystemEvent::PeerDisconnected),
          };
          match event {
            Some(event) => self.on_system_event(event).await,
            None => false,
          }
        }
      };
      if done {
        break;
      }
    }
    tracing::info!(%pair, reason = ?self.state.lifecycle.reason(), "ProxyActor stopped");
  }

  /// Sends the construction request. Returns false when the pair ended instead.
  async fn send_construct(&mut self) -> bool {
    let pair = self.pair;
    if self.context.is_shutting_down() {
      tracing::debug!(%pair, "Channel shutting down before construction");
      self.finish(TeardownCause::AncestorTeardown.reason());
      return false;
    }
    let construct = WidgetMessage::Construct {
      geometry: self.state.geometry,
      visible: self.state.visible,
    };
    // A dead channel is peer loss, not a refused construction.
    if self.context.is_peer_lost() || self.context.send_to_peer(pair, construct).await.is_err() {
      tracing::debug!(%pair, "Construct could not reach the privileged side");
      self.finish(TeardownCause::PeerLost.reason());
      return false;
    }
    true
  }

  /// Returns true once the pair is destroyed.
  fn on_peer_message(&mut self, msg: WidgetMessage) -> bool {
    let pair = self.pair;
    let state = self.state.lifecycle.state();
    tracing::trace!(%pair, msg = msg.variant_name(), state = state.as_str(), "ProxyActor received message");
    match msg {
      WidgetMessage::Created => {
        match state {
          PairState::Constructing => {
            if let Err(e) = self.state.lifecycle.mark_live() {
              tracing::error!(%pair, error = %e, "Invalid transition on Created");
              return false;
            }
            self.publish_state();
            tracing::debug!(%pair, "Widget pair live");
            if let Some(listener) = self.listener.as_ref().and_then(Weak::upgrade) {
              listener.on_created(pair);
            }
          }
          PairState::Destroying => {
            tracing::trace!(%pair, "Ignoring Created while destroying");
          }
          _ => tracing::warn!(%pair, state = state.as_str(), "Unexpected Created"),
        }
        false
      }
      WidgetMessage::ConstructFailed => {
        if state == PairState::Live {
          tracing::warn!(%pair, "ConstructFailed for a live pair, ignoring");
          return false;
        }
        let reason = self
          .pending_reason
          .unwrap_or(TeardownCause::ConstructionFailure.reason());
        self.finish(reason);
        true
      }
      WidgetMessage::Destroyed { reason } => {
        // The locally detected cause wins once teardown was started here.
        let reason = self.pending_reason.unwrap_or(reason);
        self.finish(reason);
        true
      }
      other => {
        debug_assert_eq!(other.direction(), Direction::ToPrivileged);
        tracing::warn!(%pair, msg = other.variant_name(), "ProxyActor received a message meant for the privileged side");
        false
      }
    }
  }

  /// Returns true once the pair is destroyed.
  async fn on_user_command(&mut self, command: Command) -> bool {
    let pair = self.pair;
    tracing::trace!(%pair, command = command.variant_name(), "ProxyActor received user command");
    match command {
      Command::UserSetGeometry { geometry, reply_tx } => {
        let done = self
          .forward_operation(WidgetMessage::SetGeometry { geometry }, |s| s.geometry = geometry)
          .await;
        reply(reply_tx);
        done
      }
      Command::UserSetVisible { visible, reply_tx } => {
        let done = self
          .forward_operation(WidgetMessage::SetVisible { visible }, |s| s.visible = visible)
          .await;
        reply(reply_tx);
        done
      }
      Command::UserSetFocus { reply_tx } => {
        let done = self.forward_operation(WidgetMessage::SetFocus, |_| {}).await;
        reply(reply_tx);
        done
      }
      Command::UserDestroy { reply_tx } => {
        let done = self.begin_destroy(TeardownCause::NormalTeardown).await;
        reply(reply_tx);
        done
      }
      Command::PeerMessage { msg } => {
        tracing::warn!(%pair, msg = msg.variant_name(), "ProxyActor got peer traffic on its user mailbox");
        false
      }
    }
  }

  /// Caches the change and sends it on. A no-op unless Constructing or Live.
  async fn forward_operation<F>(&mut self, msg: WidgetMessage, update: F) -> bool
  where
    F: FnOnce(&mut ProxyState),
  {
    if !self.state.lifecycle.accepts_operations() {
      tracing::trace!(pair = %self.pair, msg = msg.variant_name(), "Pair is tearing down, dropping operation");
      return false;
    }
    update(&mut self.state);
    self.publish_state();
    if self.context.send_to_peer(self.pair, msg).await.is_err() {
      self.finish(TeardownCause::PeerLost.reason());
      return true;
    }
    false
  }

  /// Moves to Destroying and asks the privileged side to tear down.
  async fn begin_destroy(&mut self, cause: TeardownCause) -> bool {
    let pair = self.pair;
    if !self.state.lifecycle.accepts_operations() {
      tracing::debug!(%pair, "Destroy requested again, ignoring");
      return false;
    }
    if let Err(e) = self.state.lifecycle.begin_destroy() {
      tracing::error!(%pair, error = %e, "Invalid transition on destroy");
      return false;
    }
    self.pending_reason = Some(cause.reason());
    self.publish_state();
    tracing::debug!(%pair, ?cause, "Widget pair destroying");
    if self.context.send_to_peer(pair, WidgetMessage::RequestDestroy).await.is_err() {
      self.finish(TeardownCause::PeerLost.reason());
      return true;
    }
    false
  }

  /// The client dropped its handle.
  async fn on_released(&mut self) -> bool {
    if !self.state.lifecycle.accepts_operations() {
      // Teardown already under way; keep waiting for the peer's answer.
      return false;
    }
    tracing::debug!(pair = %self.pair, "WidgetProxy released without destroy");
    self.finish_with_request(TeardownCause::Released).await;
    true
  }

  /// Returns true once the pair is destroyed.
  async fn on_system_event(&mut self, event: SystemEvent) -> bool {
    match event {
      SystemEvent::ChannelTerminating => {
        if self.state.lifecycle.accepts_operations() {
          self.finish_with_request(TeardownCause::AncestorTeardown).await;
        } else {
          let reason = self
            .pending_reason
            .unwrap_or(TeardownCause::AncestorTeardown.reason());
          self.finish(reason);
        }
        true
      }
      event if event.is_peer_loss() => {
        tracing::debug!(pair = %self.pair, ?event, "Peer lost");
        // Anything the peer sent before going away is still honoured.
        while let Ok(command) = self.peer_mailbox.try_recv() {
          if let Command::PeerMessage { msg } = command {
            if self.on_peer_message(msg) {
              return true;
            }
          }
        }
        self.finish(TeardownCause::PeerLost.reason());
        true
      }
      _ => false,
    }
  }

  /// Best-effort `RequestDestroy`, then finish locally without waiting for an answer.
  async fn finish_with_request(&mut self, cause: TeardownCause) {
    if let Err(e) = self.context.send_to_peer(self.pair, WidgetMessage::RequestDestroy).await {
      tracing::debug!(pair = %self.pair, error = %e, "Could not send RequestDestroy");
    }
    if self.state.lifecycle.is_live() {
      if let Err(e) = self.state.lifecycle.begin_destroy() {
        tracing::error!(pair = %self.pair, error = %e, "Invalid transition on teardown");
      }
    }
    self.finish(cause.reason());
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

  fn publish_state(&self) {
    self.state_tx.send_replace(self.state);
  }

  /// Terminal transition. Unregisters the pair and notifies the client once.
  fn finish(&mut self, reason: DestroyReason) {
    let pair = self.pair;
    if let Err(e) = self.state.lifecycle.terminate(reason) {
      tracing::error!(%pair, error = %e, "Invalid transition to Destroyed");
    }
    self.publish_state();
    tracing::debug!(%pair, %reason, "Widget pair destroyed");
    self.context.registry().unregister(pair);
    self.context.publish_actor_stopping(pair, ActorType::ProxyActor, reason);
    self.drop_guard.waive();

    if let Some(listener) = self.listener.take().and_then(|weak| weak.upgrade()) {
      listener.on_destroyed(pair, reason);
    }
  }
}

fn reply(reply_tx: ReplySender) {
  // The caller may have stopped waiting; nothing to do then.
  let _ = reply_tx.send(Ok(()));
}
