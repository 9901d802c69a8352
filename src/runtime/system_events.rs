// src/runtime/system_events.rs

use crate::message::{DestroyReason, PairId};

/// Type identifier for the actors living on a channel endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorType {
  /// Content-side stand-in for a remote widget.
  ProxyActor,
  /// Privileged-side owner of a native widget.
  WidgetActor,
}

/// Events broadcast to every actor on one channel endpoint via the EventBus.
#[derive(Debug, Clone)]
pub enum SystemEvent {
  /// The local endpoint is shutting down. Every actor tears its pair down.
  /// Published by `shutdown()` / `term()`.
  ChannelTerminating,

  /// The inbound side of the channel closed without a local shutdown: the peer
  /// process died or dropped its end. Published by the dispatcher.
  PeerDisconnected,

  /// The transport failed (I/O error, undecodable frame). Treated like a lost peer.
  ChannelError { error_msg: String },

  /// Published after an actor task has been spawned.
  ActorStarted { pair: PairId, actor_type: ActorType },

  /// Published by an actor as it leaves its run loop, normally or not.
  ActorStopping {
    pair: PairId,
    actor_type: ActorType,
    reason: DestroyReason,
  },
}

impl SystemEvent {
  /// Events after which the peer can no longer be reached.
  pub fn is_peer_loss(&self) -> bool {
    matches!(self, SystemEvent::PeerDisconnected | SystemEvent::ChannelError { .. })
  }
}
