// src/runtime/command.rs

use crate::error::WidgetError;
use crate::message::Rect;
use crate::protocol::WidgetMessage;

use tokio::sync::oneshot; // Using tokio's oneshot for replies

/// Reply channel used by client-facing operations. Resolves once the local actor
/// has processed the command, never waiting on the remote side.
pub type ReplySender = oneshot::Sender<Result<(), WidgetError>>;

/// Defines messages delivered to actor mailboxes (proxy actors and widget actors).
#[derive(Debug)]
pub enum Command {
  // --- User Requests (WidgetProxy handle -> ProxyActor) ---
  UserSetGeometry { geometry: Rect, reply_tx: ReplySender },
  UserSetVisible { visible: bool, reply_tx: ReplySender },
  UserSetFocus { reply_tx: ReplySender },
  UserDestroy { reply_tx: ReplySender },

  // --- Channel Traffic (Dispatcher -> actor) ---
  /// A protocol message addressed to this actor's pair.
  PeerMessage { msg: WidgetMessage },
}

impl Command {
  pub fn variant_name(&self) -> &'static str {
    match self {
      Command::UserSetGeometry { .. } => "UserSetGeometry",
      Command::UserSetVisible { .. } => "UserSetVisible",
      Command::UserSetFocus { .. } => "UserSetFocus",
      Command::UserDestroy { .. } => "UserDestroy",
      Command::PeerMessage { .. } => "PeerMessage",
    }
  }
}
