// src/runtime/mailbox.rs

//! Type aliases for actor communication channels based on `async-channel`.

use crate::runtime::command::Command;

/// The sending end of an actor's mailbox.
/// Cloneable: the channel dispatcher keeps one clone in the pair registry.
pub type MailboxSender = async_channel::Sender<Command>;

/// The receiving end of an actor's mailbox.
/// Owned by exactly one actor task, which processes commands sequentially.
pub type MailboxReceiver = async_channel::Receiver<Command>;

/// Creates a new bounded mailbox channel pair.
pub fn mailbox(capacity: usize) -> (MailboxSender, MailboxReceiver) {
  async_channel::bounded(capacity.max(1))
}
