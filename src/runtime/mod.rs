// src/runtime/mod.rs

//! Core asynchronous primitives: Commands, Mailboxes, the EventBus and the pair registry.

pub mod actor_drop_guard;
pub mod command;
pub mod event_bus;
pub mod mailbox;
pub mod registry;
pub mod system_events;

pub use command::{Command, ReplySender};
pub(crate) use mailbox::{mailbox, MailboxReceiver, MailboxSender};

// Channel Coordination
pub use event_bus::EventBus;
pub use system_events::{ActorType, SystemEvent};

pub(crate) use actor_drop_guard::ActorDropGuard;
pub(crate) use registry::PairRegistry;
