// src/runtime/actor_drop_guard.rs

use tracing::debug;

use crate::context::ActorContext;
use crate::message::{DestroyReason, PairId};
use crate::runtime::ActorType;

/// Makes sure a pair is unregistered and reported stopped even when its actor task
/// is dropped before reaching `Destroyed` (cancellation, panic, runtime shutdown).
pub(crate) struct ActorDropGuard {
  context: ActorContext,
  pair: PairId,
  actor_type: ActorType,
  waived: bool,
}

impl ActorDropGuard {
  pub fn new(context: ActorContext, pair: PairId, actor_type: ActorType) -> Self {
    Self {
      context,
      pair,
      actor_type,
      waived: false,
    }
  }

  /// Called once the actor has completed its own teardown.
  pub fn waive(&mut self) {
    self.waived = true;
  }
}

impl Drop for ActorDropGuard {
  fn drop(&mut self) {
    if self.waived {
      return;
    }
    debug!(
      pair = %self.pair,
      actor_type = ?self.actor_type,
      "ActorDropGuard: actor dropped before teardown completed. Unregistering pair."
    );
    self.context.registry().unregister(self.pair);
    self
      .context
      .publish_actor_stopping(self.pair, self.actor_type, DestroyReason::AbnormalShutdown);
  }
}
