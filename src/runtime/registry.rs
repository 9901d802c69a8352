// src/runtime/registry.rs

use crate::error::WidgetError;
use crate::message::PairId;
use crate::runtime::MailboxSender;

use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::Notify;

/// Per-channel table of live actor pairs, keyed by pair id.
///
/// Entries are removed only when their actor reaches `Destroyed`. Ids are never
/// reused: every accepted id must be above the highest id seen so far.
#[derive(Debug)]
pub(crate) struct PairRegistry {
  state: RwLock<RegistryState>,
  drained: Notify,
}

#[derive(Debug, Default)]
struct RegistryState {
  live: HashMap<PairId, MailboxSender>,
  high_water: u64,
}

impl PairRegistry {
  pub(crate) fn new() -> Self {
    Self {
      state: RwLock::new(RegistryState::default()),
      drained: Notify::new(),
    }
  }

  /// Allocates the next pair id and registers `mailbox` under it in one step.
  pub(crate) fn register_new(&self, mailbox: MailboxSender) -> PairId {
    let mut state = self.state.write();
    state.high_water += 1;
    let pair = PairId::new(state.high_water);
    state.live.insert(pair, mailbox);
    tracing::debug!(%pair, live = state.live.len(), "Pair registered");
    pair
  }

  /// Registers a pair whose id was chosen by the peer.
  pub(crate) fn register(&self, pair: PairId, mailbox: MailboxSender) -> Result<(), WidgetError> {
    let mut state = self.state.write();
    if pair.get() <= state.high_water {
      return Err(WidgetError::PairIdReused(pair.get()));
    }
    state.high_water = pair.get();
    state.live.insert(pair, mailbox);
    tracing::debug!(%pair, live = state.live.len(), "Pair registered");
    Ok(())
  }

  pub(crate) fn unregister(&self, pair: PairId) -> bool {
    let mut state = self.state.write();
    if state.live.remove(&pair).is_none() {
      return false;
    }
    tracing::debug!(%pair, live = state.live.len(), "Pair unregistered");
    if state.live.is_empty() {
      self.drained.notify_waiters();
    }
    true
  }

  pub(crate) fn get(&self, pair: PairId) -> Option<MailboxSender> {
    self.state.read().live.get(&pair).cloned()
  }

  pub(crate) fn contains(&self, pair: PairId) -> bool {
    self.state.read().live.contains_key(&pair)
  }

  pub(crate) fn len(&self) -> usize {
    self.state.read().live.len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Resolves once no pair is registered.
  pub(crate) async fn wait_until_empty(&self) {
    loop {
      // Created before the check so a concurrent unregister cannot slip between.
      let notified = self.drained.notified();
      if self.is_empty() {
        return;
      }
      notified.await;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::mailbox;
  use std::sync::Arc;
  use std::time::Duration;

  #[test]
  fn allocated_ids_increase() {
    let registry = PairRegistry::new();
    let (tx, _rx) = mailbox(1);
    let a = registry.register_new(tx.clone());
    let b = registry.register_new(tx);
    assert!(b > a);
    assert_eq!(registry.len(), 2);
  }

  #[test]
  fn retired_ids_are_refused() {
    let registry = PairRegistry::new();
    let (tx, _rx) = mailbox(1);
    registry.register(PairId::new(5), tx.clone()).unwrap();
    assert!(registry.unregister(PairId::new(5)));
    assert!(!registry.unregister(PairId::new(5)));

    let err = registry.register(PairId::new(5), tx.clone()).unwrap_err();
    assert!(matches!(err, WidgetError::PairIdReused(5)));
    assert!(matches!(
      registry.register(PairId::new(3), tx.clone()),
      Err(WidgetError::PairIdReused(3))
    ));
    registry.register(PairId::new(6), tx).unwrap();
    assert!(registry.contains(PairId::new(6)));
  }

  #[tokio::test]
  async fn wait_until_empty_wakes_on_last_unregister() {
    let registry = Arc::new(PairRegistry::new());
    let (tx, _rx) = mailbox(1);
    let pair = registry.register_new(tx);

    let waiter = {
      let registry = registry.clone();
      tokio::spawn(async move { registry.wait_until_empty().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    registry.unregister(pair);
    tokio::time::timeout(Duration::from_secs(1), waiter)
      .await
      .expect("waiter should be released")
      .unwrap();
  }
}
