// src/lifecycle.rs

//! The lifecycle contract shared by both ends of an actor pair.
//!
//! ```text
//! Constructing ──► Live ──► Destroying ──► Destroyed(reason)
//!      │                        ▲              ▲
//!      ├────────────────────────┘              │
//!      └───────────────────────────────────────┘
//! ```
//!
//! `Constructing → Destroyed` is the shortcut for pairs that never became live.
//! Nothing leaves `Destroyed`.

use crate::error::WidgetError;
use crate::message::DestroyReason;

/// Phases of an actor pair, as seen by one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
  /// Construction requested, outcome not yet known.
  Constructing,
  /// The native widget exists and accepts operations.
  Live,
  /// Teardown has started; waiting for it to complete.
  Destroying,
  /// Terminal.
  Destroyed,
}

impl PairState {
  pub fn as_str(&self) -> &'static str {
    match self {
      PairState::Constructing => "Constructing",
      PairState::Live => "Live",
      PairState::Destroying => "Destroying",
      PairState::Destroyed => "Destroyed",
    }
  }

  pub fn can_transition_to(&self, next: PairState) -> bool {
    use PairState::*;
    matches!(
      (self, next),
      (Constructing, Live)
        | (Constructing, Destroying)
        | (Constructing, Destroyed)
        | (Live, Destroying)
        | (Destroying, Destroyed)
    )
  }
}

/// Current state plus the reason recorded when the pair reached `Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
  state: PairState,
  reason: Option<DestroyReason>,
}

impl Lifecycle {
  pub fn new() -> Self {
    Self {
      state: PairState::Constructing,
      reason: None,
    }
  }

  pub fn state(&self) -> PairState {
    self.state
  }

  /// Set only once the pair is `Destroyed`.
  pub fn reason(&self) -> Option<DestroyReason> {
    self.reason
  }

  pub fn is_live(&self) -> bool {
    self.state == PairState::Live
  }

  pub fn is_destroyed(&self) -> bool {
    self.state == PairState::Destroyed
  }

  /// Constructing or Live: geometry, visibility and destroy requests are forwarded.
  pub fn accepts_operations(&self) -> bool {
    matches!(self.state, PairState::Constructing | PairState::Live)
  }

  pub fn mark_live(&mut self) -> Result<(), WidgetError> {
    self.transition(PairState::Live)
  }

  pub fn begin_destroy(&mut self) -> Result<(), WidgetError> {
    self.transition(PairState::Destroying)
  }

  pub fn finish(&mut self, reason: DestroyReason) -> Result<(), WidgetError> {
    self.transition(PairState::Destroyed)?;
    self.reason = Some(reason);
    Ok(())
  }

  /// Drives the pair to `Destroyed` from whatever non-terminal state it is in,
  /// passing through `Destroying` when coming from `Live`.
  pub fn terminate(&mut self, reason: DestroyReason) -> Result<(), WidgetError> {
    if self.state == PairState::Live {
      self.begin_destroy()?;
    }
    self.finish(reason)
  }

  fn transition(&mut self, next: PairState) -> Result<(), WidgetError> {
    if !self.state.can_transition_to(next) {
      return Err(WidgetError::InvalidTransition {
        from: self.state.as_str(),
        to: next.as_str(),
      });
    }
    self.state = next;
    Ok(())
  }
}

impl Default for Lifecycle {
  fn default() -> Self {
    Self::new()
  }
}

/// Classification of why a pair is being torn down. Each cause maps to exactly one
/// [`DestroyReason`] reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownCause {
  /// The backend refused to create the widget, or the request never reached it.
  ConstructionFailure,
  /// A live widget operation could not be applied.
  ApplyFailure,
  /// The channel or the peer process went away.
  PeerLost,
  /// Explicit destroy request, or graceful shutdown of the privileged side.
  NormalTeardown,
  /// The client dropped its proxy without destroying it.
  Released,
  /// The local channel endpoint is shutting down every pair it manages.
  AncestorTeardown,
}

impl TeardownCause {
  pub fn reason(&self) -> DestroyReason {
    match self {
      TeardownCause::ConstructionFailure => DestroyReason::FailedConstructor,
      TeardownCause::ApplyFailure | TeardownCause::PeerLost => DestroyReason::AbnormalShutdown,
      TeardownCause::NormalTeardown => DestroyReason::NormalShutdown,
      TeardownCause::Released => DestroyReason::Deletion,
      TeardownCause::AncestorTeardown => DestroyReason::AncestorDeletion,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normal_path_records_reason() {
    let mut lc = Lifecycle::new();
    assert_eq!(lc.state(), PairState::Constructing);
    lc.mark_live().unwrap();
    assert!(lc.accepts_operations());
    lc.begin_destroy().unwrap();
    assert!(!lc.accepts_operations());
    assert_eq!(lc.reason(), None);
    lc.finish(DestroyReason::NormalShutdown).unwrap();
    assert!(lc.is_destroyed());
    assert_eq!(lc.reason(), Some(DestroyReason::NormalShutdown));
  }

  #[test]
  fn constructor_failure_skips_live() {
    let mut lc = Lifecycle::new();
    lc.finish(DestroyReason::FailedConstructor).unwrap();
    assert_eq!(lc.state(), PairState::Destroyed);
  }

  #[test]
  fn live_cannot_jump_to_destroyed() {
    let mut lc = Lifecycle::new();
    lc.mark_live().unwrap();
    let err = lc.finish(DestroyReason::AbnormalShutdown).unwrap_err();
    assert!(matches!(
      err,
      WidgetError::InvalidTransition { from: "Live", to: "Destroyed" }
    ));
    // terminate() routes through Destroying instead.
    lc.terminate(DestroyReason::AbnormalShutdown).unwrap();
    assert_eq!(lc.reason(), Some(DestroyReason::AbnormalShutdown));
  }

  #[test]
  fn destroyed_is_terminal() {
    let mut lc = Lifecycle::new();
    lc.finish(DestroyReason::AbnormalShutdown).unwrap();
    assert!(lc.mark_live().is_err());
    assert!(lc.begin_destroy().is_err());
    assert!(lc.terminate(DestroyReason::NormalShutdown).is_err());
    assert_eq!(lc.reason(), Some(DestroyReason::AbnormalShutdown));
  }

  #[test]
  fn causes_map_to_reasons() {
    assert_eq!(TeardownCause::ApplyFailure.reason(), DestroyReason::AbnormalShutdown);
    assert_eq!(TeardownCause::PeerLost.reason(), DestroyReason::AbnormalShutdown);
    assert_eq!(TeardownCause::ConstructionFailure.reason(), DestroyReason::FailedConstructor);
    assert_eq!(TeardownCause::Released.reason(), DestroyReason::Deletion);
  }
}
