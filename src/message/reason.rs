// src/message/reason.rs

use std::fmt;

/// Why an actor pair ended. Recorded on the terminal `Destroyed` transition and
/// reported to the owning client exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestroyReason {
  /// Orderly teardown: an explicit destroy request or a graceful shutdown of the
  /// privileged side.
  NormalShutdown,
  /// The peer vanished (process death, channel error) or a live widget operation
  /// could not be applied.
  AbnormalShutdown,
  /// The pair never became live: construction was rejected or could not be sent.
  FailedConstructor,
  /// The owning client released its proxy without destroying it first.
  Deletion,
  /// The local channel endpoint that manages every pair on it was torn down.
  AncestorDeletion,
}

impl DestroyReason {
  pub fn as_str(&self) -> &'static str {
    match self {
      DestroyReason::NormalShutdown => "NormalShutdown",
      DestroyReason::AbnormalShutdown => "AbnormalShutdown",
      DestroyReason::FailedConstructor => "FailedConstructor",
      DestroyReason::Deletion => "Deletion",
      DestroyReason::AncestorDeletion => "AncestorDeletion",
    }
  }

  /// Teardown the client did not ask for; candidates for recreating the widget.
  pub fn is_unexpected(&self) -> bool {
    match self {
      DestroyReason::AbnormalShutdown | DestroyReason::FailedConstructor => true,
      DestroyReason::NormalShutdown | DestroyReason::Deletion | DestroyReason::AncestorDeletion => false,
    }
  }
}

impl fmt::Display for DestroyReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
