use std::fmt;

/// Channel-scoped identity of one proxy actor / widget actor pair.
///
/// Allocated by the content side, strictly increasing per channel and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId(u64);

impl PairId {
  pub const fn new(raw: u64) -> Self {
    Self(raw)
  }

  pub const fn get(self) -> u64 {
    self.0
  }
}

impl fmt::Display for PairId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "pair#{}", self.0)
  }
}
