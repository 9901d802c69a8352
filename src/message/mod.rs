//! Data carried by the widget protocol (`Rect`, `PairId`, `DestroyReason`).

mod geometry;
mod pair;
mod reason;

pub use geometry::{Point, Rect, Size};
pub use pair::PairId;
pub use reason::DestroyReason;
