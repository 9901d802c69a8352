// src/message/geometry.rs

use crate::error::WidgetError;
use std::fmt;

/// Top-left position of a widget, in parent window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

/// Extent of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
  pub width: f64,
  pub height: f64,
}

/// Bounds of a plugin widget: position plus size.
///
/// Every component must be finite and non-negative before it is sent or applied;
/// use [`Rect::validate`] to check.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
  pub origin: Point,
  pub size: Size,
}

impl Rect {
  pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
    Self {
      origin: Point { x, y },
      size: Size { width, height },
    }
  }

  pub fn x(&self) -> f64 {
    self.origin.x
  }

  pub fn y(&self) -> f64 {
    self.origin.y
  }

  pub fn width(&self) -> f64 {
    self.size.width
  }

  pub fn height(&self) -> f64 {
    self.size.height
  }

  /// Components in wire order: x, y, width, height.
  pub fn components(&self) -> [f64; 4] {
    [self.origin.x, self.origin.y, self.size.width, self.size.height]
  }

  pub fn is_valid(&self) -> bool {
    self.components().iter().all(|v| v.is_finite() && *v >= 0.0)
  }

  /// Rejects NaN, infinite and negative components.
  pub fn validate(&self) -> Result<(), WidgetError> {
    const NAMES: [&str; 4] = ["x", "y", "width", "height"];
    for (name, value) in NAMES.iter().zip(self.components()) {
      if !value.is_finite() {
        return Err(WidgetError::InvalidGeometry(format!("{} is not finite ({})", name, value)));
      }
      if value < 0.0 {
        return Err(WidgetError::InvalidGeometry(format!("{} is negative ({})", name, value)));
      }
    }
    Ok(())
  }
}

impl fmt::Display for Rect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "({}, {}, {}x{})",
      self.origin.x, self.origin.y, self.size.width, self.size.height
    )
  }
}
