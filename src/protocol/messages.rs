// src/protocol/messages.rs

use crate::message::{DestroyReason, PairId, Rect};

/// Which way a message travels across the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// Sent by the proxy actor in the content process.
  ToPrivileged,
  /// Sent by the widget actor in the privileged process.
  ToContent,
}

/// Messages exchanged by one actor pair.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetMessage {
  // --- Content -> Privileged ---
  /// Request creation of the native widget.
  Construct { geometry: Rect, visible: bool },
  /// Update the native widget bounds.
  SetGeometry { geometry: Rect },
  /// Show or hide the native widget.
  SetVisible { visible: bool },
  /// Give the native widget keyboard focus.
  SetFocus,
  /// Graceful teardown request.
  RequestDestroy,

  // --- Privileged -> Content ---
  /// The native widget exists; the pair is live.
  Created,
  /// Construction was rejected; the pair never became live.
  ConstructFailed,
  /// Teardown finished, either confirming `RequestDestroy` or reporting a fatal error.
  Destroyed { reason: DestroyReason },
}

impl WidgetMessage {
  pub fn variant_name(&self) -> &'static str {
    match self {
      WidgetMessage::Construct { .. } => "Construct",
      WidgetMessage::SetGeometry { .. } => "SetGeometry",
      WidgetMessage::SetVisible { .. } => "SetVisible",
      WidgetMessage::SetFocus => "SetFocus",
      WidgetMessage::RequestDestroy => "RequestDestroy",
      WidgetMessage::Created => "Created",
      WidgetMessage::ConstructFailed => "ConstructFailed",
      WidgetMessage::Destroyed { .. } => "Destroyed",
    }
  }

  pub fn direction(&self) -> Direction {
    match self {
      WidgetMessage::Construct { .. }
      | WidgetMessage::SetGeometry { .. }
      | WidgetMessage::SetVisible { .. }
      | WidgetMessage::SetFocus
      | WidgetMessage::RequestDestroy => Direction::ToPrivileged,
      WidgetMessage::Created | WidgetMessage::ConstructFailed | WidgetMessage::Destroyed { .. } => {
        Direction::ToContent
      }
    }
  }
}

/// A message addressed to one actor pair on a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
  pub pair: PairId,
  pub msg: WidgetMessage,
}

impl Envelope {
  pub fn new(pair: PairId, msg: WidgetMessage) -> Self {
    Self { pair, msg }
  }
}
