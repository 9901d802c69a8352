// src/error.rs

use crate::privileged::backend::BackendError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum WidgetError {
  // --- I/O Errors ---
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  // --- Argument Errors ---
  #[error("Invalid widget geometry: {0}")]
  InvalidGeometry(String),

  // --- State Errors ---
  #[error("Operation is invalid for the current widget state: {0}")]
  InvalidState(&'static str),
  #[error("Invalid lifecycle transition from {from} to {to}")]
  InvalidTransition { from: &'static str, to: &'static str },
  #[error("Actor pair {0} is already registered or was retired on this channel")]
  PairIdReused(u64),

  // --- Channel / Protocol Errors ---
  #[error("Channel closed by peer or transport")]
  ChannelClosed,
  #[error("Widget protocol violation: {0}")]
  ProtocolViolation(String),
  #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
  FrameTooLarge { size: usize, limit: usize },

  // --- Timeouts ---
  #[error("Operation timed out")]
  Timeout,

  // --- Native Backend ---
  #[error("Native widget backend error: {0}")]
  Backend(#[from] BackendError),
}

impl WidgetError {
  /// True for errors that mean the channel to the peer is gone.
  pub fn is_disconnect(&self) -> bool {
    match self {
      WidgetError::ChannelClosed => true,
      WidgetError::Io(e) => matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
          | io::ErrorKind::ConnectionReset
          | io::ErrorKind::ConnectionAborted
          | io::ErrorKind::UnexpectedEof
      ),
      _ => false,
    }
  }
}
