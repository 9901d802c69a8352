// src/privileged/backend.rs

use crate::message::Rect;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opaque handle to a native widget owned by a [`NativeWidgetBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeWidgetHandle(u64);

impl NativeWidgetHandle {
  pub const fn from_raw(raw: u64) -> Self {
    Self(raw)
  }

  pub const fn as_raw(&self) -> u64 {
    self.0
  }
}

impl fmt::Display for NativeWidgetHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "native#{}", self.0)
  }
}

/// Failures reported by a native widget backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
  #[error("Native widget creation rejected: {0}")]
  CreationRejected(String),

  #[error("Native widget handle {0} is no longer valid")]
  InvalidHandle(NativeWidgetHandle),

  #[error("Platform error: {0}")]
  Platform(String),
}

/// The platform layer that actually owns native widgets.
///
/// Calls are synchronous and made from widget actor tasks; implementations must be
/// cheap or hand the work off themselves. `destroy_native_widget` must tolerate
/// handles that are already gone.
pub trait NativeWidgetBackend: Send + Sync + 'static {
  fn create_native_widget(&self, geometry: Rect, visible: bool) -> Result<NativeWidgetHandle, BackendError>;

  fn set_geometry(&self, handle: NativeWidgetHandle, geometry: Rect) -> Result<(), BackendError>;

  fn set_visible(&self, handle: NativeWidgetHandle, visible: bool) -> Result<(), BackendError>;

  fn set_focus(&self, handle: NativeWidgetHandle) -> Result<(), BackendError>;

  fn destroy_native_widget(&self, handle: NativeWidgetHandle);
}

/// Operations a widget actor applies to its native widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WidgetOp {
  Geometry(Rect),
  Visible(bool),
  Focus,
}

/// Owned native widget. Released exactly once, either explicitly or on drop.
pub(crate) struct NativeWidget {
  handle: Option<NativeWidgetHandle>,
  backend: Arc<dyn NativeWidgetBackend>,
}

impl NativeWidget {
  pub(crate) fn create(
    backend: Arc<dyn NativeWidgetBackend>,
    geometry: Rect,
    visible: bool,
  ) -> Result<Self, BackendError> {
    let handle = backend.create_native_widget(geometry, visible)?;
    Ok(Self {
      handle: Some(handle),
      backend,
    })
  }

  pub(crate) fn handle(&self) -> Option<NativeWidgetHandle> {
    self.handle
  }

  pub(crate) fn apply(&self, op: WidgetOp) -> Result<(), BackendError> {
    let handle = match self.handle {
      Some(handle) => handle,
      None => return Ok(()),
    };
    match op {
      WidgetOp::Geometry(geometry) => self.backend.set_geometry(handle, geometry),
      WidgetOp::Visible(visible) => self.backend.set_visible(handle, visible),
      WidgetOp::Focus => self.backend.set_focus(handle),
    }
  }

  /// Destroys the native widget. Later calls do nothing.
  pub(crate) fn release(&mut self) {
    if let Some(handle) = self.handle.take() {
      tracing::debug!(%handle, "Releasing native widget");
      self.backend.destroy_native_widget(handle);
    }
  }
}

impl Drop for NativeWidget {
  fn drop(&mut self) {
    self.release();
  }
}

impl fmt::Debug for NativeWidget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NativeWidget").field("handle", &self.handle).finish()
  }
}
