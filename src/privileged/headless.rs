// src/privileged/headless.rs

use crate::message::Rect;
use crate::privileged::backend::{BackendError, NativeWidgetBackend, NativeWidgetHandle};

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// One call received by a [`HeadlessBackend`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
  Create { geometry: Rect, visible: bool },
  SetGeometry { handle: NativeWidgetHandle, geometry: Rect },
  SetVisible { handle: NativeWidgetHandle, visible: bool },
  SetFocus { handle: NativeWidgetHandle },
  Destroy { handle: NativeWidgetHandle },
}

/// Last applied state of a widget held by a [`HeadlessBackend`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessWidget {
  pub geometry: Rect,
  pub visible: bool,
  pub focused: bool,
}

#[derive(Debug, Default)]
struct HeadlessState {
  next_handle: u64,
  widgets: HashMap<NativeWidgetHandle, HeadlessWidget>,
  invalidated: HashSet<NativeWidgetHandle>,
  fail_next_create: bool,
  created: usize,
  destroyed: usize,
  calls: Vec<BackendCall>,
}

/// In-memory native widget backend. Records every call and can be told to fail, so
/// the privileged side runs without a windowing system.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
  state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes the next `create_native_widget` call fail.
  pub fn fail_next_create(&self) {
    self.state.lock().fail_next_create = true;
  }

  /// Makes every later operation on `handle` fail, as if the platform had torn the
  /// widget down behind our back. Destroying it still succeeds.
  pub fn invalidate(&self, handle: NativeWidgetHandle) {
    self.state.lock().invalidated.insert(handle);
  }

  pub fn widget(&self, handle: NativeWidgetHandle) -> Option<HeadlessWidget> {
    self.state.lock().widgets.get(&handle).copied()
  }

  pub fn live_count(&self) -> usize {
    self.state.lock().widgets.len()
  }

  pub fn created_count(&self) -> usize {
    self.state.lock().created
  }

  pub fn destroyed_count(&self) -> usize {
    self.state.lock().destroyed
  }

  pub fn calls(&self) -> Vec<BackendCall> {
    self.state.lock().calls.clone()
  }

  fn update<F>(&self, handle: NativeWidgetHandle, call: BackendCall, f: F) -> Result<(), BackendError>
  where
    F: FnOnce(&mut HeadlessWidget),
  {
    let mut state = self.state.lock();
    state.calls.push(call);
    if state.invalidated.contains(&handle) {
      return Err(BackendError::InvalidHandle(handle));
    }
    match state.widgets.get_mut(&handle) {
      Some(widget) => {
        f(widget);
        Ok(())
      }
      None => Err(BackendError::InvalidHandle(handle)),
    }
  }
}

impl NativeWidgetBackend for HeadlessBackend {
  fn create_native_widget(&self, geometry: Rect, visible: bool) -> Result<NativeWidgetHandle, BackendError> {
    let mut state = self.state.lock();
    state.calls.push(BackendCall::Create { geometry, visible });
    if std::mem::take(&mut state.fail_next_create) {
      return Err(BackendError::CreationRejected("headless backend told to fail".into()));
    }
    state.next_handle += 1;
    let handle = NativeWidgetHandle::from_raw(state.next_handle);
    state.widgets.insert(
      handle,
      HeadlessWidget {
        geometry,
        visible,
        focused: false,
      },
    );
    state.created += 1;
    Ok(handle)
  }

  fn set_geometry(&self, handle: NativeWidgetHandle, geometry: Rect) -> Result<(), BackendError> {
    self.update(handle, BackendCall::SetGeometry { handle, geometry }, |w| w.geometry = geometry)
  }

  fn set_visible(&self, handle: NativeWidgetHandle, visible: bool) -> Result<(), BackendError> {
    self.update(handle, BackendCall::SetVisible { handle, visible }, |w| w.visible = visible)
  }

  fn set_focus(&self, handle: NativeWidgetHandle) -> Result<(), BackendError> {
    let mut state = self.state.lock();
    state.calls.push(BackendCall::SetFocus { handle });
    if state.invalidated.contains(&handle) || !state.widgets.contains_key(&handle) {
      return Err(BackendError::InvalidHandle(handle));
    }
    for (h, widget) in state.widgets.iter_mut() {
      widget.focused = *h == handle;
    }
    Ok(())
  }

  fn destroy_native_widget(&self, handle: NativeWidgetHandle) {
    let mut state = self.state.lock();
    state.calls.push(BackendCall::Destroy { handle });
    if state.widgets.remove(&handle).is_some() {
      state.destroyed += 1;
    }
    state.invalidated.remove(&handle);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::privileged::backend::{NativeWidget, WidgetOp};
  use std::sync::Arc;

  #[test]
  fn native_widget_is_released_once() {
    let backend = Arc::new(HeadlessBackend::new());
    let mut widget = NativeWidget::create(backend.clone(), Rect::new(0.0, 0.0, 10.0, 10.0), true).unwrap();
    let handle = widget.handle().unwrap();
    widget.apply(WidgetOp::Visible(false)).unwrap();
    assert_eq!(backend.widget(handle).map(|w| w.visible), Some(false));

    widget.release();
    widget.release();
    drop(widget);
    assert_eq!(backend.destroyed_count(), 1);
    assert_eq!(backend.live_count(), 0);
  }

  #[test]
  fn invalidated_handle_fails_operations() {
    let backend = Arc::new(HeadlessBackend::new());
    let widget = NativeWidget::create(backend.clone(), Rect::new(0.0, 0.0, 10.0, 10.0), true).unwrap();
    let handle = widget.handle().unwrap();
    backend.invalidate(handle);
    assert_eq!(
      widget.apply(WidgetOp::Focus),
      Err(BackendError::InvalidHandle(handle))
    );
  }

  #[test]
  fn scripted_create_failure_applies_once() {
    let backend = HeadlessBackend::new();
    backend.fail_next_create();
    assert!(backend.create_native_widget(Rect::new(0.0, 0.0, 1.0, 1.0), true).is_err());
    assert!(backend.create_native_widget(Rect::new(0.0, 0.0, 1.0, 1.0), true).is_ok());
    assert_eq!(backend.created_count(), 1);
  }
}
