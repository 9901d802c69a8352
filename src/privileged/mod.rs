// src/privileged/mod.rs

//! The privileged process side: the widget host, its widget actors and the native
//! backend they drive.

pub(crate) mod actor;
pub mod backend;
pub mod headless;
pub mod host;

pub use backend::{BackendError, NativeWidgetBackend, NativeWidgetHandle};
pub use headless::{BackendCall, HeadlessBackend, HeadlessWidget};
pub use host::WidgetHost;
