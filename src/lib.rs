//! plugwidget - a cross-process actor protocol for plugin-hosted native widgets, on Tokio.
//!
//! The content process drives a native window that lives in a privileged process.
//! Each widget is an actor pair: a proxy actor behind a [`WidgetProxy`] on the
//! content side and a widget actor owning the native handle on the privileged side,
//! joined by one ordered channel. Both ends converge to `Destroyed` with a [`DestroyReason`] even
//! when the other process disappears.

pub mod config;
mod context;
pub mod content;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod privileged;
pub mod protocol;
pub mod runtime;
pub mod transport;

// Re-export core types for user convenience
pub use config::ChannelConfig;
pub use content::{ContentChannel, ProxyState, WidgetListener, WidgetProxy};
pub use error::WidgetError;
pub use lifecycle::{Lifecycle, PairState, TeardownCause};
pub use message::{DestroyReason, PairId, Point, Rect, Size};
pub use privileged::{BackendError, HeadlessBackend, NativeWidgetBackend, NativeWidgetHandle, WidgetHost};
pub use protocol::{Envelope, WidgetMessage};
pub use runtime::{ActorType, SystemEvent};
pub use transport::ChannelEnd;

// --- Top-Level Functions ---

const VERSION_MAJOR: i32 = 0;
const VERSION_MINOR: i32 = 1;
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

pub fn version_major() -> i32 {
  VERSION_MAJOR
}

pub fn version_minor() -> i32 {
  VERSION_MINOR
}

pub fn version_patch() -> i32 {
  VERSION_PATCH
}

/// Connects a content channel and a widget host through an in-process transport.
///
/// Both endpoints share `config`. Handy for single-process embedding and tests.
pub fn inproc_channel(
  backend: std::sync::Arc<dyn NativeWidgetBackend>,
  config: ChannelConfig,
) -> (ContentChannel, WidgetHost) {
  let (content_end, host_end) = transport::inproc::pair(&config);
  let host = WidgetHost::new(host_end, backend, config.clone());
  let content = ContentChannel::new(content_end, config);
  (content, host)
}
