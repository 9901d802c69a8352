//! Widget protocol: message definitions and their wire framing.

pub mod codec;
pub mod messages;

pub use codec::WidgetCodec;
pub use messages::{Direction, Envelope, WidgetMessage};
