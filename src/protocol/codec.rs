// src/protocol/codec.rs

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::WidgetError;
use crate::message::{DestroyReason, PairId, Rect};
use crate::protocol::messages::{Envelope, WidgetMessage};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Length prefix: u32, big endian, counts the body only.
const LENGTH_PREFIX_LEN: usize = 4;
/// Body header: u64 pair id + u8 message tag.
const BODY_HEADER_LEN: usize = 8 + 1;
const GEOMETRY_LEN: usize = 4 * 8;

// Message tags. High bit set for privileged -> content.
const TAG_CONSTRUCT: u8 = 0x01;
const TAG_SET_GEOMETRY: u8 = 0x02;
const TAG_SET_VISIBLE: u8 = 0x03;
const TAG_SET_FOCUS: u8 = 0x04;
const TAG_REQUEST_DESTROY: u8 = 0x05;
const TAG_CREATED: u8 = 0x81;
const TAG_CONSTRUCT_FAILED: u8 = 0x82;
const TAG_DESTROYED: u8 = 0x83;

/// Codec for length-prefixed widget protocol frames.
///
/// Frame layout: `len:u32 | pair:u64 | tag:u8 | payload`, all big endian.
/// Geometry is four `f64` (x, y, width, height), booleans are one byte (0 or 1),
/// destroy reasons are one byte.
#[derive(Debug)]
pub struct WidgetCodec {
  decoding_state: DecodingState,
  max_frame_size: usize,
}

#[derive(Debug, Default, Clone, Copy)]
enum DecodingState {
  #[default]
  ReadHeader, // Waiting for the length prefix
  ReadBody(usize), // Waiting for `len` body bytes
}

impl WidgetCodec {
  pub fn new() -> Self {
    Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
  }

  pub fn with_max_frame_size(max_frame_size: usize) -> Self {
    Self {
      decoding_state: DecodingState::default(),
      max_frame_size: max_frame_size.max(BODY_HEADER_LEN),
    }
  }

  pub fn max_frame_size(&self) -> usize {
    self.max_frame_size
  }
}

impl Default for WidgetCodec {
  fn default() -> Self {
    Self::new()
  }
}

fn reason_to_wire(reason: DestroyReason) -> u8 {
  match reason {
    DestroyReason::NormalShutdown => 0,
    DestroyReason::AbnormalShutdown => 1,
    DestroyReason::FailedConstructor => 2,
    DestroyReason::Deletion => 3,
    DestroyReason::AncestorDeletion => 4,
  }
}

fn reason_from_wire(value: u8) -> Result<DestroyReason, WidgetError> {
  match value {
    0 => Ok(DestroyReason::NormalShutdown),
    1 => Ok(DestroyReason::AbnormalShutdown),
    2 => Ok(DestroyReason::FailedConstructor),
    3 => Ok(DestroyReason::Deletion),
    4 => Ok(DestroyReason::AncestorDeletion),
    other => Err(WidgetError::ProtocolViolation(format!("unknown destroy reason {}", other))),
  }
}

fn put_geometry(dst: &mut BytesMut, geometry: &Rect) -> Result<(), WidgetError> {
  geometry.validate()?;
  for component in geometry.components() {
    dst.put_f64(component);
  }
  Ok(())
}

fn get_geometry(body: &mut BytesMut) -> Result<Rect, WidgetError> {
  if body.remaining() < GEOMETRY_LEN {
    return Err(WidgetError::ProtocolViolation("truncated geometry".into()));
  }
  let geometry = Rect::new(body.get_f64(), body.get_f64(), body.get_f64(), body.get_f64());
  geometry
    .validate()
    .map_err(|e| WidgetError::ProtocolViolation(format!("peer sent {}", e)))?;
  Ok(geometry)
}

fn get_flag(body: &mut BytesMut) -> Result<bool, WidgetError> {
  if !body.has_remaining() {
    return Err(WidgetError::ProtocolViolation("truncated boolean".into()));
  }
  match body.get_u8() {
    0 => Ok(false),
    1 => Ok(true),
    other => Err(WidgetError::ProtocolViolation(format!("invalid boolean byte {}", other))),
  }
}

// --- Encoder Implementation (Envelope -> BytesMut) ---
impl Encoder<Envelope> for WidgetCodec {
  type Error = WidgetError;

  fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
    let start = dst.len();
    dst.reserve(LENGTH_PREFIX_LEN + BODY_HEADER_LEN + GEOMETRY_LEN + 1);
    dst.put_u32(0); // Patched below once the body length is known
    dst.put_u64(item.pair.get());

    let result = match &item.msg {
      WidgetMessage::Construct { geometry, visible } => {
        dst.put_u8(TAG_CONSTRUCT);
        let written = put_geometry(dst, geometry);
        if written.is_ok() {
          dst.put_u8(u8::from(*visible));
        }
        written
      }
      WidgetMessage::SetGeometry { geometry } => {
        dst.put_u8(TAG_SET_GEOMETRY);
        put_geometry(dst, geometry)
      }
      WidgetMessage::SetVisible { visible } => {
        dst.put_u8(TAG_SET_VISIBLE);
        dst.put_u8(u8::from(*visible));
        Ok(())
      }
      WidgetMessage::SetFocus => {
        dst.put_u8(TAG_SET_FOCUS);
        Ok(())
      }
      WidgetMessage::RequestDestroy => {
        dst.put_u8(TAG_REQUEST_DESTROY);
        Ok(())
      }
      WidgetMessage::Created => {
        dst.put_u8(TAG_CREATED);
        Ok(())
      }
      WidgetMessage::ConstructFailed => {
        dst.put_u8(TAG_CONSTRUCT_FAILED);
        Ok(())
      }
      WidgetMessage::Destroyed { reason } => {
        dst.put_u8(TAG_DESTROYED);
        dst.put_u8(reason_to_wire(*reason));
        Ok(())
      }
    };
    if let Err(e) = result {
      dst.truncate(start);
      return Err(e);
    }

    let body_len = dst.len() - start - LENGTH_PREFIX_LEN;
    if body_len > self.max_frame_size {
      dst.truncate(start);
      return Err(WidgetError::FrameTooLarge {
        size: body_len,
        limit: self.max_frame_size,
      });
    }
    dst[start..start + LENGTH_PREFIX_LEN].copy_from_slice(&(body_len as u32).to_be_bytes());
    tracing::trace!(pair = %item.pair, msg = item.msg.variant_name(), body_len, "Encoded widget frame");
    Ok(())
  }
}

// --- Decoder Implementation (BytesMut -> Envelope) ---
impl Decoder for WidgetCodec {
  type Item = Envelope;
  type Error = WidgetError;

  fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
    loop {
      match self.decoding_state {
        DecodingState::ReadHeader => {
          if src.len() < LENGTH_PREFIX_LEN {
            src.reserve(LENGTH_PREFIX_LEN - src.len());
            return Ok(None); // Need more data for the prefix
          }
          let body_len = src.get_u32() as usize;
          if body_len > self.max_frame_size {
            return Err(WidgetError::FrameTooLarge {
              size: body_len,
              limit: self.max_frame_size,
            });
          }
          if body_len < BODY_HEADER_LEN {
            return Err(WidgetError::ProtocolViolation(format!(
              "frame body of {} bytes is shorter than its header",
              body_len
            )));
          }
          self.decoding_state = DecodingState::ReadBody(body_len);
        }

        DecodingState::ReadBody(body_len) => {
          if src.len() < body_len {
            src.reserve(body_len - src.len());
            return Ok(None);
          }
          let mut body = src.split_to(body_len);
          self.decoding_state = DecodingState::ReadHeader;
          return decode_body(&mut body).map(Some);
        }
      }
    }
  }
}

fn decode_body(body: &mut BytesMut) -> Result<Envelope, WidgetError> {
  let pair = PairId::new(body.get_u64());
  let tag = body.get_u8();
  let msg = match tag {
    TAG_CONSTRUCT => {
      let geometry = get_geometry(body)?;
      let visible = get_flag(body)?;
      WidgetMessage::Construct { geometry, visible }
    }
    TAG_SET_GEOMETRY => WidgetMessage::SetGeometry {
      geometry: get_geometry(body)?,
    },
    TAG_SET_VISIBLE => WidgetMessage::SetVisible {
      visible: get_flag(body)?,
    },
    TAG_SET_FOCUS => WidgetMessage::SetFocus,
    TAG_REQUEST_DESTROY => WidgetMessage::RequestDestroy,
    TAG_CREATED => WidgetMessage::Created,
    TAG_CONSTRUCT_FAILED => WidgetMessage::ConstructFailed,
    TAG_DESTROYED => {
      if !body.has_remaining() {
        return Err(WidgetError::ProtocolViolation("truncated destroy reason".into()));
      }
      WidgetMessage::Destroyed {
        reason: reason_from_wire(body.get_u8())?,
      }
    }
    other => {
      return Err(WidgetError::ProtocolViolation(format!("unknown message tag {:#04x}", other)));
    }
  };
  if body.has_remaining() {
    return Err(WidgetError::ProtocolViolation(format!(
      "{} trailing bytes after {}",
      body.remaining(),
      msg.variant_name()
    )));
  }
  tracing::trace!(%pair, msg = msg.variant_name(), "Decoded widget frame");
  Ok(Envelope { pair, msg })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encode_one(msg: WidgetMessage) -> BytesMut {
    let mut codec = WidgetCodec::new();
    let mut buf = BytesMut::new();
    codec.encode(Envelope::new(PairId::new(7), msg), &mut buf).unwrap();
    buf
  }

  #[test]
  fn construct_frame_layout() {
    let buf = encode_one(WidgetMessage::Construct {
      geometry: Rect::new(0.0, 0.0, 800.0, 600.0),
      visible: true,
    });
    // prefix + pair + tag + geometry + flag
    assert_eq!(buf.len(), 4 + 8 + 1 + 32 + 1);
    assert_eq!(&buf[..4], &(42u32).to_be_bytes());
    assert_eq!(&buf[4..12], &7u64.to_be_bytes());
    assert_eq!(buf[12], TAG_CONSTRUCT);
    assert_eq!(*buf.last().unwrap(), 1);
  }

  #[test]
  fn decodes_frames_split_across_reads() {
    let mut wire = encode_one(WidgetMessage::SetGeometry {
      geometry: Rect::new(10.0, 10.0, 640.0, 480.0),
    });
    wire.extend_from_slice(&encode_one(WidgetMessage::Destroyed {
      reason: DestroyReason::NormalShutdown,
    }));

    let mut codec = WidgetCodec::new();
    let mut src = BytesMut::new();
    let mut decoded = Vec::new();
    for chunk in wire.chunks(5) {
      src.extend_from_slice(chunk);
      while let Some(env) = codec.decode(&mut src).unwrap() {
        decoded.push(env);
      }
    }
    assert_eq!(
      decoded,
      vec![
        Envelope::new(
          PairId::new(7),
          WidgetMessage::SetGeometry {
            geometry: Rect::new(10.0, 10.0, 640.0, 480.0)
          }
        ),
        Envelope::new(
          PairId::new(7),
          WidgetMessage::Destroyed {
            reason: DestroyReason::NormalShutdown
          }
        ),
      ]
    );
    assert!(src.is_empty());
  }

  #[test]
  fn refuses_to_encode_invalid_geometry() {
    let mut codec = WidgetCodec::new();
    let mut buf = BytesMut::from(&b"keep"[..]);
    let err = codec
      .encode(
        Envelope::new(
          PairId::new(1),
          WidgetMessage::SetGeometry {
            geometry: Rect::new(-1.0, 0.0, 1.0, 1.0),
          },
        ),
        &mut buf,
      )
      .unwrap_err();
    assert!(matches!(err, WidgetError::InvalidGeometry(_)));
    assert_eq!(&buf[..], b"keep");
  }

  #[test]
  fn rejects_non_finite_geometry_from_peer() {
    let mut buf = BytesMut::new();
    buf.put_u32((BODY_HEADER_LEN + GEOMETRY_LEN) as u32);
    buf.put_u64(3);
    buf.put_u8(TAG_SET_GEOMETRY);
    for v in [0.0, f64::NAN, 1.0, 1.0] {
      buf.put_f64(v);
    }
    let err = WidgetCodec::new().decode(&mut buf).unwrap_err();
    assert!(matches!(err, WidgetError::ProtocolViolation(_)));
  }

  #[test]
  fn rejects_unknown_tag_and_trailing_bytes() {
    let mut unknown = BytesMut::new();
    unknown.put_u32(BODY_HEADER_LEN as u32);
    unknown.put_u64(1);
    unknown.put_u8(0x7f);
    assert!(matches!(
      WidgetCodec::new().decode(&mut unknown),
      Err(WidgetError::ProtocolViolation(_))
    ));

    let mut trailing = BytesMut::new();
    trailing.put_u32(BODY_HEADER_LEN as u32 + 1);
    trailing.put_u64(1);
    trailing.put_u8(TAG_SET_FOCUS);
    trailing.put_u8(0);
    assert!(matches!(
      WidgetCodec::new().decode(&mut trailing),
      Err(WidgetError::ProtocolViolation(_))
    ));
  }

  #[test]
  fn rejects_oversized_frames() {
    let mut codec = WidgetCodec::with_max_frame_size(16);
    let mut buf = BytesMut::new();
    buf.put_u32(1024);
    assert!(matches!(
      codec.decode(&mut buf),
      Err(WidgetError::FrameTooLarge { size: 1024, limit: 16 })
    ));
  }

  #[test]
  fn rejects_invalid_boolean_byte() {
    let mut buf = BytesMut::new();
    buf.put_u32(BODY_HEADER_LEN as u32 + 1);
    buf.put_u64(9);
    buf.put_u8(TAG_SET_VISIBLE);
    buf.put_u8(2);
    assert!(matches!(
      WidgetCodec::new().decode(&mut buf),
      Err(WidgetError::ProtocolViolation(_))
    ));
  }
}
