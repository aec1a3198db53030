//! Wire protocol for the tunnel control connection.
//!
//! A frame is `[version=1][type][correlation id (16B)][body len (8B, BE)][body]`.
//! [`FrameCodec`] implements [`tokio_util::codec::Decoder`] /
//! [`tokio_util::codec::Encoder`] so it composes with `Framed` /
//! `FramedRead` / `FramedWrite` the way any other framed stream in the
//! stack does.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

pub mod http_message;

/// The only wire version this crate speaks.
pub const VERSION: u8 = 1;

const CORRELATION_ID_LEN: usize = 16;
const BODY_LEN_LEN: usize = 8;
/// `version + type + correlation id + body length`, i.e. everything
/// before the body itself.
const HEADER_LEN: usize = 1 + 1 + CORRELATION_ID_LEN + BODY_LEN_LEN;

/// One of the eight frame kinds that may appear on the control stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    Request = 0,
    Response = 1,
    Heartbeat = 2,
    HeartbeatOk = 3,
    ConnectionRequest = 4,
    ConnectionAccepted = 5,
    Disconnect = 6,
    Error = 7,
}

impl FrameType {
    fn from_byte(b: u8) -> Result<Self, ProtocolError> {
        match b {
            0 => Ok(Self::Request),
            1 => Ok(Self::Response),
            2 => Ok(Self::Heartbeat),
            3 => Ok(Self::HeartbeatOk),
            4 => Ok(Self::ConnectionRequest),
            5 => Ok(Self::ConnectionAccepted),
            6 => Ok(Self::Disconnect),
            7 => Ok(Self::Error),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// A fully decoded frame: type, correlation id, and opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub correlation_id: Uuid,
    pub body: Bytes,
}

impl Frame {
    pub fn new(frame_type: FrameType, correlation_id: Uuid, body: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            correlation_id,
            body: body.into(),
        }
    }

    /// Convenience for frames with no payload (HEARTBEAT, HEARTBEAT_OK,
    /// CONNECTION_REQUEST, DISCONNECT).
    pub fn empty(frame_type: FrameType, correlation_id: Uuid) -> Self {
        Self::new(frame_type, correlation_id, Bytes::new())
    }
}

/// Framing or version violation on the control stream. Fatal for the
/// connection on both sides.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unsupported frame version {found} (expected {VERSION})")]
    UnsupportedVersion { found: u8 },
    #[error("unknown frame type {0}")]
    UnknownType(u8),
    #[error("control connection closed mid-frame")]
    UnexpectedEof,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// `tokio_util::codec` implementation of the wire format in the module docs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        // Version and type are checked as soon as they're available so a
        // malformed peer is rejected without waiting for a full frame.
        if src.len() < 2 {
            return Ok(None);
        }
        let version = src[0];
        if version != VERSION {
            return Err(ProtocolError::UnsupportedVersion { found: version });
        }
        let frame_type = FrameType::from_byte(src[1])?;

        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        let body_len = u64::from_be_bytes(
            src[2 + CORRELATION_ID_LEN..HEADER_LEN]
                .try_into()
                .expect("slice has exactly BODY_LEN_LEN bytes"),
        ) as usize;

        let total_len = HEADER_LEN + body_len;
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        let mut frame_bytes = src.split_to(total_len);
        frame_bytes.advance(2); // version, type already read above
        let mut id_bytes = [0u8; CORRELATION_ID_LEN];
        id_bytes.copy_from_slice(&frame_bytes[..CORRELATION_ID_LEN]);
        frame_bytes.advance(CORRELATION_ID_LEN + BODY_LEN_LEN);
        let body = frame_bytes.freeze();

        Ok(Some(Frame {
            frame_type,
            correlation_id: Uuid::from_bytes(id_bytes),
            body,
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        dst.reserve(HEADER_LEN + frame.body.len());
        dst.put_u8(VERSION);
        dst.put_u8(frame.frame_type as u8);
        dst.extend_from_slice(frame.correlation_id.as_bytes());
        dst.put_u64(frame.body.len() as u64);
        dst.extend_from_slice(&frame.body);
        Ok(())
    }
}

/// Serialize a single frame to a freestanding byte buffer, bypassing
/// `Framed`. Used by the codec's own property tests and by callers that
/// need a one-off encode outside a socket.
pub fn serialize(frame: &Frame) -> Bytes {
    let mut dst = BytesMut::new();
    FrameCodec
        .encode(frame.clone(), &mut dst)
        .expect("encoding to a BytesMut never fails");
    dst.freeze()
}

/// Decode a single frame out of a byte buffer, requiring the buffer to
/// contain at least one complete frame. Returns the frame and the number
/// of bytes consumed from `data`, so trailing bytes can be recovered by
/// the caller (see [`ProtocolError`] property tests).
pub fn deserialize(data: &[u8]) -> Result<(Frame, usize), ProtocolError> {
    let mut buf = BytesMut::from(data);
    let starting_len = buf.len();
    match FrameCodec.decode(&mut buf)? {
        Some(frame) => {
            let consumed = starting_len - buf.len();
            Ok((frame, consumed))
        }
        None => Err(ProtocolError::UnexpectedEof),
    }
}
