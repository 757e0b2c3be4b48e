//! Frame encode/decode
//!
//! Decoding fails closed: a short read on any of the four reads is a
//! transport failure and is not retried here. The declared length is checked
//! against the payload cap before a single payload byte is read.

use std::io::{Read, Write};

use bytes::Bytes;

use super::PacketType;
use crate::constants::{HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::{HampodError, Result};

/// One unit of the wire protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: PacketType,
    pub tag: u16,
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame, rejecting payloads over the cap
    pub fn new(packet_type: PacketType, tag: u16, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(HampodError::FrameTooLarge { len: payload.len() });
        }
        Ok(Self {
            packet_type,
            tag,
            payload,
        })
    }

    /// Total bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Append the wire form of this frame to `output`
    ///
    /// The payload cap is checked again here: the fields are public, so a
    /// frame built as a struct literal never went through `Frame::new`.
    pub fn encode_into(&self, output: &mut Vec<u8>) -> Result<()> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(HampodError::FrameTooLarge {
                len: self.payload.len(),
            });
        }
        let len = self.payload.len() as u16;
        output.reserve(self.encoded_len());
        output.push(self.packet_type.code());
        output.extend_from_slice(&len.to_le_bytes());
        output.extend_from_slice(&self.tag.to_le_bytes());
        output.extend_from_slice(&self.payload);
        Ok(())
    }

    /// First payload byte, if any
    pub fn first_byte(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

/// Encode a packet into its wire bytes
pub fn encode(packet_type: PacketType, tag: u16, payload: &[u8]) -> Result<Vec<u8>> {
    let frame = Frame::new(packet_type, tag, Bytes::copy_from_slice(payload))?;
    let mut out = Vec::with_capacity(frame.encoded_len());
    frame.encode_into(&mut out)?;
    Ok(out)
}

/// Write one frame and flush
///
/// The frame is assembled first so it reaches the channel in a single write.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, frame: &Frame) -> Result<()> {
    let mut out = Vec::with_capacity(frame.encoded_len());
    frame.encode_into(&mut out)?;
    writer
        .write_all(&out)
        .map_err(|e| HampodError::transport("write frame", e))?;
    writer
        .flush()
        .map_err(|e| HampodError::transport("flush frame", e))
}

/// Read one frame from a byte source
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<Frame> {
    let mut type_buf = [0u8; 1];
    reader
        .read_exact(&mut type_buf)
        .map_err(|e| HampodError::transport("read type", e))?;

    let mut len_buf = [0u8; 2];
    reader
        .read_exact(&mut len_buf)
        .map_err(|e| HampodError::transport("read length", e))?;
    let len = u16::from_le_bytes(len_buf) as usize;

    let mut tag_buf = [0u8; 2];
    reader
        .read_exact(&mut tag_buf)
        .map_err(|e| HampodError::transport("read tag", e))?;
    let tag = u16::from_le_bytes(tag_buf);

    if len > MAX_PAYLOAD_LEN {
        return Err(HampodError::FrameTooLarge { len });
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| HampodError::transport("read payload", e))?;

    let packet_type = PacketType::from_code(type_buf[0])?;

    Ok(Frame {
        packet_type,
        tag,
        payload: Bytes::from(payload),
    })
}
