//! Wire codec for firmware <-> software packets
//!
//! Separates encoding concerns from transport:
//! - **Codec**: How a packet is laid out on the wire (this module)
//! - **Transport**: How bytes flow (named pipes, socket pairs in tests)
//!
//! Frame layout, all integers little-endian:
//!
//! ```text
//! [type:1][length:2][tag:2][payload:length]    length <= 256
//! ```

mod frame;
mod packet_type;

pub use frame::{encode, read_frame, write_frame, Frame};
pub use packet_type::PacketType;

use bytes::Bytes;

use crate::constants::MAX_PAYLOAD_LEN;

/// Build a NUL-terminated text payload, optionally prefixed by a command byte
///
/// Text that would not fit is cut at a character boundary so the
/// terminator always fits inside the payload cap.
pub fn text_payload(prefix: Option<u8>, text: &str) -> Bytes {
    let room = MAX_PAYLOAD_LEN - 1 - usize::from(prefix.is_some());
    let mut end = text.len().min(room);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut out = Vec::with_capacity(end + 2);
    if let Some(p) = prefix {
        out.push(p);
    }
    out.extend_from_slice(&text.as_bytes()[..end]);
    out.push(0);
    Bytes::from(out)
}

/// Read a payload as text, stopping at the first NUL
pub fn payload_text(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}
