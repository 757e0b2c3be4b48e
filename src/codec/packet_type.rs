//! Packet type codes
//!
//! The type travels as one explicit byte. The mapping below is the wire
//! contract; enum discriminants are never written directly.

use std::fmt;

use crate::error::{HampodError, Result};

/// Kind of packet exchanged between firmware and software
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Key sample request/response
    Keypad,
    /// Speech or audio clip playback
    Audio,
    /// Audio/speech settings
    Config,
}

impl PacketType {
    /// All packet types, in wire-code order
    pub const ALL: [PacketType; 3] = [PacketType::Keypad, PacketType::Audio, PacketType::Config];

    /// Wire code for this type
    pub fn code(self) -> u8 {
        match self {
            PacketType::Keypad => 0x00,
            PacketType::Audio => 0x01,
            PacketType::Config => 0x02,
        }
    }

    /// Map a wire code back to a type
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(PacketType::Keypad),
            0x01 => Ok(PacketType::Audio),
            0x02 => Ok(PacketType::Config),
            _ => Err(HampodError::UnknownPacketType { code }),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketType::Keypad => "KEYPAD",
            PacketType::Audio => "AUDIO",
            PacketType::Config => "CONFIG",
        };
        f.pad(name)
    }
}
