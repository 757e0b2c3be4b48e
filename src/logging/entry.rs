//! Packet trace entries
//!
//! One entry per frame crossing the transport, in either direction.

use crate::codec::{Frame, PacketType};

/// Direction of a traced frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,  // Peer -> us
    Out, // Us -> peer
}

/// One frame seen on the wire
#[derive(Debug, Clone)]
pub struct PacketTrace {
    pub timestamp: String, // HH:MM:SS.mmm
    pub direction: Direction,
    pub packet_type: PacketType,
    pub tag: u16,
    pub size: usize,
}

impl PacketTrace {
    /// Current timestamp as HH:MM:SS.mmm
    #[inline]
    fn now() -> String {
        chrono::Local::now().format("%H:%M:%S%.3f").to_string()
    }

    fn new(direction: Direction, frame: &Frame) -> Self {
        Self {
            timestamp: Self::now(),
            direction,
            packet_type: frame.packet_type,
            tag: frame.tag,
            size: frame.payload.len(),
        }
    }

    /// Trace an incoming frame
    pub fn inbound(frame: &Frame) -> Self {
        Self::new(Direction::In, frame)
    }

    /// Trace an outgoing frame
    pub fn outbound(frame: &Frame) -> Self {
        Self::new(Direction::Out, frame)
    }

    /// Single-line text form used by the trace file
    pub fn format_line(&self) -> String {
        let dir = match self.direction {
            Direction::In => "IN",
            Direction::Out => "OUT",
        };
        format!(
            "{} {:<3} {:<6} tag={} ({} B)",
            self.timestamp, dir, self.packet_type, self.tag, self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let frame = Frame::new(PacketType::Audio, 42, &b"shi\0"[..]).unwrap();
        let mut trace = PacketTrace::outbound(&frame);
        trace.timestamp = "12:00:00.000".to_string();
        assert_eq!(trace.format_line(), "12:00:00.000 OUT AUDIO  tag=42 (4 B)");
    }

    #[test]
    fn test_timestamp_shape() {
        let frame = Frame::new(PacketType::Keypad, 0, &b"r"[..]).unwrap();
        let trace = PacketTrace::inbound(&frame);
        // HH:MM:SS.mmm
        assert_eq!(trace.timestamp.len(), 12);
        assert_eq!(trace.direction, Direction::In);
    }
}
