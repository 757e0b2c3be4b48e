//! Transport abstraction for byte-level I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: How bytes flow (named pipes, socket pairs)
//! - **Codec**: How packets are framed (see `crate::codec`)
//!
//! A transport is two independent one-way byte channels. The side that
//! writes requests reads responses, and vice versa. Neither channel knows
//! about frames; `crate::router` layers framing and routing on top.

#[cfg(unix)]
pub mod pipe;

#[cfg(unix)]
pub use pipe::{PipePaths, PipeTransport};

use std::io::{Read, Write};
use std::time::Duration;

use crate::constants::{CONNECT_RETRY_ATTEMPTS, CONNECT_RETRY_DELAY_MS};

/// Boxed inbound byte channel
pub type ByteReader = Box<dyn Read + Send>;

/// Boxed outbound byte channel
pub type ByteWriter = Box<dyn Write + Send>;

/// The two halves of an open transport
///
/// Each half can move to its own thread: the router owns the reader,
/// whoever sends frames owns the writer.
pub struct TransportChannels {
    /// Bytes arriving from the peer
    pub reader: ByteReader,
    /// Bytes going to the peer
    pub writer: ByteWriter,
}

impl TransportChannels {
    pub fn new(reader: impl Read + Send + 'static, writer: impl Write + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Connected in-process pair, one end per side
    ///
    /// Used to wire the firmware and software sides inside one process
    /// (tests, simulation).
    #[cfg(unix)]
    pub fn pair() -> std::io::Result<(TransportChannels, TransportChannels)> {
        use std::os::unix::net::UnixStream;

        let (a, b) = UnixStream::pair()?;
        let a_writer = a.try_clone()?;
        let b_writer = b.try_clone()?;
        Ok((
            TransportChannels::new(a, a_writer),
            TransportChannels::new(b, b_writer),
        ))
    }
}

/// Bounded retry policy for opening a channel the peer has not created yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: CONNECT_RETRY_ATTEMPTS,
            delay: Duration::from_millis(CONNECT_RETRY_DELAY_MS),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_pair_carries_bytes_both_ways() {
        let (mut a, mut b) = TransportChannels::pair().unwrap();

        a.writer.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        b.reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        b.writer.write_all(b"pong").unwrap();
        a.reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn test_default_retry_window_is_about_ten_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 1000);
        assert_eq!(policy.delay, Duration::from_millis(10));
    }
}
