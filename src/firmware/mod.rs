//! Firmware-side request server
//!
//! Reads one request frame at a time and writes exactly one response with
//! the same type and tag. The handler decides the payload.

mod handler;

pub use handler::FirmwareHandler;

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::codec::{read_frame, write_frame, Frame};
use crate::error::{HampodError, Result};
use crate::logging::{PacketTrace, TraceSink};
use crate::transport::TransportChannels;

/// Produces the response payload for one request
pub trait RequestHandler {
    fn handle(&mut self, request: &Frame) -> Bytes;
}

/// Serve requests until the peer closes or `shutdown` is set
///
/// Returns the number of requests answered.
pub fn serve<H: RequestHandler + ?Sized>(
    channels: TransportChannels,
    handler: &mut H,
    shutdown: &AtomicBool,
    trace: Option<TraceSink>,
) -> Result<u64> {
    let TransportChannels {
        mut reader,
        mut writer,
    } = channels;
    let mut served = 0u64;
    info!("Serving requests");

    while !shutdown.load(Ordering::Relaxed) {
        let request = match read_frame(&mut reader) {
            Ok(frame) => frame,
            Err(HampodError::Transport { context: "read type", source })
                if source.kind() == ErrorKind::UnexpectedEof =>
            {
                info!("Control side closed the channel");
                break;
            }
            Err(HampodError::UnknownPacketType { code }) => {
                // Header and payload were consumed; the stream is still aligned
                warn!("Request with unknown type 0x{:02x} ignored", code);
                continue;
            }
            Err(e) => {
                error!("Request channel failed: {}", e);
                return Err(e);
            }
        };
        if let Some(sink) = &trace {
            sink.record(PacketTrace::inbound(&request));
        }
        debug!("<- {} tag={}", request.packet_type, request.tag);

        let payload = handler.handle(&request);
        let response = Frame::new(request.packet_type, request.tag, payload)?;
        write_frame(&mut writer, &response)?;
        if let Some(sink) = &trace {
            sink.record(PacketTrace::outbound(&response));
        }
        served += 1;
    }

    debug!("Request server stopped after {} requests", served);
    Ok(served)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::codec::PacketType;
    use std::thread;

    /// Answers every request with its own payload reversed
    struct Reverse;

    impl RequestHandler for Reverse {
        fn handle(&mut self, request: &Frame) -> Bytes {
            let mut bytes = request.payload.to_vec();
            bytes.reverse();
            Bytes::from(bytes)
        }
    }

    #[test]
    fn test_response_echoes_type_and_tag() {
        let (mut control, firmware) = TransportChannels::pair().unwrap();
        let server = thread::spawn(move || {
            let shutdown = AtomicBool::new(false);
            serve(firmware, &mut Reverse, &shutdown, None)
        });

        let request = Frame::new(PacketType::Config, 513, &b"abc"[..]).unwrap();
        write_frame(&mut control.writer, &request).unwrap();
        let response = read_frame(&mut control.reader).unwrap();

        assert_eq!(response.packet_type, PacketType::Config);
        assert_eq!(response.tag, 513);
        assert_eq!(response.payload.as_ref(), b"cba");

        drop(control);
        assert_eq!(server.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_unknown_type_skipped() {
        use std::io::Write;

        let (mut control, firmware) = TransportChannels::pair().unwrap();
        let server = thread::spawn(move || {
            let shutdown = AtomicBool::new(false);
            serve(firmware, &mut Reverse, &shutdown, None)
        });

        // type 9, length 1, tag 7, payload 'x'
        control.writer.write_all(&[9, 1, 0, 7, 0, b'x']).unwrap();
        write_frame(
            &mut control.writer,
            &Frame::new(PacketType::Keypad, 8, &b"r"[..]).unwrap(),
        )
        .unwrap();

        let response = read_frame(&mut control.reader).unwrap();
        assert_eq!(response.tag, 8);

        drop(control);
        assert_eq!(server.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_shutdown_flag_checked_before_reading() {
        let (_control, firmware) = TransportChannels::pair().unwrap();
        let shutdown = AtomicBool::new(true);
        assert_eq!(serve(firmware, &mut Reverse, &shutdown, None).unwrap(), 0);
    }
}
