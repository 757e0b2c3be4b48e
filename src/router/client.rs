//! Request side of the router
//!
//! Writes a request frame with a fresh tag, then pops the queue for its
//! packet type until a frame with the same tag arrives or the deadline
//! passes. Frames with any other tag are late answers to earlier requests;
//! they are logged and dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{PopError, QueueMap, Router, RouterStats};
use crate::codec::{write_frame, Frame, PacketType};
use crate::error::{HampodError, Result};
use crate::logging::{PacketTrace, TraceSink};
use crate::transport::ByteWriter;

/// Shared requester; cheap to clone, usable from any thread
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    writer: Mutex<ByteWriter>,
    next_tag: AtomicU16,
    queues: QueueMap,
    /// One in-flight request per stream, so responses are not stolen
    in_flight: HashMap<PacketType, Mutex<()>>,
    stats: Arc<RouterStats>,
    trace: Option<TraceSink>,
}

impl Client {
    /// Pair an outbound channel with a running router
    pub fn new(writer: ByteWriter, router: &Router) -> Self {
        let queues = router.queues();
        let in_flight = queues.keys().map(|&t| (t, Mutex::new(()))).collect();
        Self {
            inner: Arc::new(ClientInner {
                writer: Mutex::new(writer),
                next_tag: AtomicU16::new(0),
                queues,
                in_flight,
                stats: router.stats(),
                trace: router.trace(),
            }),
        }
    }

    /// Allocate the next correlation tag (wraps at u16::MAX)
    fn next_tag(&self) -> u16 {
        self.inner.next_tag.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a request and wait for the response carrying the same tag
    pub fn request(
        &self,
        packet_type: PacketType,
        payload: impl Into<Bytes>,
        timeout: Duration,
    ) -> Result<Frame> {
        let queue = self
            .inner
            .queues
            .get(&packet_type)
            .ok_or_else(|| HampodError::Protocol {
                message: format!("no response stream for {}", packet_type),
            })?;
        let _slot = self.inner.in_flight.get(&packet_type).map(|m| m.lock());

        let frame = Frame::new(packet_type, self.next_tag(), payload)?;
        let tag = frame.tag;
        self.send(&frame)?;

        let start = Instant::now();
        let deadline = start + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match queue.pop_with_timeout(remaining) {
                Ok(response) if response.tag == tag => return Ok(response),
                Ok(response) => {
                    self.inner.stats.add_mismatch();
                    warn!(
                        "{} response tag={} does not match request tag={}, discarded",
                        packet_type, response.tag, tag
                    );
                }
                Err(PopError::Shutdown) => return Err(HampodError::Shutdown),
                Err(PopError::Timeout) => {
                    return Err(HampodError::Timeout {
                        waited_ms: start.elapsed().as_millis() as u64,
                    })
                }
                Err(PopError::NotFound) => {}
            }
            if Instant::now() >= deadline {
                return Err(HampodError::Timeout {
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }
        }
    }

    fn send(&self, frame: &Frame) -> Result<()> {
        {
            let mut writer = self.inner.writer.lock();
            write_frame(&mut *writer, frame)?;
        }
        self.inner.stats.add_out();
        if let Some(sink) = &self.inner.trace {
            sink.record(PacketTrace::outbound(frame));
        }
        debug!(
            "-> {} tag={} ({} B)",
            frame.packet_type,
            frame.tag,
            frame.payload.len()
        );
        Ok(())
    }
}
