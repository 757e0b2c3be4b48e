//! Response router
//!
//! A dedicated thread decodes frames off the inbound channel and pushes each
//! into the queue registered for its packet type, in wire order. Requesters
//! pop their queue through a [`Client`].
//!
//! The reader stops on the first decode failure; every queue is then shut
//! down so blocked requesters return instead of waiting out their deadline.

mod client;
mod queue;
mod stats;

pub use client::Client;
pub use queue::{PopError, ResponseQueue};
pub use stats::RouterStats;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::codec::{read_frame, PacketType};
use crate::error::{HampodError, Result};
use crate::logging::{PacketTrace, TraceSink};
use crate::transport::ByteReader;

/// Queues shared between the reader thread and requesters
pub type QueueMap = Arc<HashMap<PacketType, Arc<ResponseQueue>>>;

/// Running router: owns the reader thread and the per-type queues
pub struct Router {
    queues: QueueMap,
    stats: Arc<RouterStats>,
    trace: Option<TraceSink>,
    handle: Option<JoinHandle<()>>,
}

impl Router {
    /// Start the reader thread with one queue per listed packet type
    pub fn spawn(
        reader: ByteReader,
        streams: &[PacketType],
        capacity: usize,
        trace: Option<TraceSink>,
    ) -> Result<Self> {
        let queues: QueueMap = Arc::new(
            streams
                .iter()
                .map(|&t| (t, Arc::new(ResponseQueue::new(capacity))))
                .collect(),
        );
        let stats = Arc::new(RouterStats::new());

        let thread_queues = queues.clone();
        let thread_stats = stats.clone();
        let thread_trace = trace.clone();
        let handle = thread::Builder::new()
            .name("hampod-router".to_string())
            .spawn(move || run_reader(reader, thread_queues, thread_stats, thread_trace))
            .map_err(|source| HampodError::Runtime { source })?;

        Ok(Self {
            queues,
            stats,
            trace,
            handle: Some(handle),
        })
    }

    /// Queue receiving responses of `packet_type`
    pub fn queue(&self, packet_type: PacketType) -> Option<Arc<ResponseQueue>> {
        self.queues.get(&packet_type).cloned()
    }

    pub fn queues(&self) -> QueueMap {
        self.queues.clone()
    }

    pub fn stats(&self) -> Arc<RouterStats> {
        self.stats.clone()
    }

    pub fn trace(&self) -> Option<TraceSink> {
        self.trace.clone()
    }

    /// Shut down every queue, waking blocked requesters
    pub fn shutdown(&self) {
        for queue in self.queues.values() {
            queue.shutdown();
        }
    }

    /// Whether the reader thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the reader thread; returns once the inbound channel closes
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_reader(
    mut reader: ByteReader,
    queues: QueueMap,
    stats: Arc<RouterStats>,
    trace: Option<TraceSink>,
) {
    debug!("Router reader started");

    loop {
        let frame = match read_frame(&mut reader) {
            Ok(frame) => frame,
            Err(HampodError::Transport { context: "read type", source })
                if source.kind() == ErrorKind::UnexpectedEof =>
            {
                info!("Inbound channel closed");
                break;
            }
            Err(e) => {
                error!("Inbound channel failed: {}", e);
                break;
            }
        };

        stats.add_in();
        if let Some(sink) = &trace {
            sink.record(PacketTrace::inbound(&frame));
        }
        debug!(
            "<- {} tag={} ({} B)",
            frame.packet_type,
            frame.tag,
            frame.payload.len()
        );

        match queues.get(&frame.packet_type) {
            Some(queue) => {
                if let Some(old) = queue.push(frame) {
                    stats.add_evicted();
                    warn!("{} queue full, dropped tag={}", old.packet_type, old.tag);
                }
            }
            None => {
                stats.add_mismatch();
                warn!(
                    "No queue for {} frame (tag={}), discarded",
                    frame.packet_type, frame.tag
                );
            }
        }
    }

    for queue in queues.values() {
        queue.shutdown();
    }
    debug!("Router reader stopped");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::codec::{write_frame, Frame};
    use crate::transport::TransportChannels;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_frames_routed_by_type() {
        let (mut peer, local) = TransportChannels::pair().unwrap();
        let router = Router::spawn(
            local.reader,
            &[PacketType::Keypad, PacketType::Audio],
            4,
            None,
        )
        .unwrap();

        write_frame(&mut peer.writer, &Frame::new(PacketType::Audio, 1, vec![0u8]).unwrap())
            .unwrap();
        write_frame(&mut peer.writer, &Frame::new(PacketType::Keypad, 2, &b"5"[..]).unwrap())
            .unwrap();

        let keypad = router.queue(PacketType::Keypad).unwrap();
        let audio = router.queue(PacketType::Audio).unwrap();
        assert_eq!(keypad.pop_with_timeout(Duration::from_secs(1)).unwrap().tag, 2);
        assert_eq!(audio.pop_with_timeout(Duration::from_secs(1)).unwrap().tag, 1);
    }

    #[test]
    fn test_unregistered_type_discarded() {
        let (mut peer, local) = TransportChannels::pair().unwrap();
        let router = Router::spawn(local.reader, &[PacketType::Keypad], 4, None).unwrap();

        write_frame(&mut peer.writer, &Frame::new(PacketType::Config, 1, vec![0u8]).unwrap())
            .unwrap();
        write_frame(&mut peer.writer, &Frame::new(PacketType::Keypad, 2, &b"-"[..]).unwrap())
            .unwrap();

        let keypad = router.queue(PacketType::Keypad).unwrap();
        assert_eq!(keypad.pop_with_timeout(Duration::from_secs(1)).unwrap().tag, 2);
        assert_eq!(router.stats().mismatched(), 1);
        assert!(router.queue(PacketType::Config).is_none());
    }

    #[test]
    fn test_decode_failure_shuts_down_queues() {
        let (mut peer, local) = TransportChannels::pair().unwrap();
        let router = Router::spawn(local.reader, &[PacketType::Keypad], 4, None).unwrap();

        write_frame(&mut peer.writer, &Frame::new(PacketType::Keypad, 3, &b"7"[..]).unwrap())
            .unwrap();
        // Unknown type code 0x09 stops the reader
        peer.writer.write_all(&[0x09, 0, 0, 0, 0]).unwrap();

        let keypad = router.queue(PacketType::Keypad).unwrap();
        // Already delivered frame is still poppable
        assert_eq!(keypad.pop_with_timeout(Duration::from_secs(1)).unwrap().tag, 3);
        assert_eq!(
            keypad.pop_with_timeout(Duration::from_secs(1)).unwrap_err(),
            PopError::Shutdown
        );
        router.join();
    }

    #[test]
    fn test_peer_close_stops_reader() {
        let (peer, local) = TransportChannels::pair().unwrap();
        let router = Router::spawn(local.reader, &[PacketType::Keypad], 4, None).unwrap();
        drop(peer);

        let keypad = router.queue(PacketType::Keypad).unwrap();
        assert_eq!(
            keypad.pop_with_timeout(Duration::from_secs(1)).unwrap_err(),
            PopError::Shutdown
        );
        router.join();
    }
}
