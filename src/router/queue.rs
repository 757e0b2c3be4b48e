//! Bounded response queue
//!
//! FIFO of frames guarded by one mutex and a condition variable. Pushing
//! never blocks: at capacity the oldest frame is evicted to make room.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::codec::Frame;

/// Why a pop returned without a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopError {
    /// Deadline passed with the queue still empty
    Timeout,
    /// Queue stopped and drained
    Shutdown,
    /// Woken while running but another popper took the frame
    NotFound,
}

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopError::Timeout => f.write_str("timed out"),
            PopError::Shutdown => f.write_str("queue shut down"),
            PopError::NotFound => f.write_str("no frame available"),
        }
    }
}

impl std::error::Error for PopError {}

struct QueueState {
    items: VecDeque<Frame>,
    running: bool,
}

/// Bounded, timeout-aware FIFO of frames
pub struct ResponseQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    capacity: usize,
}

impl ResponseQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                running: true,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append a frame, returning the oldest one if it had to be evicted
    pub fn push(&self, frame: Frame) -> Option<Frame> {
        let evicted = {
            let mut state = self.state.lock();
            let evicted = if state.items.len() >= self.capacity {
                state.items.pop_front()
            } else {
                None
            };
            state.items.push_back(frame);
            evicted
        };
        self.available.notify_one();
        evicted
    }

    /// Take the oldest frame, waiting up to `timeout` for one to arrive
    ///
    /// Frames still queued are returned even after shutdown.
    pub fn pop_with_timeout(&self, timeout: Duration) -> Result<Frame, PopError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        if let Some(frame) = state.items.pop_front() {
            return Ok(frame);
        }
        if !state.running {
            return Err(PopError::Shutdown);
        }

        let wait = self.available.wait_until(&mut state, deadline);

        if let Some(frame) = state.items.pop_front() {
            Ok(frame)
        } else if !state.running {
            Err(PopError::Shutdown)
        } else if wait.timed_out() {
            Err(PopError::Timeout)
        } else {
            Err(PopError::NotFound)
        }
    }

    /// Stop the queue and wake every blocked popper
    pub fn shutdown(&self) {
        self.state.lock().running = false;
        self.available.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PacketType;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn frame(tag: u16) -> Frame {
        Frame::new(PacketType::Keypad, tag, &b"1"[..]).unwrap()
    }

    #[test]
    fn test_pop_timeout_on_empty_queue() {
        let queue = ResponseQueue::new(4);
        let start = Instant::now();
        let result = queue.pop_with_timeout(Duration::from_millis(100));
        let elapsed = start.elapsed();

        assert_eq!(result.unwrap_err(), PopError::Timeout);
        assert!(elapsed >= Duration::from_millis(90), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(200), "{:?}", elapsed);
    }

    #[test]
    fn test_fifo_order() {
        let queue = ResponseQueue::new(8);
        for tag in 1..=3 {
            assert!(queue.push(frame(tag)).is_none());
        }
        for tag in 1..=3 {
            let f = queue.pop_with_timeout(Duration::from_millis(10)).unwrap();
            assert_eq!(f.tag, tag);
        }
    }

    #[test]
    fn test_push_at_capacity_evicts_oldest() {
        let queue = ResponseQueue::new(4);
        for tag in 1..=4 {
            assert!(queue.push(frame(tag)).is_none());
        }
        let evicted = queue.push(frame(5)).unwrap();
        assert_eq!(evicted.tag, 1);
        assert_eq!(queue.len(), 4);

        let first = queue.pop_with_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(first.tag, 2);
    }

    #[test]
    fn test_producer_consumer() {
        let queue = Arc::new(ResponseQueue::new(4));
        let producer_queue = queue.clone();
        let producer = thread::spawn(move || {
            for tag in 1..=3 {
                thread::sleep(Duration::from_millis(10));
                producer_queue.push(frame(tag));
            }
        });

        let mut got = Vec::new();
        for _ in 0..3 {
            let f = queue.pop_with_timeout(Duration::from_millis(500)).unwrap();
            got.push(f.tag);
        }
        producer.join().unwrap();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn test_shutdown_wakes_blocked_pop() {
        let queue = Arc::new(ResponseQueue::new(4));
        let popper_queue = queue.clone();
        let popper = thread::spawn(move || {
            let start = Instant::now();
            let result = popper_queue.pop_with_timeout(Duration::from_secs(5));
            (result, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        queue.shutdown();

        let (result, elapsed) = popper.join().unwrap();
        assert!(matches!(
            result,
            Err(PopError::Shutdown) | Err(PopError::NotFound)
        ));
        assert!(elapsed < Duration::from_secs(1), "{:?}", elapsed);
        assert!(!queue.is_running());
    }

    #[test]
    fn test_queued_frames_survive_shutdown() {
        let queue = ResponseQueue::new(4);
        queue.push(frame(9));
        queue.shutdown();

        assert_eq!(queue.pop_with_timeout(Duration::ZERO).unwrap().tag, 9);
        assert_eq!(
            queue.pop_with_timeout(Duration::ZERO).unwrap_err(),
            PopError::Shutdown
        );
    }

    proptest! {
        #[test]
        fn prop_newest_capacity_items_remain(capacity in 1usize..8, pushes in 0u16..32) {
            let queue = ResponseQueue::new(capacity);
            for tag in 0..pushes {
                queue.push(frame(tag));
            }

            let expected: Vec<u16> = (0..pushes)
                .skip((pushes as usize).saturating_sub(capacity))
                .collect();
            let mut got = Vec::new();
            while let Ok(f) = queue.pop_with_timeout(Duration::ZERO) {
                got.push(f.tag);
            }
            prop_assert_eq!(got, expected);
        }
    }
}
