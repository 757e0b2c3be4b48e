//! Keypad poll thread
//!
//! Samples a `KeySource` once per tick, classifies, and forwards events to the
//! control loop through a channel. Stops on shutdown, on a closed channel, or
//! on a transport failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{HoldDetector, KeyEvent, KeySource, KeypadTiming};
use crate::error::{HampodError, Result};

/// Start polling `source` on a dedicated thread
pub fn spawn_poller<E>(
    mut source: Box<dyn KeySource>,
    timing: KeypadTiming,
    events: mpsc::Sender<E>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>>
where
    E: From<KeyEvent> + Send + 'static,
{
    thread::Builder::new()
        .name("hampod-keypad".to_string())
        .spawn(move || {
            let mut detector = HoldDetector::new(timing.hold_polls, timing.release_polls);
            info!("Keypad polling every {:?}", timing.poll_interval);

            while !shutdown.load(Ordering::Relaxed) {
                let sample = match source.read_key() {
                    Ok(sample) => sample,
                    Err(HampodError::Timeout { waited_ms }) => {
                        debug!("Keypad sample timed out after {} ms", waited_ms);
                        None
                    }
                    Err(HampodError::Shutdown) => break,
                    Err(e) => {
                        error!("Keypad polling stopped: {}", e);
                        break;
                    }
                };

                if let Some(event) = detector.tick(sample) {
                    debug!(
                        "Key {} {}",
                        event.key,
                        if event.is_hold { "held" } else { "pressed" }
                    );
                    if events.blocking_send(E::from(event)).is_err() {
                        break;
                    }
                }

                thread::sleep(timing.poll_interval);
            }
            debug!("Keypad poller stopped");
        })
        .map_err(|source| HampodError::Runtime { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct Scripted(VecDeque<Option<char>>);

    impl KeySource for Scripted {
        fn read_key(&mut self) -> Result<Option<char>> {
            match self.0.pop_front() {
                Some(sample) => Ok(sample),
                None => Err(HampodError::Shutdown),
            }
        }
    }

    #[test]
    fn test_poller_forwards_tap_and_hold() {
        let mut script: VecDeque<Option<char>> = VecDeque::new();
        script.extend(std::iter::repeat(Some('B')).take(6));
        script.extend(std::iter::repeat(None).take(4));
        script.push_back(Some('5'));

        let timing = KeypadTiming {
            poll_interval: Duration::from_millis(1),
            hold_polls: 5,
            release_polls: 3,
            ..KeypadTiming::default()
        };
        let (tx, mut rx) = mpsc::channel::<KeyEvent>(16);
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = spawn_poller(Box::new(Scripted(script)), timing, tx, shutdown).unwrap();
        handle.join().unwrap();

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert_eq!(
            events,
            vec![KeyEvent::tap('B'), KeyEvent::hold('B'), KeyEvent::tap('5')]
        );
    }

    #[test]
    fn test_poller_stops_on_shutdown_flag() {
        struct Idle;
        impl KeySource for Idle {
            fn read_key(&mut self) -> Result<Option<char>> {
                Ok(None)
            }
        }

        let (tx, _rx) = mpsc::channel::<KeyEvent>(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let timing = KeypadTiming {
            poll_interval: Duration::from_millis(1),
            ..KeypadTiming::default()
        };
        let handle = spawn_poller(Box::new(Idle), timing, tx, shutdown.clone()).unwrap();
        thread::sleep(Duration::from_millis(10));
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }
}
