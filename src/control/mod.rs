//! Software-side control loop
//!
//! Consumes classified key events and radio change notifications from one
//! channel and feeds them to the `ControlContext` it owns.

mod context;

pub use context::ControlContext;

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{HampodError, Result};
use crate::keypad::KeyEvent;
use crate::overlay::Speaker;
use crate::radio::FrequencyChanged;

/// Input to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Key(KeyEvent),
    /// Radio frequency moved outside this process (Hz)
    FrequencyChanged(u64),
}

impl From<KeyEvent> for ControlEvent {
    fn from(event: KeyEvent) -> Self {
        ControlEvent::Key(event)
    }
}

impl From<FrequencyChanged> for ControlEvent {
    fn from(change: FrequencyChanged) -> Self {
        ControlEvent::FrequencyChanged(change.0)
    }
}

/// Run the control loop on its own thread until every sender is gone
///
/// Returns the context when the loop ends.
pub fn spawn_control_loop<S>(
    mut ctx: ControlContext<S>,
    mut events: mpsc::Receiver<ControlEvent>,
) -> Result<JoinHandle<ControlContext<S>>>
where
    S: Speaker + Send + 'static,
{
    thread::Builder::new()
        .name("hampod-control".to_string())
        .spawn(move || {
            while let Some(event) = events.blocking_recv() {
                match event {
                    ControlEvent::Key(key) => ctx.handle_key(key),
                    ControlEvent::FrequencyChanged(hz) => ctx.on_radio_change(hz),
                }
            }
            debug!("Control loop stopped");
            ctx
        })
        .map_err(|source| HampodError::Runtime { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Transcript;
    use crate::radio::{DummyRig, RadioControl};
    use std::sync::Arc;

    #[test]
    fn test_loop_drains_events_then_returns_context() {
        let radio = Arc::new(RadioControl::new(Box::new(DummyRig::new())));
        let ctx = ControlContext::new(radio, Transcript::new());
        let (tx, rx) = mpsc::channel(8);

        let handle = spawn_control_loop(ctx, rx).unwrap();
        tx.blocking_send(ControlEvent::FrequencyChanged(10_000_000)).unwrap();
        tx.blocking_send(KeyEvent::tap('#').into()).unwrap();
        drop(tx);

        let ctx = handle.join().unwrap();
        assert_eq!(
            ctx.speech().lines,
            vec!["10 megahertz", "Current VFO"]
        );
    }
}
