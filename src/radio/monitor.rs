//! Radio change monitor
//!
//! Polls the rig frequency and reports dial changes to the control loop.
//! While disconnected it retries the connection once per interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{RadioControl, RadioResult, Rig};
use crate::error::{HampodError, RadioError, Result};

/// Frequency moved by something other than this process (Hz)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyChanged(pub u64);

/// Opens a fresh rig connection
pub type Reconnect = Box<dyn Fn() -> RadioResult<Box<dyn Rig>> + Send>;

pub fn spawn_monitor<E>(
    radio: Arc<RadioControl>,
    interval: Duration,
    reconnect: Option<Reconnect>,
    events: mpsc::Sender<E>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>>
where
    E: From<FrequencyChanged> + Send + 'static,
{
    thread::Builder::new()
        .name("hampod-radio-monitor".to_string())
        .spawn(move || {
            let mut reported_down = false;

            while !shutdown.load(Ordering::Relaxed) {
                if !radio.is_connected() {
                    if let Some(connect) = &reconnect {
                        match connect() {
                            Ok(rig) => {
                                radio.attach(rig);
                                reported_down = false;
                            }
                            Err(e) if !reported_down => {
                                info!("Radio unavailable, retrying: {}", e);
                                reported_down = true;
                            }
                            Err(_) => {}
                        }
                    }
                }

                match radio.poll_frequency_change() {
                    Ok(Some(hz)) => {
                        debug!("Dial moved to {} Hz", hz);
                        if events.blocking_send(E::from(FrequencyChanged(hz))).is_err() {
                            break;
                        }
                    }
                    Ok(None) | Err(RadioError::Disconnected) => {}
                    Err(e) => debug!("Frequency poll failed: {}", e),
                }

                thread::sleep(interval);
            }
            debug!("Radio monitor stopped");
        })
        .map_err(|source| HampodError::Runtime { source })
}
