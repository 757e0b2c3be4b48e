//! Keypad input engine
//!
//! - `HoldDetector` turns raw per-tick samples into tap/hold events
//! - `KeySource` yields one sample per tick (remote firmware, stdin)
//! - `spawn_poller` drives a source on its own thread

mod classifier;
mod poller;
mod source;

pub use classifier::HoldDetector;
pub use poller::spawn_poller;
pub use source::{is_key_symbol, KeySource, RemoteKeypad, StdinKeys};

use std::time::Duration;

use crate::constants::{
    KEYPAD_HOLD_POLLS, KEYPAD_HOLD_THRESHOLD_MS, KEYPAD_POLL_INTERVAL_MS, KEYPAD_RELEASE_POLLS,
};

/// Classified key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: char,
    /// Shift level active when the key was pressed
    pub shift: u8,
    pub is_hold: bool,
}

impl KeyEvent {
    pub fn tap(key: char) -> Self {
        Self {
            key,
            shift: 0,
            is_hold: false,
        }
    }

    pub fn hold(key: char) -> Self {
        Self {
            key,
            shift: 0,
            is_hold: true,
        }
    }

    pub fn is_shifted(&self) -> bool {
        self.shift > 0
    }
}

/// Poller timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadTiming {
    pub poll_interval: Duration,
    pub hold_polls: u32,
    pub release_polls: u32,
    /// Hold threshold used by overlay key handling; independent of `hold_polls`
    pub hold_threshold: Duration,
}

impl Default for KeypadTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(KEYPAD_POLL_INTERVAL_MS),
            hold_polls: KEYPAD_HOLD_POLLS,
            release_polls: KEYPAD_RELEASE_POLLS,
            hold_threshold: Duration::from_millis(KEYPAD_HOLD_THRESHOLD_MS),
        }
    }
}
