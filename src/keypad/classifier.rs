//! Tap/hold classification under lossy polling
//!
//! The hardware scan drops samples while a key is held, so a missing sample
//! does not mean release. Hold time keeps accumulating through gaps; only a
//! run of `release_polls` empty samples resets to the no-key baseline.

use super::KeyEvent;

/// Per-press classifier state, advanced once per poll tick
#[derive(Debug, Clone)]
pub struct HoldDetector {
    hold_polls: u32,
    release_polls: u32,
    last_key: Option<char>,
    hold_count: u32,
    idle_count: u32,
    hold_announced: bool,
}

impl HoldDetector {
    pub fn new(hold_polls: u32, release_polls: u32) -> Self {
        Self {
            hold_polls: hold_polls.max(1),
            release_polls: release_polls.max(1),
            last_key: None,
            hold_count: 0,
            idle_count: 0,
            hold_announced: false,
        }
    }

    /// Key currently considered down
    pub fn current_key(&self) -> Option<char> {
        self.last_key
    }

    /// Feed one sample; returns at most one event
    pub fn tick(&mut self, sample: Option<char>) -> Option<KeyEvent> {
        match (sample, self.last_key) {
            (Some(key), Some(last)) if key == last => {
                self.idle_count = 0;
                self.hold_count = self.hold_count.saturating_add(1);
                self.check_hold(key)
            }
            (Some(key), _) => {
                self.last_key = Some(key);
                self.hold_count = 1;
                self.idle_count = 0;
                self.hold_announced = false;
                Some(KeyEvent::tap(key))
            }
            (None, Some(last)) => {
                self.idle_count += 1;
                self.hold_count = self.hold_count.saturating_add(1);
                let event = self.check_hold(last);
                if self.idle_count >= self.release_polls {
                    self.reset();
                }
                event
            }
            (None, None) => None,
        }
    }

    fn check_hold(&mut self, key: char) -> Option<KeyEvent> {
        if self.hold_count >= self.hold_polls && !self.hold_announced {
            self.hold_announced = true;
            Some(KeyEvent::hold(key))
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.last_key = None;
        self.hold_count = 0;
        self.idle_count = 0;
        self.hold_announced = false;
    }
}
