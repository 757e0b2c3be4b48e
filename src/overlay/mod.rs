//! Overlay input modes
//!
//! An overlay reinterprets keypad events while active. Each exposes
//! `handle_key(...) -> bool`; `true` means the key was consumed and must not
//! reach any other handler.

mod frequency_mode;
mod set_mode;

pub use frequency_mode::{frequency_phrase, FreqState, FrequencyMode};
pub use set_mode::{describe_parameter, SetMode, SetParam, SetState};

/// Spoken feedback sink
pub trait Speaker {
    fn say(&mut self, text: &str);
}

impl<S: Speaker + ?Sized> Speaker for &mut S {
    fn say(&mut self, text: &str) {
        (**self).say(text)
    }
}

impl<S: Speaker + ?Sized> Speaker for Box<S> {
    fn say(&mut self, text: &str) {
        (**self).say(text)
    }
}

/// Collects phrases instead of speaking them
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    pub lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

impl Speaker for Transcript {
    fn say(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}
