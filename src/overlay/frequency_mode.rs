//! Frequency entry
//!
//! `#` enters, picks a VFO, digits and one `*` decimal point build a MHz
//! value, `#` submits. Every exit path (submit, cancel, reject) lands back in
//! `Idle` with an empty buffer.

use tracing::debug;

use super::Speaker;
use crate::constants::{MAX_FREQ_DIGITS, MAX_FREQ_MHZ, MIN_FREQ_MHZ};
use crate::radio::{RadioControl, Vfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreqState {
    Idle,
    SelectVfo,
    Entering,
}

pub struct FrequencyMode {
    state: FreqState,
    vfo: Vfo,
    buffer: String,
}

impl Default for FrequencyMode {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyMode {
    pub fn new() -> Self {
        Self {
            state: FreqState::Idle,
            vfo: Vfo::Current,
            buffer: String::with_capacity(MAX_FREQ_DIGITS),
        }
    }

    pub fn state(&self) -> FreqState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != FreqState::Idle
    }

    pub fn selected_vfo(&self) -> Vfo {
        self.vfo
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Abandon entry without feedback
    pub fn cancel(&mut self) {
        if self.state != FreqState::Idle {
            self.reset();
            debug!("Frequency entry cancelled");
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.state = FreqState::Idle;
    }

    fn cancel_spoken(&mut self, speech: &mut dyn Speaker) {
        self.reset();
        speech.say("Cancelled");
    }

    fn has_point(&self) -> bool {
        self.buffer.contains('.')
    }

    fn push_digit(&mut self, key: char, speech: &mut dyn Speaker) {
        if self.buffer.len() < MAX_FREQ_DIGITS {
            self.buffer.push(key);
            speech.say(&key.to_string());
        }
    }

    pub fn handle_key(
        &mut self,
        key: char,
        _is_hold: bool,
        radio: &RadioControl,
        speech: &mut dyn Speaker,
    ) -> bool {
        debug!("Frequency mode key {:?} in {:?}", key, self.state);

        match self.state {
            FreqState::Idle => {
                if key != '#' {
                    return false;
                }
                self.state = FreqState::SelectVfo;
                speech.say(self.vfo.spoken());
            }
            FreqState::SelectVfo => match key {
                '#' => {
                    self.vfo = self.vfo.next();
                    speech.say(self.vfo.spoken());
                }
                '0'..='9' => {
                    self.state = FreqState::Entering;
                    self.push_digit(key, speech);
                }
                '*' | 'D' => self.cancel_spoken(speech),
                _ => {}
            },
            FreqState::Entering => match key {
                '0'..='9' => self.push_digit(key, speech),
                '*' if self.has_point() => self.cancel_spoken(speech),
                '*' => {
                    if self.buffer.len() < MAX_FREQ_DIGITS {
                        self.buffer.push('.');
                        speech.say("point");
                    }
                }
                '#' => self.submit(radio, speech),
                'D' => self.cancel_spoken(speech),
                _ => {}
            },
        }
        true
    }

    fn submit(&mut self, radio: &RadioControl, speech: &mut dyn Speaker) {
        let Some(hz) = parse_mhz(&self.buffer) else {
            speech.say("Invalid frequency");
            self.reset();
            return;
        };
        debug!("Submitting {} Hz on {:?}", hz, self.vfo);

        let applied = match self.vfo {
            Vfo::Current => Ok(()),
            vfo => radio.set_vfo(vfo),
        }
        .and_then(|_| radio.set_frequency(hz));

        match applied {
            Ok(()) => {
                speech.say("Frequency set");
                speech.say(&frequency_phrase(hz));
            }
            Err(e) => {
                debug!("Frequency not applied: {}", e);
                speech.say("Failed to set frequency");
            }
        }
        self.reset();
    }

    /// Announce a frequency the radio moved to on its own; silent during entry
    pub fn on_radio_change(&mut self, hz: u64, speech: &mut dyn Speaker) {
        if self.state == FreqState::Idle {
            speech.say(&frequency_phrase(hz));
        }
    }
}

/// Parse the entry buffer as MHz; `None` if empty or out of range
fn parse_mhz(buffer: &str) -> Option<u64> {
    let mhz: f64 = buffer.parse().ok()?;
    if !(MIN_FREQ_MHZ..=MAX_FREQ_MHZ).contains(&mhz) {
        return None;
    }
    Some((mhz * 1_000_000.0).round() as u64)
}

/// "14 point 250 megahertz", or "7 megahertz" on a whole MHz
pub fn frequency_phrase(hz: u64) -> String {
    let khz_total = (hz + 500) / 1000;
    let mhz = khz_total / 1000;
    let khz = khz_total % 1000;
    if khz == 0 {
        format!("{} megahertz", mhz)
    } else {
        format!("{} point {:03} megahertz", mhz, khz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Transcript;
    use crate::radio::{DummyRig, RigCall};

    fn setup() -> (FrequencyMode, RadioControl, DummyRig, Transcript) {
        let rig = DummyRig::new();
        let radio = RadioControl::new(Box::new(rig.clone()));
        (FrequencyMode::new(), radio, rig, Transcript::new())
    }

    fn press(mode: &mut FrequencyMode, radio: &RadioControl, t: &mut Transcript, keys: &str) {
        for key in keys.chars() {
            assert!(mode.handle_key(key, false, radio, t), "key {} not consumed", key);
        }
    }

    #[test]
    fn test_phrases() {
        assert_eq!(frequency_phrase(14_250_000), "14 point 250 megahertz");
        assert_eq!(frequency_phrase(7_000_000), "7 megahertz");
        assert_eq!(frequency_phrase(3_573_000), "3 point 573 megahertz");
        assert_eq!(frequency_phrase(146_520_000), "146 point 520 megahertz");
        assert_eq!(frequency_phrase(14_050_000), "14 point 050 megahertz");
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_mhz("14.25"), Some(14_250_000));
        assert_eq!(parse_mhz("0.1"), Some(100_000));
        assert_eq!(parse_mhz("500"), Some(500_000_000));
        assert_eq!(parse_mhz("0.05"), None);
        assert_eq!(parse_mhz("600"), None);
        assert_eq!(parse_mhz(""), None);
    }

    #[test]
    fn test_full_entry() {
        let (mut mode, radio, rig, mut t) = setup();
        press(&mut mode, &radio, &mut t, "#14*250#");

        assert_eq!(rig.calls(), vec![RigCall::SetFreq(14_250_000)]);
        assert_eq!(
            t.lines,
            vec![
                "Current VFO",
                "1",
                "4",
                "point",
                "2",
                "5",
                "0",
                "Frequency set",
                "14 point 250 megahertz"
            ]
        );
        assert_eq!(mode.state(), FreqState::Idle);
        assert!(mode.buffer().is_empty());
    }

    #[test]
    fn test_idle_only_consumes_pound() {
        let (mut mode, radio, _rig, mut t) = setup();
        for key in "0123456789*ABCD".chars() {
            assert!(!mode.handle_key(key, false, &radio, &mut t));
        }
        assert!(t.lines.is_empty());
    }

    #[test]
    fn test_vfo_selection_applied() {
        let (mut mode, radio, rig, mut t) = setup();
        // Current -> A -> B
        press(&mut mode, &radio, &mut t, "###7#");
        assert_eq!(
            rig.calls(),
            vec![RigCall::SetVfo(Vfo::B), RigCall::SetFreq(7_000_000)]
        );
        assert_eq!(&t.lines[..3], &["Current VFO", "VFO A", "VFO B"]);
        assert_eq!(t.last(), Some("7 megahertz"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let (mut mode, radio, rig, mut t) = setup();
        press(&mut mode, &radio, &mut t, "#900#");
        assert!(rig.calls().is_empty());
        assert_eq!(t.last(), Some("Invalid frequency"));
        assert_eq!(mode.state(), FreqState::Idle);
    }

    #[test]
    fn test_second_point_cancels() {
        let (mut mode, radio, rig, mut t) = setup();
        press(&mut mode, &radio, &mut t, "#14**");
        assert_eq!(t.last(), Some("Cancelled"));
        assert_eq!(mode.state(), FreqState::Idle);
        assert!(rig.calls().is_empty());
    }

    #[test]
    fn test_digit_overflow_ignored() {
        let (mut mode, radio, _rig, mut t) = setup();
        press(&mut mode, &radio, &mut t, "#1234567890123");
        assert_eq!(mode.buffer().len(), MAX_FREQ_DIGITS);
        // VFO name plus twelve accepted digits
        assert_eq!(t.lines.len(), 1 + MAX_FREQ_DIGITS);
    }

    #[test]
    fn test_cancel_keys() {
        let (mut mode, radio, _rig, mut t) = setup();
        press(&mut mode, &radio, &mut t, "#D");
        assert_eq!(t.last(), Some("Cancelled"));
        press(&mut mode, &radio, &mut t, "#*");
        assert_eq!(t.last(), Some("Cancelled"));
        press(&mut mode, &radio, &mut t, "#12D");
        assert_eq!(t.last(), Some("Cancelled"));
        assert_eq!(mode.state(), FreqState::Idle);
    }

    #[test]
    fn test_setter_failure_spoken() {
        let (mut mode, radio, rig, mut t) = setup();
        rig.set_reject_all(true);
        press(&mut mode, &radio, &mut t, "#14#");
        assert_eq!(t.last(), Some("Failed to set frequency"));
        assert_eq!(mode.state(), FreqState::Idle);
    }

    #[test]
    fn test_radio_change_only_when_idle() {
        let (mut mode, radio, _rig, mut t) = setup();
        mode.on_radio_change(7_074_000, &mut t);
        assert_eq!(t.take(), vec!["7 point 074 megahertz"]);

        press(&mut mode, &radio, &mut t, "#");
        t.take();
        mode.on_radio_change(7_075_000, &mut t);
        assert!(t.lines.is_empty());
    }
}
