//! Control context and key dispatch
//!
//! Dispatch order for a key event:
//! 1. shift key toggles shift for the next key
//! 2. Set Mode, while active
//! 3. Frequency Mode
//! 4. normal-mode handler
//!
//! Overlays only see taps. A hold is the second event of a press whose tap
//! was already delivered, so holds only reach the normal-mode handler.

use std::sync::Arc;

use tracing::debug;

use crate::constants::SHIFT_KEY;
use crate::keypad::KeyEvent;
use crate::overlay::{
    describe_parameter, frequency_phrase, FrequencyMode, SetMode, SetParam, Speaker,
};
use crate::radio::RadioControl;

/// Key that enters Set Mode when held
const SET_MODE_KEY: char = 'B';

/// Key that speaks the current mode
const MODE_QUERY_KEY: char = 'C';

pub struct ControlContext<S: Speaker> {
    set_mode: SetMode,
    freq_mode: FrequencyMode,
    shift: u8,
    radio: Arc<RadioControl>,
    speech: S,
}

impl<S: Speaker> ControlContext<S> {
    pub fn new(radio: Arc<RadioControl>, speech: S) -> Self {
        Self {
            set_mode: SetMode::new(),
            freq_mode: FrequencyMode::new(),
            shift: 0,
            radio,
            speech,
        }
    }

    pub fn set_mode(&self) -> &SetMode {
        &self.set_mode
    }

    pub fn frequency_mode(&self) -> &FrequencyMode {
        &self.freq_mode
    }

    pub fn speech(&self) -> &S {
        &self.speech
    }

    pub fn speech_mut(&mut self) -> &mut S {
        &mut self.speech
    }

    pub fn is_shifted(&self) -> bool {
        self.shift > 0
    }

    /// Route one key event
    pub fn handle_key(&mut self, event: KeyEvent) {
        if event.key == SHIFT_KEY {
            if !event.is_hold {
                self.shift = if self.shift > 0 { 0 } else { 1 };
                self.speech
                    .say(if self.shift > 0 { "Shift" } else { "Shift off" });
            }
            return;
        }

        if event.is_hold {
            if !self.set_mode.is_active() && !self.freq_mode.is_active() {
                self.normal_hold(event.key);
            }
            return;
        }

        let shifted = event.is_shifted() || self.shift > 0;
        self.shift = 0;

        if self.set_mode.is_active()
            && self.set_mode.handle_key(
                event.key,
                false,
                shifted,
                &self.radio,
                &mut self.speech,
            )
        {
            return;
        }

        if self
            .freq_mode
            .handle_key(event.key, false, &self.radio, &mut self.speech)
        {
            return;
        }

        self.normal_tap(event.key);
    }

    /// Frequency moved outside this process
    pub fn on_radio_change(&mut self, hz: u64) {
        self.freq_mode.on_radio_change(hz, &mut self.speech);
    }

    fn normal_hold(&mut self, key: char) {
        if key == SET_MODE_KEY {
            self.freq_mode.cancel();
            self.set_mode.enter(&mut self.speech);
        } else {
            debug!("No action for held {}", key);
        }
    }

    fn normal_tap(&mut self, key: char) {
        if let Some(param) = SetParam::from_key(key) {
            let text = describe_parameter(param, &self.radio);
            self.speech.say(&text);
            return;
        }

        match key {
            '0' => {
                let text = match self.radio.get_frequency() {
                    Ok(hz) => frequency_phrase(hz),
                    Err(e) => {
                        debug!("Frequency query failed: {}", e);
                        "Frequency unavailable".to_string()
                    }
                };
                self.speech.say(&text);
            }
            MODE_QUERY_KEY => {
                let text = match self.radio.get_mode() {
                    Ok(mode) => format!("Mode {}", mode),
                    Err(e) => {
                        debug!("Mode query failed: {}", e);
                        "Mode unavailable".to_string()
                    }
                };
                self.speech.say(&text);
            }
            _ => debug!("No action for {}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{FreqState, SetState, Transcript};
    use crate::radio::{DummyRig, Func, RigCall};

    fn context() -> (ControlContext<Transcript>, DummyRig) {
        let rig = DummyRig::new();
        let radio = Arc::new(RadioControl::new(Box::new(rig.clone())));
        (ControlContext::new(radio, Transcript::new()), rig)
    }

    fn taps(ctx: &mut ControlContext<Transcript>, keys: &str) {
        for key in keys.chars() {
            ctx.handle_key(KeyEvent::tap(key));
        }
    }

    #[test]
    fn test_hold_b_enters_set_mode() {
        let (mut ctx, _rig) = context();
        ctx.handle_key(KeyEvent::tap('B'));
        ctx.handle_key(KeyEvent::hold('B'));
        assert_eq!(ctx.set_mode().state(), SetState::Idle);
        assert_eq!(ctx.speech().last(), Some("Set Mode"));
    }

    #[test]
    fn test_set_mode_takes_precedence_over_frequency_mode() {
        let (mut ctx, _rig) = context();
        ctx.handle_key(KeyEvent::hold('B'));
        taps(&mut ctx, "1");
        // '#' goes to Set Mode (No value), not to Frequency Mode
        taps(&mut ctx, "#");
        assert_eq!(ctx.speech().last(), Some("No value"));
        assert_eq!(ctx.frequency_mode().state(), FreqState::Idle);
    }

    #[test]
    fn test_holds_ignored_inside_overlays() {
        let (mut ctx, _rig) = context();
        ctx.handle_key(KeyEvent::hold('B'));
        taps(&mut ctx, "8");
        ctx.handle_key(KeyEvent::tap('5'));
        ctx.handle_key(KeyEvent::hold('5'));
        assert_eq!(ctx.set_mode().value_buffer(), "5");
    }

    #[test]
    fn test_frequency_entry_from_normal_mode() {
        let (mut ctx, rig) = context();
        taps(&mut ctx, "#14*250#");
        assert_eq!(rig.calls(), vec![RigCall::SetFreq(14_250_000)]);
        assert_eq!(ctx.speech().last(), Some("14 point 250 megahertz"));
    }

    #[test]
    fn test_shift_applies_to_next_key_only() {
        let (mut ctx, rig) = context();
        rig.preset_func(Func::Nr, true);
        ctx.handle_key(KeyEvent::hold('B'));
        taps(&mut ctx, "5A");
        assert!(ctx.is_shifted());
        taps(&mut ctx, "#");
        assert!(!ctx.is_shifted());
        assert_eq!(ctx.speech().last(), Some("Noise reduction off, confirm"));
    }

    #[test]
    fn test_normal_queries() {
        let (mut ctx, rig) = context();
        rig.tune(7_074_000);
        taps(&mut ctx, "0C9");
        assert_eq!(
            ctx.speech().lines,
            vec!["7 point 074 megahertz", "Mode USB", "Mode USB"]
        );
        assert!(rig.calls().is_empty());
    }

    #[test]
    fn test_radio_change_announced_when_idle() {
        let (mut ctx, _rig) = context();
        ctx.on_radio_change(21_200_000);
        assert_eq!(ctx.speech().last(), Some("21 point 200 megahertz"));
    }
}
