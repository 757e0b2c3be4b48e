//! Set Mode: edit one radio parameter from the keypad
//!
//! ```text
//! OFF --enter--> IDLE --1..9--> EDITING --#--> CONFIRM --#--> apply, IDLE
//!                 ^               |  *            |  *
//!                 +---------------+---------------+
//! ```
//!
//! `D` leaves Set Mode from any active state. Confirming makes exactly one
//! radio-control setter call.

use tracing::{debug, info};

use super::Speaker;
use crate::constants::MAX_SET_VALUE_DIGITS;
use crate::error::RadioError;
use crate::radio::{AgcSpeed, RadioControl, RadioMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetState {
    Off,
    Idle,
    Editing,
    Confirm,
}

/// Editable parameters, keyed `1`..`9`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetParam {
    Power,
    MicGain,
    Compression,
    NoiseBlanker,
    NoiseReduction,
    Agc,
    Preamp,
    Attenuation,
    Mode,
}

impl SetParam {
    pub fn from_key(key: char) -> Option<Self> {
        Some(match key {
            '1' => SetParam::Power,
            '2' => SetParam::MicGain,
            '3' => SetParam::Compression,
            '4' => SetParam::NoiseBlanker,
            '5' => SetParam::NoiseReduction,
            '6' => SetParam::Agc,
            '7' => SetParam::Preamp,
            '8' => SetParam::Attenuation,
            '9' => SetParam::Mode,
            _ => return None,
        })
    }

    pub fn spoken(self) -> &'static str {
        match self {
            SetParam::Power => "Power",
            SetParam::MicGain => "Mic gain",
            SetParam::Compression => "Compression",
            SetParam::NoiseBlanker => "Noise blanker",
            SetParam::NoiseReduction => "Noise reduction",
            SetParam::Agc => "AGC",
            SetParam::Preamp => "Preamp",
            SetParam::Attenuation => "Attenuation",
            SetParam::Mode => "Mode",
        }
    }

    /// On/off parameters where `0` means disabled
    pub fn is_toggle(self) -> bool {
        matches!(
            self,
            SetParam::Compression | SetParam::NoiseBlanker | SetParam::NoiseReduction
        )
    }

    /// Largest value the keypad may stage, `None` when unbounded
    fn max_value(self) -> Option<i32> {
        match self {
            SetParam::Agc => Some(3),
            SetParam::Preamp => Some(2),
            SetParam::Mode => Some(RadioMode::ALL.len() as i32 - 1),
            _ => None,
        }
    }

    /// How `value` reads back in a confirmation
    fn value_phrase(self, value: i32) -> String {
        match self {
            p if p.is_toggle() && value == 0 => "off".to_string(),
            SetParam::Agc => AgcSpeed::from_index(value)
                .map(AgcSpeed::name)
                .unwrap_or("unknown")
                .to_string(),
            SetParam::Mode => usize::try_from(value)
                .ok()
                .and_then(RadioMode::from_index)
                .map_or_else(|| value.to_string(), |m| m.name().to_string()),
            _ => value.to_string(),
        }
    }
}

/// "<Parameter> <current value>", reading the value from the radio
///
/// Falls back to the bare name when the radio cannot answer.
pub fn describe_parameter(param: SetParam, radio: &RadioControl) -> String {
    let value = match param {
        SetParam::Power => radio.get_power().map(|v| format!("{} percent", v)),
        SetParam::MicGain => radio.get_mic_gain().map(|v| format!("{} percent", v)),
        SetParam::Compression => radio.get_compression_enabled().and_then(|on| {
            if on {
                radio.get_compression().map(|v| v.to_string())
            } else {
                Ok("off".to_string())
            }
        }),
        SetParam::NoiseBlanker => toggle_level(radio.get_nb_enabled(), || radio.get_nb_level()),
        SetParam::NoiseReduction => {
            toggle_level(radio.get_nr_enabled(), || radio.get_nr_level())
        }
        SetParam::Agc => radio.get_agc_speed().map(|s| s.name().to_string()),
        SetParam::Preamp => radio.get_preamp().map(|v| match v {
            0 => "off".to_string(),
            n => n.to_string(),
        }),
        SetParam::Attenuation => radio.get_attenuation().map(|v| format!("{} decibels", v)),
        SetParam::Mode => radio.get_mode(),
    };

    match value {
        Ok(v) => format!("{} {}", param.spoken(), v),
        Err(e) => {
            debug!("Cannot read {}: {}", param.spoken(), e);
            param.spoken().to_string()
        }
    }
}

fn toggle_level(
    enabled: Result<bool, RadioError>,
    level: impl FnOnce() -> Result<i32, RadioError>,
) -> Result<String, RadioError> {
    if enabled? {
        level().map(|v| format!("level {}", v))
    } else {
        Ok("off".to_string())
    }
}

pub struct SetMode {
    state: SetState,
    param: Option<SetParam>,
    buffer: String,
    /// Value staged by `#`, applied by the confirming `#`
    pending: Option<i32>,
}

impl Default for SetMode {
    fn default() -> Self {
        Self::new()
    }
}

impl SetMode {
    pub fn new() -> Self {
        Self {
            state: SetState::Off,
            param: None,
            buffer: String::with_capacity(MAX_SET_VALUE_DIGITS),
            pending: None,
        }
    }

    pub fn state(&self) -> SetState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SetState::Off
    }

    pub fn parameter(&self) -> Option<SetParam> {
        self.param
    }

    pub fn value_buffer(&self) -> &str {
        &self.buffer
    }

    /// Value awaiting confirmation
    pub fn pending_value(&self) -> Option<i32> {
        self.pending
    }

    /// OFF -> IDLE
    pub fn enter(&mut self, speech: &mut dyn Speaker) {
        if self.state == SetState::Off {
            self.state = SetState::Idle;
            self.param = None;
            self.buffer.clear();
            self.pending = None;
            info!("Set Mode on");
            speech.say("Set Mode");
        }
    }

    /// Drop any pending edit and leave Set Mode
    pub fn exit(&mut self, speech: &mut dyn Speaker) {
        self.state = SetState::Off;
        self.param = None;
        self.buffer.clear();
        self.pending = None;
        info!("Set Mode off");
        speech.say("Set Mode Off");
    }

    /// Back to IDLE without applying anything
    pub fn cancel_edit(&mut self) {
        if self.is_active() {
            self.state = SetState::Idle;
            self.param = None;
            self.buffer.clear();
            self.pending = None;
        }
    }

    pub fn handle_key(
        &mut self,
        key: char,
        _is_hold: bool,
        is_shifted: bool,
        radio: &RadioControl,
        speech: &mut dyn Speaker,
    ) -> bool {
        debug!(
            "Set Mode key {:?} in {:?} (shifted={})",
            key, self.state, is_shifted
        );

        match self.state {
            SetState::Off => return false,
            SetState::Idle => match key {
                'D' => self.exit(speech),
                _ => {
                    if let Some(param) = SetParam::from_key(key) {
                        self.param = Some(param);
                        self.buffer.clear();
                        self.state = SetState::Editing;
                        speech.say(&describe_parameter(param, radio));
                    }
                }
            },
            SetState::Editing => match key {
                '0'..='9' => {
                    if self.buffer.len() < MAX_SET_VALUE_DIGITS {
                        self.buffer.push(key);
                        speech.say(&key.to_string());
                    }
                }
                '#' => self.stage(is_shifted, radio, speech),
                '*' => {
                    self.cancel_edit();
                    speech.say("Cancelled");
                }
                'D' => self.exit(speech),
                _ => {}
            },
            SetState::Confirm => match key {
                '#' => self.apply(radio, speech),
                '*' => {
                    self.cancel_edit();
                    speech.say("Cancelled");
                }
                'D' => self.exit(speech),
                _ => {}
            },
        }
        true
    }

    /// EDITING + `#`: validate the buffer and ask for confirmation
    fn stage(&mut self, is_shifted: bool, radio: &RadioControl, speech: &mut dyn Speaker) {
        let Some(param) = self.param else {
            self.cancel_edit();
            return;
        };

        if is_shifted && param.is_toggle() {
            self.buffer.clear();
            self.buffer.push('0');
        }

        if self.buffer.is_empty() {
            if param == SetParam::Mode {
                self.cycle_mode(radio, speech);
            } else {
                speech.say("No value");
            }
            return;
        }

        let value = self.buffer.parse::<i32>().ok();
        self.buffer.clear();
        match (value, param.max_value()) {
            (Some(v), Some(max)) if v > max => speech.say("Invalid value"),
            (Some(v), _) => {
                self.pending = Some(v);
                self.state = SetState::Confirm;
                speech.say(&format!("{} {}, confirm", param.spoken(), param.value_phrase(v)));
            }
            (None, _) => speech.say("Invalid value"),
        }
    }

    /// MODE + `#` with nothing typed: step to the next mode right away
    fn cycle_mode(&mut self, radio: &RadioControl, speech: &mut dyn Speaker) {
        match radio.cycle_mode() {
            Ok(mode) => speech.say(&format!("Mode set to {}", mode.name())),
            Err(e) => {
                debug!("Mode cycle failed: {}", e);
                speech.say("Failed to set mode");
            }
        }
        self.cancel_edit();
    }

    /// CONFIRM + `#`: one setter call, spoken result, back to IDLE
    fn apply(&mut self, radio: &RadioControl, speech: &mut dyn Speaker) {
        let (Some(param), Some(value)) = (self.param, self.pending.take()) else {
            self.cancel_edit();
            return;
        };

        let result = match param {
            SetParam::Power => radio.set_power(value),
            SetParam::MicGain => radio.set_mic_gain(value),
            SetParam::Compression if value == 0 => radio.set_compression_enabled(false),
            SetParam::Compression => radio.set_compression(value),
            SetParam::NoiseBlanker => radio.set_nb(value > 0, value),
            SetParam::NoiseReduction => radio.set_nr(value > 0, value),
            SetParam::Agc => match AgcSpeed::from_index(value) {
                Some(speed) => radio.set_agc_speed(speed),
                None => Err(RadioError::InvalidValue {
                    what: "AGC speed",
                    value: value.into(),
                }),
            },
            SetParam::Preamp => radio.set_preamp(value),
            SetParam::Attenuation => radio.set_attenuation(value),
            SetParam::Mode => radio.set_mode_by_index(value).map(|_| ()),
        };

        match result {
            Ok(()) => {
                info!("{} set to {}", param.spoken(), value);
                speech.say(&format!(
                    "{} set to {}",
                    param.spoken(),
                    param.value_phrase(value)
                ));
            }
            Err(e) => {
                debug!("{} not applied: {}", param.spoken(), e);
                speech.say(&format!("Failed to set {}", param.spoken().to_lowercase()));
            }
        }
        self.cancel_edit();
    }
}
