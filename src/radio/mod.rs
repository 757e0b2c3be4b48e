//! Radio control
//!
//! `RadioControl` is the parameter-level API the overlays talk to. It
//! serializes every call through one lock and fails fast with
//! `RadioError::Disconnected` when no rig is attached. The rig itself sits
//! behind the `Rig` trait:
//!
//! - `RigctldRig` - Hamlib's `rigctld` network daemon
//! - `DummyRig` - in-memory rig for simulation and tests

mod control;
mod dummy;
mod monitor;
mod rigctld;

pub use control::RadioControl;
pub use dummy::{DummyRig, RigCall};
pub use monitor::{spawn_monitor, FrequencyChanged, Reconnect};
pub use rigctld::RigctldRig;

use std::fmt;

use crate::error::RadioError;

/// Shorthand for radio-control results
pub type RadioResult<T> = std::result::Result<T, RadioError>;

// =============================================================================
// Rig vocabulary
// =============================================================================

/// Hamlib level names used here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    RfPower,
    MicGain,
    Comp,
    Nb,
    Nr,
    Agc,
    Preamp,
    Att,
}

impl Level {
    /// Name on the rigctld wire
    pub fn name(self) -> &'static str {
        match self {
            Level::RfPower => "RFPOWER",
            Level::MicGain => "MICGAIN",
            Level::Comp => "COMP",
            Level::Nb => "NB",
            Level::Nr => "NR",
            Level::Agc => "AGC",
            Level::Preamp => "PREAMP",
            Level::Att => "ATT",
        }
    }

    /// Integer levels are sent without a fractional part
    pub fn is_integer(self) -> bool {
        matches!(self, Level::Agc | Level::Preamp | Level::Att)
    }
}

/// Hamlib function names used here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Comp,
    Nb,
    Nr,
}

impl Func {
    pub fn name(self) -> &'static str {
        match self {
            Func::Comp => "COMP",
            Func::Nb => "NB",
            Func::Nr => "NR",
        }
    }
}

/// VFO selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vfo {
    A,
    B,
    #[default]
    Current,
}

impl Vfo {
    /// A -> B -> Current -> A
    pub fn next(self) -> Self {
        match self {
            Vfo::A => Vfo::B,
            Vfo::B => Vfo::Current,
            Vfo::Current => Vfo::A,
        }
    }

    /// Spoken name
    pub fn spoken(self) -> &'static str {
        match self {
            Vfo::A => "VFO A",
            Vfo::B => "VFO B",
            Vfo::Current => "Current VFO",
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Vfo::A => "VFOA",
            Vfo::B => "VFOB",
            Vfo::Current => "currVFO",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "VFOA" | "Main" | "MainA" => Some(Vfo::A),
            "VFOB" | "Sub" | "MainB" => Some(Vfo::B),
            "currVFO" => Some(Vfo::Current),
            _ => None,
        }
    }
}

/// Operating modes reachable from the keypad, in cycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Usb,
    Lsb,
    Cw,
    Am,
    Fm,
    Rtty,
}

impl RadioMode {
    pub const ALL: [RadioMode; 6] = [
        RadioMode::Usb,
        RadioMode::Lsb,
        RadioMode::Cw,
        RadioMode::Am,
        RadioMode::Fm,
        RadioMode::Rtty,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RadioMode::Usb => "USB",
            RadioMode::Lsb => "LSB",
            RadioMode::Cw => "CW",
            RadioMode::Am => "AM",
            RadioMode::Fm => "FM",
            RadioMode::Rtty => "RTTY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&m| m == self).unwrap_or(0)
    }
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// AGC speed as offered on the keypad (0-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgcSpeed {
    Off,
    Fast,
    Medium,
    Slow,
}

impl AgcSpeed {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(AgcSpeed::Off),
            1 => Some(AgcSpeed::Fast),
            2 => Some(AgcSpeed::Medium),
            3 => Some(AgcSpeed::Slow),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AgcSpeed::Off => "Off",
            AgcSpeed::Fast => "Fast",
            AgcSpeed::Medium => "Medium",
            AgcSpeed::Slow => "Slow",
        }
    }

    /// Hamlib `RIG_AGC_*` value
    pub fn hamlib_value(self) -> i32 {
        match self {
            AgcSpeed::Off => 0,
            AgcSpeed::Fast => 2,
            AgcSpeed::Slow => 3,
            AgcSpeed::Medium => 5,
        }
    }

    /// Map a Hamlib AGC value back; anything unlisted (auto, user) reads as Medium
    pub fn from_hamlib(value: i32) -> Self {
        match value {
            0 => AgcSpeed::Off,
            1 | 2 => AgcSpeed::Fast,
            3 => AgcSpeed::Slow,
            _ => AgcSpeed::Medium,
        }
    }
}

// =============================================================================
// Rig seam
// =============================================================================

/// Raw rig access; every call goes to the radio
pub trait Rig: Send {
    fn set_level(&mut self, level: Level, value: f32) -> RadioResult<()>;
    fn get_level(&mut self, level: Level) -> RadioResult<f32>;
    fn set_func(&mut self, func: Func, on: bool) -> RadioResult<()>;
    fn get_func(&mut self, func: Func) -> RadioResult<bool>;
    fn set_freq(&mut self, hz: u64) -> RadioResult<()>;
    fn get_freq(&mut self) -> RadioResult<u64>;
    /// Set mode with the rig's normal passband
    fn set_mode(&mut self, mode: RadioMode) -> RadioResult<()>;
    /// Current mode name as the rig reports it (may be outside `RadioMode`)
    fn get_mode(&mut self) -> RadioResult<String>;
    fn set_vfo(&mut self, vfo: Vfo) -> RadioResult<()>;
    fn get_vfo(&mut self) -> RadioResult<Vfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vfo_cycle() {
        let mut vfo = Vfo::default();
        assert_eq!(vfo, Vfo::Current);
        let mut names = Vec::new();
        for _ in 0..3 {
            vfo = vfo.next();
            names.push(vfo.spoken());
        }
        assert_eq!(names, vec!["VFO A", "VFO B", "Current VFO"]);
    }

    #[test]
    fn test_mode_lookup() {
        assert_eq!(RadioMode::from_name("CW"), Some(RadioMode::Cw));
        assert_eq!(RadioMode::from_name("PKTUSB"), None);
        assert_eq!(RadioMode::from_index(5), Some(RadioMode::Rtty));
        assert_eq!(RadioMode::from_index(6), None);
        assert_eq!(RadioMode::Am.index(), 3);
    }

    #[test]
    fn test_agc_hamlib_mapping() {
        for i in 0..4 {
            let speed = AgcSpeed::from_index(i).unwrap();
            assert_eq!(AgcSpeed::from_hamlib(speed.hamlib_value()), speed);
        }
        assert_eq!(AgcSpeed::from_hamlib(6), AgcSpeed::Medium);
    }
}
