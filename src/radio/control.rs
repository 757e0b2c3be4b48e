//! Parameter-level radio API
//!
//! Levels are taken in operator units and scaled for Hamlib:
//! percentages 0-100 map to 0.0-1.0, NB/NR 0-10 map to 0.0-1.0, preamp
//! stage N is sent as N x 10 dB.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{AgcSpeed, Func, Level, RadioMode, RadioResult, Rig, Vfo};
use crate::error::RadioError;

struct RigSlot {
    rig: Option<Box<dyn Rig>>,
    /// Last frequency this side set or observed
    known_freq: Option<u64>,
}

/// Shared radio handle; all calls serialize on one lock
pub struct RadioControl {
    slot: Mutex<RigSlot>,
}

impl RadioControl {
    pub fn new(rig: Box<dyn Rig>) -> Self {
        Self {
            slot: Mutex::new(RigSlot {
                rig: Some(rig),
                known_freq: None,
            }),
        }
    }

    /// No rig attached; every call fails with `Disconnected`
    pub fn disconnected() -> Self {
        Self {
            slot: Mutex::new(RigSlot {
                rig: None,
                known_freq: None,
            }),
        }
    }

    pub fn attach(&self, rig: Box<dyn Rig>) {
        let mut slot = self.slot.lock();
        slot.rig = Some(rig);
        slot.known_freq = None;
        info!("Radio connected");
    }

    pub fn detach(&self) {
        self.slot.lock().rig = None;
    }

    pub fn is_connected(&self) -> bool {
        self.slot.lock().rig.is_some()
    }

    fn with_rig<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut dyn Rig, &mut Option<u64>) -> RadioResult<T>,
    ) -> RadioResult<T> {
        let mut slot = self.slot.lock();
        let RigSlot { rig, known_freq } = &mut *slot;
        let Some(active) = rig.as_mut() else {
            return Err(RadioError::Disconnected);
        };

        match f(active.as_mut(), known_freq) {
            Ok(v) => Ok(v),
            Err(RadioError::Io(e)) => {
                warn!("{}: radio connection lost: {}", op, e);
                *rig = None;
                Err(RadioError::Io(e))
            }
            Err(e) => {
                debug!("{}: {}", op, e);
                Err(e)
            }
        }
    }

    fn set_percent(&self, op: &'static str, level: Level, percent: i32) -> RadioResult<()> {
        let percent = percent.clamp(0, 100);
        self.with_rig(op, |rig, _| rig.set_level(level, percent as f32 / 100.0))?;
        debug!("{}: set to {}%", op, percent);
        Ok(())
    }

    fn get_percent(&self, op: &'static str, level: Level) -> RadioResult<i32> {
        let v = self.with_rig(op, |rig, _| rig.get_level(level))?;
        Ok((v * 100.0 + 0.5) as i32)
    }

    fn set_toggle_level(
        &self,
        op: &'static str,
        func: Func,
        level: Level,
        enabled: bool,
        value: i32,
    ) -> RadioResult<()> {
        self.with_rig(op, |rig, _| {
            rig.set_func(func, enabled)?;
            if enabled && value >= 0 {
                rig.set_level(level, value.min(10) as f32 / 10.0)?;
            }
            Ok(())
        })?;
        debug!("{}: enabled={} level={}", op, enabled, value);
        Ok(())
    }

    // === Power and gain ===

    pub fn set_power(&self, percent: i32) -> RadioResult<()> {
        self.set_percent("set_power", Level::RfPower, percent)
    }

    pub fn get_power(&self) -> RadioResult<i32> {
        self.get_percent("get_power", Level::RfPower)
    }

    pub fn set_mic_gain(&self, percent: i32) -> RadioResult<()> {
        self.set_percent("set_mic_gain", Level::MicGain, percent)
    }

    pub fn get_mic_gain(&self) -> RadioResult<i32> {
        self.get_percent("get_mic_gain", Level::MicGain)
    }

    pub fn set_compression(&self, percent: i32) -> RadioResult<()> {
        self.set_percent("set_compression", Level::Comp, percent)
    }

    pub fn get_compression(&self) -> RadioResult<i32> {
        self.get_percent("get_compression", Level::Comp)
    }

    pub fn set_compression_enabled(&self, enabled: bool) -> RadioResult<()> {
        self.with_rig("set_compression_enabled", |rig, _| {
            rig.set_func(Func::Comp, enabled)
        })
    }

    pub fn get_compression_enabled(&self) -> RadioResult<bool> {
        self.with_rig("get_compression_enabled", |rig, _| rig.get_func(Func::Comp))
    }

    // === Noise controls ===

    /// Noise blanker on/off; `level` 0-10 applied only when enabling
    pub fn set_nb(&self, enabled: bool, level: i32) -> RadioResult<()> {
        self.set_toggle_level("set_nb", Func::Nb, Level::Nb, enabled, level)
    }

    pub fn get_nb_enabled(&self) -> RadioResult<bool> {
        self.with_rig("get_nb_enabled", |rig, _| rig.get_func(Func::Nb))
    }

    pub fn get_nb_level(&self) -> RadioResult<i32> {
        let v = self.with_rig("get_nb_level", |rig, _| rig.get_level(Level::Nb))?;
        Ok((v * 10.0 + 0.5) as i32)
    }

    /// Noise reduction on/off; `level` 0-10 applied only when enabling
    pub fn set_nr(&self, enabled: bool, level: i32) -> RadioResult<()> {
        self.set_toggle_level("set_nr", Func::Nr, Level::Nr, enabled, level)
    }

    pub fn get_nr_enabled(&self) -> RadioResult<bool> {
        self.with_rig("get_nr_enabled", |rig, _| rig.get_func(Func::Nr))
    }

    pub fn get_nr_level(&self) -> RadioResult<i32> {
        let v = self.with_rig("get_nr_level", |rig, _| rig.get_level(Level::Nr))?;
        Ok((v * 10.0 + 0.5) as i32)
    }

    // === AGC, preamp, attenuation ===

    pub fn set_agc_speed(&self, speed: AgcSpeed) -> RadioResult<()> {
        self.with_rig("set_agc_speed", |rig, _| {
            rig.set_level(Level::Agc, speed.hamlib_value() as f32)
        })
    }

    pub fn get_agc_speed(&self) -> RadioResult<AgcSpeed> {
        let v = self.with_rig("get_agc_speed", |rig, _| rig.get_level(Level::Agc))?;
        Ok(AgcSpeed::from_hamlib(v.round() as i32))
    }

    /// Preamp stage 0 (off), 1 or 2
    pub fn set_preamp(&self, stage: i32) -> RadioResult<()> {
        if !(0..=2).contains(&stage) {
            return Err(RadioError::InvalidValue {
                what: "preamp stage",
                value: stage.into(),
            });
        }
        self.with_rig("set_preamp", |rig, _| {
            rig.set_level(Level::Preamp, (stage * 10) as f32)
        })
    }

    pub fn get_preamp(&self) -> RadioResult<i32> {
        let v = self.with_rig("get_preamp", |rig, _| rig.get_level(Level::Preamp))?;
        Ok(v.round() as i32 / 10)
    }

    pub fn set_attenuation(&self, db: i32) -> RadioResult<()> {
        if db < 0 {
            return Err(RadioError::InvalidValue {
                what: "attenuation",
                value: db.into(),
            });
        }
        self.with_rig("set_attenuation", |rig, _| {
            rig.set_level(Level::Att, db as f32)
        })
    }

    pub fn get_attenuation(&self) -> RadioResult<i32> {
        let v = self.with_rig("get_attenuation", |rig, _| rig.get_level(Level::Att))?;
        Ok(v.round() as i32)
    }

    // === Mode ===

    /// Step to the next mode in the cycle, skipping modes the rig refuses
    pub fn cycle_mode(&self) -> RadioResult<RadioMode> {
        self.with_rig("cycle_mode", |rig, _| {
            let current = rig.get_mode()?;
            let start = RadioMode::from_name(&current).map_or(0, |m| m.index() + 1);

            let count = RadioMode::ALL.len();
            let mut last_err = RadioError::Rejected { code: -1 };
            for i in 0..count {
                let next = RadioMode::ALL[(start + i) % count];
                match rig.set_mode(next) {
                    Ok(()) => return Ok(next),
                    Err(e @ RadioError::Io(_)) => return Err(e),
                    Err(e) => last_err = e,
                }
            }
            Err(last_err)
        })
    }

    pub fn set_mode_by_index(&self, index: i32) -> RadioResult<RadioMode> {
        let mode = usize::try_from(index)
            .ok()
            .and_then(RadioMode::from_index)
            .ok_or(RadioError::InvalidValue {
                what: "mode index",
                value: index.into(),
            })?;
        self.with_rig("set_mode_by_index", |rig, _| rig.set_mode(mode))?;
        Ok(mode)
    }

    /// Mode name as the rig reports it
    pub fn get_mode(&self) -> RadioResult<String> {
        self.with_rig("get_mode", |rig, _| rig.get_mode())
    }

    // === Frequency and VFO ===

    pub fn set_frequency(&self, hz: u64) -> RadioResult<()> {
        self.with_rig("set_frequency", |rig, known| {
            rig.set_freq(hz)?;
            *known = Some(hz);
            Ok(())
        })
    }

    pub fn get_frequency(&self) -> RadioResult<u64> {
        self.with_rig("get_frequency", |rig, _| rig.get_freq())
    }

    /// Read the frequency; `Some` only when it moved since the last set or poll
    ///
    /// The first poll after connecting records a baseline without reporting.
    pub fn poll_frequency_change(&self) -> RadioResult<Option<u64>> {
        self.with_rig("poll_frequency", |rig, known| {
            let hz = rig.get_freq()?;
            let changed = matches!(*known, Some(prev) if prev != hz);
            *known = Some(hz);
            Ok(changed.then_some(hz))
        })
    }

    pub fn set_vfo(&self, vfo: Vfo) -> RadioResult<()> {
        self.with_rig("set_vfo", |rig, _| rig.set_vfo(vfo))
    }

    pub fn get_vfo(&self) -> RadioResult<Vfo> {
        self.with_rig("get_vfo", |rig, _| rig.get_vfo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::{DummyRig, RigCall};

    fn radio() -> (RadioControl, DummyRig) {
        let rig = DummyRig::new();
        (RadioControl::new(Box::new(rig.clone())), rig)
    }

    #[test]
    fn test_disconnected_fails_fast() {
        let radio = RadioControl::disconnected();
        assert!(matches!(radio.set_power(50), Err(RadioError::Disconnected)));
        assert!(matches!(radio.get_frequency(), Err(RadioError::Disconnected)));
        assert!(!radio.is_connected());
    }

    #[test]
    fn test_power_clamped_and_scaled() {
        let (radio, rig) = radio();
        radio.set_power(150).unwrap();
        radio.set_power(-5).unwrap();
        radio.set_power(40).unwrap();
        assert_eq!(
            rig.calls(),
            vec![
                RigCall::SetLevel(Level::RfPower, 1.0),
                RigCall::SetLevel(Level::RfPower, 0.0),
                RigCall::SetLevel(Level::RfPower, 0.4),
            ]
        );
        assert_eq!(radio.get_power().unwrap(), 40);
    }

    #[test]
    fn test_nb_level_only_when_enabling() {
        let (radio, rig) = radio();
        radio.set_nb(true, 15).unwrap();
        radio.set_nb(false, 5).unwrap();
        assert_eq!(
            rig.calls(),
            vec![
                RigCall::SetFunc(Func::Nb, true),
                RigCall::SetLevel(Level::Nb, 1.0),
                RigCall::SetFunc(Func::Nb, false),
            ]
        );
        assert!(!radio.get_nb_enabled().unwrap());
        assert_eq!(radio.get_nb_level().unwrap(), 10);
    }

    #[test]
    fn test_preamp_written_in_db() {
        let (radio, rig) = radio();
        radio.set_preamp(2).unwrap();
        assert_eq!(rig.calls(), vec![RigCall::SetLevel(Level::Preamp, 20.0)]);
        assert_eq!(radio.get_preamp().unwrap(), 2);
        assert!(radio.set_preamp(3).is_err());
    }

    #[test]
    fn test_agc_round_trip() {
        let (radio, _rig) = radio();
        radio.set_agc_speed(AgcSpeed::Slow).unwrap();
        assert_eq!(radio.get_agc_speed().unwrap(), AgcSpeed::Slow);
    }

    #[test]
    fn test_cycle_mode_skips_refused() {
        let (radio, rig) = radio();
        rig.reject_modes(&[RadioMode::Lsb]);
        // USB -> LSB refused -> CW
        assert_eq!(radio.cycle_mode().unwrap(), RadioMode::Cw);
        assert_eq!(radio.get_mode().unwrap(), "CW");
    }

    #[test]
    fn test_cycle_mode_from_unknown_starts_at_first() {
        let (radio, rig) = radio();
        rig.set_mode_name("PKTUSB");
        assert_eq!(radio.cycle_mode().unwrap(), RadioMode::Usb);
    }

    #[test]
    fn test_mode_by_index_bounds() {
        let (radio, _rig) = radio();
        assert_eq!(radio.set_mode_by_index(4).unwrap(), RadioMode::Fm);
        assert!(matches!(
            radio.set_mode_by_index(6),
            Err(RadioError::InvalidValue { .. })
        ));
        assert!(radio.set_mode_by_index(-1).is_err());
    }

    #[test]
    fn test_frequency_change_detection() {
        let (radio, rig) = radio();
        // Baseline
        assert_eq!(radio.poll_frequency_change().unwrap(), None);
        rig.tune(7_100_000);
        assert_eq!(radio.poll_frequency_change().unwrap(), Some(7_100_000));
        assert_eq!(radio.poll_frequency_change().unwrap(), None);

        // Our own set is not reported as a change
        radio.set_frequency(14_250_000).unwrap();
        assert_eq!(radio.poll_frequency_change().unwrap(), None);
    }
}
