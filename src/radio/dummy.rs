//! In-memory rig
//!
//! Behaves like Hamlib's dummy backend: remembers what was set and reports it
//! back. Every mutating call is recorded so callers can inspect what reached
//! the radio. Clones share state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Func, Level, RadioMode, RadioResult, Rig, Vfo};
use crate::error::RadioError;

/// One mutating call that reached the rig
#[derive(Debug, Clone, PartialEq)]
pub enum RigCall {
    SetLevel(Level, f32),
    SetFunc(Func, bool),
    SetFreq(u64),
    SetMode(RadioMode),
    SetVfo(Vfo),
}

struct DummyState {
    levels: HashMap<Level, f32>,
    funcs: HashMap<Func, bool>,
    freq: u64,
    mode: String,
    vfo: Vfo,
    calls: Vec<RigCall>,
    rejected_modes: Vec<RadioMode>,
    reject_all: bool,
}

#[derive(Clone)]
pub struct DummyRig {
    state: Arc<Mutex<DummyState>>,
}

impl Default for DummyRig {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyRig {
    /// 14.074 MHz USB on the current VFO
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DummyState {
                levels: HashMap::new(),
                funcs: HashMap::new(),
                freq: 14_074_000,
                mode: "USB".to_string(),
                vfo: Vfo::Current,
                calls: Vec::new(),
                rejected_modes: Vec::new(),
                reject_all: false,
            })),
        }
    }

    /// Mutating calls seen so far
    pub fn calls(&self) -> Vec<RigCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Change the frequency as if the operator turned the dial
    pub fn tune(&self, hz: u64) {
        self.state.lock().freq = hz;
    }

    /// Make every command fail with a Hamlib error
    pub fn set_reject_all(&self, reject: bool) {
        self.state.lock().reject_all = reject;
    }

    /// Make `set_mode` refuse these modes
    pub fn reject_modes(&self, modes: &[RadioMode]) {
        self.state.lock().rejected_modes = modes.to_vec();
    }

    pub fn set_mode_name(&self, name: &str) {
        self.state.lock().mode = name.to_string();
    }

    pub fn preset_level(&self, level: Level, value: f32) {
        self.state.lock().levels.insert(level, value);
    }

    pub fn preset_func(&self, func: Func, on: bool) {
        self.state.lock().funcs.insert(func, on);
    }

    fn check(state: &DummyState) -> RadioResult<()> {
        if state.reject_all {
            // RIG_ENAVAIL
            Err(RadioError::Rejected { code: -11 })
        } else {
            Ok(())
        }
    }
}

impl Rig for DummyRig {
    fn set_level(&mut self, level: Level, value: f32) -> RadioResult<()> {
        let mut s = self.state.lock();
        Self::check(&s)?;
        s.calls.push(RigCall::SetLevel(level, value));
        s.levels.insert(level, value);
        Ok(())
    }

    fn get_level(&mut self, level: Level) -> RadioResult<f32> {
        let s = self.state.lock();
        Self::check(&s)?;
        Ok(s.levels.get(&level).copied().unwrap_or(0.0))
    }

    fn set_func(&mut self, func: Func, on: bool) -> RadioResult<()> {
        let mut s = self.state.lock();
        Self::check(&s)?;
        s.calls.push(RigCall::SetFunc(func, on));
        s.funcs.insert(func, on);
        Ok(())
    }

    fn get_func(&mut self, func: Func) -> RadioResult<bool> {
        let s = self.state.lock();
        Self::check(&s)?;
        Ok(s.funcs.get(&func).copied().unwrap_or(false))
    }

    fn set_freq(&mut self, hz: u64) -> RadioResult<()> {
        let mut s = self.state.lock();
        Self::check(&s)?;
        s.calls.push(RigCall::SetFreq(hz));
        s.freq = hz;
        Ok(())
    }

    fn get_freq(&mut self) -> RadioResult<u64> {
        let s = self.state.lock();
        Self::check(&s)?;
        Ok(s.freq)
    }

    fn set_mode(&mut self, mode: RadioMode) -> RadioResult<()> {
        let mut s = self.state.lock();
        Self::check(&s)?;
        if s.rejected_modes.contains(&mode) {
            return Err(RadioError::Rejected { code: -11 });
        }
        s.calls.push(RigCall::SetMode(mode));
        s.mode = mode.name().to_string();
        Ok(())
    }

    fn get_mode(&mut self) -> RadioResult<String> {
        let s = self.state.lock();
        Self::check(&s)?;
        Ok(s.mode.clone())
    }

    fn set_vfo(&mut self, vfo: Vfo) -> RadioResult<()> {
        let mut s = self.state.lock();
        Self::check(&s)?;
        s.calls.push(RigCall::SetVfo(vfo));
        s.vfo = vfo;
        Ok(())
    }

    fn get_vfo(&mut self) -> RadioResult<Vfo> {
        let s = self.state.lock();
        Self::check(&s)?;
        Ok(s.vfo)
    }
}
