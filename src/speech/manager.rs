//! Speech process manager

use std::path::Path;
use std::process::{Child, Command};

use tracing::{debug, info, warn};

use super::oneshot::OneShot;
use super::persistent::PersistentPipeline;
use super::{find_program, SpeechEngine};
use crate::config::SpeechConfig;
use crate::error::{HampodError, Result};

/// Lifecycle of the synthesis engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    NotStarted,
    Running,
    /// Engine stopped by `cleanup()` or found dead; `init()` starts a new one
    Terminated,
}

enum Backend {
    Persistent(PersistentPipeline),
    OneShot(OneShot),
}

pub(super) fn spawn_engine(cmd: &mut Command, program: &str) -> Result<Child> {
    cmd.spawn().map_err(|source| HampodError::EngineUnavailable {
        program: program.to_string(),
        source,
    })
}

fn missing(program: &str) -> HampodError {
    HampodError::EngineUnavailable {
        program: program.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found in PATH"),
    }
}

/// Owns the synthesis engine and the audio player processes
pub struct SpeechManager {
    config: SpeechConfig,
    state: SpeechState,
    backend: Option<Backend>,
}

impl SpeechManager {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            config,
            state: SpeechState::NotStarted,
            backend: None,
        }
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    pub fn engine(&self) -> SpeechEngine {
        self.config.engine
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Start the engine; restarts it if already running
    pub fn init(&mut self) -> Result<()> {
        if self.backend.is_some() {
            self.cleanup();
        }

        let backend = match self.config.engine {
            SpeechEngine::PiperPersistent => {
                Backend::Persistent(PersistentPipeline::start(&self.config)?)
            }
            engine => {
                let synth = match engine {
                    SpeechEngine::Festival => &self.config.festival_bin,
                    _ => &self.config.piper_bin,
                };
                for program in [synth, &self.config.player_bin] {
                    if find_program(program).is_none() {
                        return Err(missing(program));
                    }
                }
                Backend::OneShot(OneShot::new())
            }
        };

        self.backend = Some(backend);
        self.state = SpeechState::Running;
        info!("Speech ready: {}", self.impl_name());
        Ok(())
    }

    /// Speak one phrase
    ///
    /// With the persistent engine this returns once the line is queued;
    /// per-utterance engines return once synthesis is done and playback has
    /// started.
    pub fn speak(&mut self, text: &str) -> Result<()> {
        match self.state {
            SpeechState::NotStarted => return Err(HampodError::SpeechNotInitialized),
            SpeechState::Terminated => return Err(HampodError::ProcessDead),
            SpeechState::Running => {}
        }
        debug!("Speak {:?}", text);

        let result = match self.backend.as_mut() {
            Some(Backend::Persistent(pipeline)) => pipeline.speak(text),
            Some(Backend::OneShot(oneshot)) => oneshot.speak(self.config.engine, &self.config, text),
            None => Err(HampodError::SpeechNotInitialized),
        };

        if let Err(HampodError::ProcessDead) = result {
            warn!("Speech engine exited");
            self.backend = None;
            self.state = SpeechState::Terminated;
        }
        result
    }

    /// Play a pre-rendered WAV file
    pub fn play_file(&mut self, path: &Path) -> Result<()> {
        if self.state != SpeechState::Running {
            return Err(HampodError::SpeechNotInitialized);
        }
        match self.backend.as_mut() {
            Some(Backend::OneShot(oneshot)) => oneshot.play_file(&self.config, path),
            // The persistent player owns the raw stream; files get their own player
            Some(Backend::Persistent(_)) | None => {
                let mut clip = OneShot::new();
                clip.play_file(&self.config, path)?;
                clip.wait_idle();
                Ok(())
            }
        }
    }

    /// Stop the audio in flight; the engine stays up
    pub fn interrupt(&mut self) -> Result<()> {
        match self.backend.as_mut() {
            Some(Backend::Persistent(pipeline)) => pipeline.interrupt(),
            Some(Backend::OneShot(oneshot)) => {
                oneshot.interrupt();
                Ok(())
            }
            None if self.state == SpeechState::NotStarted => Err(HampodError::SpeechNotInitialized),
            None => Ok(()),
        }
    }

    /// Block until per-utterance playback has finished
    pub fn wait_idle(&mut self) {
        if let Some(Backend::OneShot(oneshot)) = self.backend.as_mut() {
            oneshot.wait_idle();
        }
    }

    pub fn is_playing(&mut self) -> bool {
        match self.backend.as_mut() {
            Some(Backend::OneShot(oneshot)) => oneshot.is_playing(),
            _ => false,
        }
    }

    /// Stop every child process; `init()` may be called again afterwards
    pub fn cleanup(&mut self) {
        if self.backend.take().is_some() {
            debug!("Speech engine stopped");
        }
        if self.state != SpeechState::NotStarted {
            self.state = SpeechState::Terminated;
        }
    }

    /// Change the Piper length scale; a running persistent engine restarts
    pub fn set_length_scale(&mut self, scale: &str) -> Result<()> {
        match scale.parse::<f32>() {
            Ok(s) if s > 0.0 => {}
            _ => {
                return Err(HampodError::ConfigValidation {
                    field: "speed",
                    reason: format!("not a positive number: {}", scale),
                })
            }
        }
        self.config.length_scale = scale.to_string();
        self.restart_persistent()
    }

    /// Change the ALSA output device
    pub fn set_device(&mut self, device: &str) -> Result<()> {
        if device.is_empty() {
            return Err(HampodError::ConfigValidation {
                field: "device",
                reason: "empty".into(),
            });
        }
        self.config.audio_device = device.to_string();
        self.restart_persistent()
    }

    fn restart_persistent(&mut self) -> Result<()> {
        if matches!(self.backend, Some(Backend::Persistent(_))) {
            self.init()?;
        }
        Ok(())
    }

    /// Active engine and voice, e.g. `piper-persistent (en_US-lessac-low.onnx)`
    pub fn impl_name(&self) -> String {
        let voice = match self.config.engine {
            SpeechEngine::Festival => &self.config.festival_bin,
            SpeechEngine::Piper => &self.config.piper_model,
            _ => &self.config.piper_model_low,
        };
        let voice = Path::new(voice)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(voice);
        format!("{} ({})", self.config.engine, voice)
    }
}

impl Drop for SpeechManager {
    fn drop(&mut self) {
        self.cleanup();
    }
}
