//! Per-utterance engines
//!
//! Each `speak` runs a fresh synthesis process. WAV engines write the scratch
//! file and then start the player; `piper-stream` pipes raw audio straight
//! into the player. Playback runs in the background until the next call.

use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use super::{manager::spawn_engine, utterance_line, SpeechEngine};
use crate::config::SpeechConfig;
use crate::constants::RAW_SAMPLE_RATE;
use crate::error::{HampodError, Result};

/// Player command for raw 16-bit mono audio on stdin
pub(super) fn raw_player(config: &SpeechConfig) -> Command {
    let mut cmd = Command::new(&config.player_bin);
    cmd.arg("-D")
        .arg(&config.audio_device)
        .arg("-r")
        .arg(RAW_SAMPLE_RATE.to_string())
        .args(["-f", "S16_LE", "-t", "raw", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

fn file_player(config: &SpeechConfig, path: &Path) -> Command {
    let mut cmd = Command::new(&config.player_bin);
    cmd.arg("-D")
        .arg(&config.audio_device)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// Piper reading text on stdin with the given model
pub(super) fn piper(config: &SpeechConfig, model: &str) -> Command {
    let mut cmd = Command::new(&config.piper_bin);
    cmd.arg("--model")
        .arg(model)
        .arg("--length_scale")
        .arg(&config.length_scale)
        .stdin(Stdio::piped())
        .stderr(Stdio::null());
    cmd
}

#[derive(Default)]
pub(super) struct OneShot {
    /// Children producing the current audio (player last)
    playing: Vec<Child>,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(&mut self, engine: SpeechEngine, config: &SpeechConfig, text: &str) -> Result<()> {
        self.wait_idle();
        match engine {
            SpeechEngine::PiperStream => self.stream(config, text),
            _ => {
                self.synthesize(engine, config, text)?;
                self.play_file(config, &config.scratch_file)
            }
        }
    }

    /// Render `text` into the scratch WAV file and wait for the engine
    fn synthesize(&mut self, engine: SpeechEngine, config: &SpeechConfig, text: &str) -> Result<()> {
        let (mut cmd, program) = match engine {
            SpeechEngine::Festival => {
                let mut cmd = Command::new(&config.festival_bin);
                cmd.arg("-o")
                    .arg(&config.scratch_file)
                    .stdin(Stdio::piped())
                    .stderr(Stdio::null());
                (cmd, &config.festival_bin)
            }
            SpeechEngine::Piper | SpeechEngine::PiperLow => {
                let model = if engine == SpeechEngine::Piper {
                    &config.piper_model
                } else {
                    &config.piper_model_low
                };
                let mut cmd = piper(config, model);
                cmd.arg("--output_file").arg(&config.scratch_file);
                (cmd, &config.piper_bin)
            }
            SpeechEngine::PiperStream | SpeechEngine::PiperPersistent => {
                return Err(HampodError::Protocol {
                    message: format!("{} does not render to a file", engine),
                })
            }
        };
        cmd.stdout(Stdio::null());

        let mut child = spawn_engine(&mut cmd, program)?;
        if let Some(mut stdin) = child.stdin.take() {
            // A failed write shows up as a failed exit status below
            let _ = writeln!(stdin, "{}", utterance_line(text));
        }
        let status = child.wait().map_err(|e| HampodError::EngineUnavailable {
            program: program.clone(),
            source: e,
        })?;
        if !status.success() {
            return Err(HampodError::SynthesisFailed {
                program: program.clone(),
                status: status.to_string(),
            });
        }
        debug!("{} rendered {:?}", program, text);
        Ok(())
    }

    fn stream(&mut self, config: &SpeechConfig, text: &str) -> Result<()> {
        let mut cmd = piper(config, &config.piper_model_low);
        cmd.arg("--output_raw").stdout(Stdio::piped());
        let mut synth = spawn_engine(&mut cmd, &config.piper_bin)?;

        let mut player_cmd = raw_player(config);
        if let Some(audio) = synth.stdout.take() {
            player_cmd.stdin(Stdio::from(audio));
        }
        let player = match spawn_engine(&mut player_cmd, &config.player_bin) {
            Ok(player) => player,
            Err(e) => {
                let _ = synth.kill();
                let _ = synth.wait();
                return Err(e);
            }
        };

        if let Some(mut stdin) = synth.stdin.take() {
            let _ = writeln!(stdin, "{}", utterance_line(text));
        }
        self.playing.push(synth);
        self.playing.push(player);
        Ok(())
    }

    /// Start playing a WAV file in the background
    pub fn play_file(&mut self, config: &SpeechConfig, path: &Path) -> Result<()> {
        self.wait_idle();
        let player = spawn_engine(&mut file_player(config, path), &config.player_bin)?;
        self.playing.push(player);
        Ok(())
    }

    /// Block until the current audio has finished
    pub fn wait_idle(&mut self) {
        for mut child in self.playing.drain(..) {
            let _ = child.wait();
        }
    }

    pub fn is_playing(&mut self) -> bool {
        self.playing
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
        !self.playing.is_empty()
    }

    /// Kill whatever is playing; a no-op when idle
    pub fn interrupt(&mut self) {
        for mut child in self.playing.drain(..) {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for OneShot {
    fn drop(&mut self) {
        self.interrupt();
    }
}
