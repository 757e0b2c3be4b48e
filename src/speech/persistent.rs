//! Long-lived Piper pipeline
//!
//! ```text
//! speak() -> piper stdin    piper stdout -> pump thread -> player stdin
//! ```
//!
//! The pump owns the player's stdin. `interrupt()` mutes the pump, kills the
//! player and hands the pump a fresh player; piper itself keeps running with
//! its model loaded.
//!
//! Piper keeps producing audio for the interrupted line after the player is
//! gone. The next `speak()` holds the mute until piper's output has been
//! quiet for `DRAIN_QUIET`, so that leftover audio is discarded instead of
//! reaching the new player.

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::manager::spawn_engine;
use super::oneshot::{piper, raw_player};
use super::utterance_line;
use crate::config::SpeechConfig;
use crate::constants::{SPEECH_DRAIN_MAX_MS, SPEECH_DRAIN_QUIET_MS};
use crate::error::{HampodError, Result};

const PUMP_CHUNK: usize = 4096;

/// Silence on piper's output that ends an interrupted utterance
const DRAIN_QUIET: Duration = Duration::from_millis(SPEECH_DRAIN_QUIET_MS);

/// Longest `speak()` waits for an interrupted utterance to drain
const DRAIN_MAX: Duration = Duration::from_millis(SPEECH_DRAIN_MAX_MS);

const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Time of the last chunk read from piper, as milliseconds since `epoch`
#[derive(Clone)]
struct OutputClock {
    epoch: Instant,
    last_ms: Arc<AtomicU64>,
}

impl OutputClock {
    fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    fn mark(&self) {
        let ms = self.epoch.elapsed().as_millis() as u64;
        self.last_ms.store(ms, Ordering::SeqCst);
    }

    fn last_output(&self) -> Instant {
        self.epoch + Duration::from_millis(self.last_ms.load(Ordering::SeqCst))
    }
}

pub(super) struct PersistentPipeline {
    synth: Child,
    input: ChildStdin,
    player: Child,
    muted: Arc<AtomicBool>,
    clock: OutputClock,
    interrupted_at: Option<Instant>,
    player_tx: mpsc::Sender<ChildStdin>,
    pump: Option<JoinHandle<()>>,
    config: SpeechConfig,
}

impl PersistentPipeline {
    pub fn start(config: &SpeechConfig) -> Result<Self> {
        let mut cmd = piper(config, &config.piper_model_low);
        cmd.arg("--output_raw").stdout(Stdio::piped());
        let mut synth = spawn_engine(&mut cmd, &config.piper_bin)?;

        let (input, audio) = match (synth.stdin.take(), synth.stdout.take()) {
            (Some(input), Some(audio)) => (input, audio),
            _ => {
                kill(&mut synth);
                return Err(HampodError::ProcessDead);
            }
        };

        let (mut player, player_input) = match spawn_player(config) {
            Ok(pair) => pair,
            Err(e) => {
                kill(&mut synth);
                return Err(e);
            }
        };

        let muted = Arc::new(AtomicBool::new(false));
        let (player_tx, player_rx) = mpsc::channel();
        let clock = OutputClock::new();
        let pump_muted = muted.clone();
        let pump_clock = clock.clone();
        let pump = thread::Builder::new()
            .name("hampod-audio-pump".to_string())
            .spawn(move || pump_audio(audio, player_input, player_rx, pump_muted, pump_clock))
            .map_err(|source| {
                kill(&mut synth);
                kill(&mut player);
                HampodError::Runtime { source }
            })?;

        debug!(
            "Persistent pipeline started: {} --model {} --length_scale {}",
            config.piper_bin, config.piper_model_low, config.length_scale
        );

        Ok(Self {
            synth,
            input,
            player,
            muted,
            clock,
            interrupted_at: None,
            player_tx,
            pump: Some(pump),
            config: config.clone(),
        })
    }

    /// `false` once the synthesis process has exited
    pub fn is_alive(&mut self) -> bool {
        matches!(self.synth.try_wait(), Ok(None))
    }

    /// Queue one line for synthesis; returns without waiting for audio
    pub fn speak(&mut self, text: &str) -> Result<()> {
        if !self.is_alive() {
            return Err(HampodError::ProcessDead);
        }
        if !matches!(self.player.try_wait(), Ok(None)) {
            warn!("Audio player exited, restarting it");
            self.replace_player()?;
        }
        if let Some(at) = self.interrupted_at.take() {
            self.drain_interrupted(at);
        }
        self.muted.store(false, Ordering::SeqCst);

        let line = utterance_line(text);
        writeln!(self.input, "{}", line)
            .and_then(|_| self.input.flush())
            .map_err(|e| match e.kind() {
                io::ErrorKind::BrokenPipe => HampodError::ProcessDead,
                _ => HampodError::transport("speech write", e),
            })
    }

    /// Drop pending audio; piper stays loaded
    pub fn interrupt(&mut self) -> Result<()> {
        self.muted.store(true, Ordering::SeqCst);
        self.interrupted_at = Some(Instant::now());
        self.replace_player()
    }

    /// Wait, still muted, until piper has gone quiet since `interrupted_at`
    fn drain_interrupted(&mut self, interrupted_at: Instant) {
        let deadline = Instant::now() + DRAIN_MAX;
        loop {
            let quiet_since = self.clock.last_output().max(interrupted_at);
            if quiet_since.elapsed() >= DRAIN_QUIET {
                return;
            }
            if Instant::now() >= deadline || !self.is_alive() {
                warn!("Interrupted speech still playing out, unmuting anyway");
                return;
            }
            thread::sleep(DRAIN_POLL);
        }
    }

    fn replace_player(&mut self) -> Result<()> {
        kill(&mut self.player);
        let (player, input) = spawn_player(&self.config)?;
        self.player = player;
        // The pump only exits once piper's output closes
        if self.player_tx.send(input).is_err() {
            debug!("Audio pump gone, new player left idle");
        }
        Ok(())
    }
}

impl Drop for PersistentPipeline {
    fn drop(&mut self) {
        kill(&mut self.synth);
        kill(&mut self.player);
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
        debug!("Persistent pipeline stopped");
    }
}

fn spawn_player(config: &SpeechConfig) -> Result<(Child, ChildStdin)> {
    let mut player = spawn_engine(&mut raw_player(config), &config.player_bin)?;
    match player.stdin.take() {
        Some(input) => Ok((player, input)),
        None => {
            kill(&mut player);
            Err(HampodError::ProcessDead)
        }
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Copy synthesized audio into whichever player is current
fn pump_audio(
    mut audio: ChildStdout,
    first: ChildStdin,
    players: mpsc::Receiver<ChildStdin>,
    muted: Arc<AtomicBool>,
    clock: OutputClock,
) {
    let mut sink = Some(first);
    let mut buf = [0u8; PUMP_CHUNK];

    loop {
        let n = match audio.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Synthesis output closed: {}", e);
                break;
            }
        };
        clock.mark();

        while let Ok(next) = players.try_recv() {
            sink = Some(next);
        }
        if muted.load(Ordering::SeqCst) {
            continue;
        }
        if let Some(out) = sink.as_mut() {
            if let Err(e) = out.write_all(&buf[..n]) {
                debug!("Player input closed: {}", e);
                sink = None;
            }
        }
    }
}
