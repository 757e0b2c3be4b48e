//! Configuration management
//!
//! Lookup order for the config file:
//! 1. `--config <PATH>`
//! 2. `HAMPOD_CONFIG`
//! 3. `hampod.toml` next to the executable
//! 4. `hampod.toml` in the working directory
//!
//! A missing file means defaults. `HAMPOD_*` variables override single values
//! after the file is read.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::*;
use crate::error::{HampodError, Result};
use crate::keypad::KeypadTiming;
use crate::logging::TraceFileConfig;
use crate::speech::SpeechEngine;
#[cfg(unix)]
use crate::transport::PipePaths;
use crate::transport::RetryPolicy;

/// Config file name searched next to the executable and in the working dir
pub const CONFIG_FILE_NAME: &str = "hampod.toml";

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "HAMPOD_CONFIG";

// =============================================================================
// Application Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub keypad: KeypadConfig,
    pub router: RouterConfig,
    pub speech: SpeechConfig,
    pub radio: RadioConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Directory holding `Firmware_i` and `Firmware_o`
    pub pipe_dir: PathBuf,
    /// Attempts to open the firmware input pipe
    pub connect_attempts: u32,
    /// Delay between attempts (milliseconds)
    pub connect_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypadConfig {
    pub poll_interval_ms: u64,
    /// Polls of one key before it counts as held
    pub hold_polls: u32,
    /// Empty polls before a key counts as released
    pub release_polls: u32,
    /// Hold threshold in milliseconds (kept apart from `hold_polls`)
    pub hold_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub queue_capacity: usize,
    pub response_timeout_ms: u64,
    pub audio_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: SpeechEngine,
    pub piper_bin: String,
    /// Medium quality voice (`piper` engine)
    pub piper_model: String,
    /// Low quality voice (`piper-low`, `piper-stream`, `piper-persistent`)
    pub piper_model_low: String,
    pub festival_bin: String,
    pub player_bin: String,
    /// ALSA output device
    pub audio_device: String,
    /// Piper `--length_scale`; larger is slower
    pub length_scale: String,
    pub scratch_file: PathBuf,
    /// Pre-generated clips played by AUDIO `p` requests
    pub pregen_dir: PathBuf,
}

/// Rig backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RadioBackend {
    /// Hamlib network daemon
    #[default]
    Rigctld,
    /// In-memory rig for bench testing without a radio
    Dummy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub backend: RadioBackend,
    pub rigctld_addr: String,
    pub io_timeout_ms: u64,
    /// Frequency change poll interval; 0 disables announcements
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Packet trace file; disabled when unset
    pub trace_file: Option<PathBuf>,
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            pipe_dir: PathBuf::from(DEFAULT_PIPE_DIR),
            connect_attempts: CONNECT_RETRY_ATTEMPTS,
            connect_delay_ms: CONNECT_RETRY_DELAY_MS,
        }
    }
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: KEYPAD_POLL_INTERVAL_MS,
            hold_polls: KEYPAD_HOLD_POLLS,
            release_polls: KEYPAD_RELEASE_POLLS,
            hold_threshold_ms: KEYPAD_HOLD_THRESHOLD_MS,
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: RESPONSE_QUEUE_CAPACITY,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            audio_timeout_ms: AUDIO_RESPONSE_TIMEOUT_MS,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechEngine::default(),
            piper_bin: DEFAULT_PIPER_BIN.to_string(),
            piper_model: DEFAULT_PIPER_MODEL.to_string(),
            piper_model_low: DEFAULT_PIPER_MODEL_LOW.to_string(),
            festival_bin: DEFAULT_FESTIVAL_BIN.to_string(),
            player_bin: DEFAULT_PLAYER_BIN.to_string(),
            audio_device: DEFAULT_AUDIO_DEVICE.to_string(),
            length_scale: "1.0".to_string(),
            scratch_file: PathBuf::from(SPEECH_SCRATCH_FILE),
            pregen_dir: PathBuf::from(PREGEN_AUDIO_DIR),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            backend: RadioBackend::Rigctld,
            rigctld_addr: DEFAULT_RIGCTLD_ADDR.to_string(),
            io_timeout_ms: RIG_IO_TIMEOUT_MS,
            poll_interval_ms: RADIO_POLL_INTERVAL_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            trace_file: None,
            max_bytes: 1024 * 1024,
            max_files: 3,
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl TransportConfig {
    #[cfg(unix)]
    pub fn pipe_paths(&self) -> PipePaths {
        PipePaths::in_dir(&self.pipe_dir)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.connect_attempts,
            delay: Duration::from_millis(self.connect_delay_ms),
        }
    }
}

impl KeypadConfig {
    pub fn timing(&self) -> KeypadTiming {
        KeypadTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            hold_polls: self.hold_polls,
            release_polls: self.release_polls,
            hold_threshold: Duration::from_millis(self.hold_threshold_ms),
        }
    }
}

impl RouterConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_millis(self.audio_timeout_ms)
    }
}

impl LoggingConfig {
    /// Trace file settings, when tracing is enabled
    pub fn trace_config(&self) -> Option<TraceFileConfig> {
        self.trace_file.as_ref().map(|path| TraceFileConfig {
            path: path.clone(),
            max_bytes: self.max_bytes,
            max_files: self.max_files,
            flush_interval: Duration::from_millis(TRACE_FLUSH_INTERVAL_MS),
            channel_capacity: TRACE_CHANNEL_CAPACITY,
        })
    }
}

impl Config {
    /// Reject values that would wedge a worker loop
    pub fn validate(&self) -> Result<()> {
        if self.keypad.poll_interval_ms == 0 {
            return Err(HampodError::ConfigValidation {
                field: "keypad.poll_interval_ms",
                reason: "must be greater than 0".into(),
            });
        }
        if self.router.queue_capacity == 0 {
            return Err(HampodError::ConfigValidation {
                field: "router.queue_capacity",
                reason: "must be greater than 0".into(),
            });
        }
        if self.speech.length_scale.parse::<f32>().map_or(true, |s| s <= 0.0) {
            return Err(HampodError::ConfigValidation {
                field: "speech.length_scale",
                reason: format!("not a positive number: {}", self.speech.length_scale),
            });
        }
        Ok(())
    }

    /// Apply `HAMPOD_*` overrides from a variable map
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        if let Some(v) = get("HAMPOD_PIPE_DIR") {
            self.transport.pipe_dir = PathBuf::from(v);
        }
        if let Some(v) = get("HAMPOD_PIPER_BIN") {
            self.speech.piper_bin = v;
        }
        if let Some(v) = get("HAMPOD_PIPER_MODEL") {
            self.speech.piper_model = v;
        }
        if let Some(v) = get("HAMPOD_PIPER_MODEL_LOW") {
            self.speech.piper_model_low = v;
        }
        if let Some(v) = get("HAMPOD_FESTIVAL_BIN") {
            self.speech.festival_bin = v;
        }
        if let Some(v) = get("HAMPOD_PLAYER_BIN") {
            self.speech.player_bin = v;
        }
        if let Some(v) = get("HAMPOD_AUDIO_DEVICE") {
            self.speech.audio_device = v;
        }
        if let Some(v) = get("HAMPOD_RIGCTLD_ADDR") {
            self.radio.rigctld_addr = v;
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Find the config file to read, if any exists
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)));
    let in_cwd = PathBuf::from(CONFIG_FILE_NAME);

    beside_exe
        .into_iter()
        .chain(std::iter::once(in_cwd))
        .find(|p| p.exists())
}

/// Read and parse one config file
pub fn load_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| HampodError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| HampodError::ConfigValidation {
        field: "config",
        reason: format!("{}: {}", path.display(), e),
    })
}

/// Load config, falling back to defaults, then apply environment overrides
pub fn load(explicit: Option<&Path>) -> Config {
    let mut config = match config_path(explicit) {
        Some(path) if path.exists() => match load_from(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Config::default()
            }
        },
        Some(path) => {
            warn!("Config {} not found, using defaults", path.display());
            Config::default()
        }
        None => Config::default(),
    };

    let vars: HashMap<String, String> = std::env::vars()
        .filter(|(k, _)| k.starts_with("HAMPOD_"))
        .collect();
    config.apply_env(&vars);

    if let Err(e) = config.validate() {
        warn!("{}, using defaults", e);
        let mut fallback = Config::default();
        fallback.apply_env(&vars);
        return fallback;
    }
    config
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.transport.pipe_dir, PathBuf::from("."));
        assert_eq!(config.transport.connect_attempts, 1000);
        assert_eq!(config.transport.connect_delay_ms, 10);
        assert_eq!(config.keypad.hold_polls, 100);
        assert_eq!(config.keypad.release_polls, 30);
        assert_eq!(config.keypad.hold_threshold_ms, 500);
        assert_eq!(config.router.queue_capacity, RESPONSE_QUEUE_CAPACITY);
        assert_eq!(config.speech.engine, SpeechEngine::Festival);
        assert_eq!(config.speech.length_scale, "1.0");
        assert_eq!(config.radio.backend, RadioBackend::Rigctld);
        assert!(config.logging.trace_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.speech.player_bin, "aplay");
        assert_eq!(config.radio.rigctld_addr, DEFAULT_RIGCTLD_ADDR);
    }

    #[test]
    fn test_partial_sections() {
        let partial = r#"
[speech]
engine = "piper-persistent"
audio_device = "plughw:1,0"

[radio]
backend = "dummy"
"#;
        let config: Config = toml::from_str(partial).unwrap();

        assert_eq!(config.speech.engine, SpeechEngine::PiperPersistent);
        assert_eq!(config.speech.audio_device, "plughw:1,0");
        assert_eq!(config.speech.piper_bin, DEFAULT_PIPER_BIN);
        assert_eq!(config.radio.backend, RadioBackend::Dummy);
        assert_eq!(config.radio.poll_interval_ms, RADIO_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.transport.pipe_dir = PathBuf::from("/run/hampod");
        config.logging.trace_file = Some(PathBuf::from("/var/log/hampod.trace"));
        config.speech.engine = SpeechEngine::PiperStream;

        let text = toml::to_string_pretty(&config).unwrap();
        let restored: Config = toml::from_str(&text).unwrap();

        assert_eq!(restored.transport.pipe_dir, PathBuf::from("/run/hampod"));
        assert_eq!(
            restored.logging.trace_file,
            Some(PathBuf::from("/var/log/hampod.trace"))
        );
        assert_eq!(restored.speech.engine, SpeechEngine::PiperStream);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let vars: HashMap<String, String> = [
            ("HAMPOD_PIPE_DIR", "/tmp/pipes"),
            ("HAMPOD_AUDIO_DEVICE", "hw:2"),
            ("HAMPOD_RIGCTLD_ADDR", "10.0.0.5:4532"),
            ("HAMPOD_PIPER_BIN", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        config.apply_env(&vars);

        assert_eq!(config.transport.pipe_dir, PathBuf::from("/tmp/pipes"));
        assert_eq!(config.speech.audio_device, "hw:2");
        assert_eq!(config.radio.rigctld_addr, "10.0.0.5:4532");
        // Empty values are ignored
        assert_eq!(config.speech.piper_bin, DEFAULT_PIPER_BIN);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.speech.length_scale = "fast".into();
        assert!(matches!(
            config.validate(),
            Err(HampodError::ConfigValidation {
                field: "speech.length_scale",
                ..
            })
        ));

        let mut config = Config::default();
        config.router.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_conversions() {
        let config = Config::default();
        let retry = config.transport.retry_policy();
        assert_eq!(retry.attempts, 1000);
        assert_eq!(retry.delay, Duration::from_millis(10));

        let timing = config.keypad.timing();
        assert_eq!(timing.poll_interval, Duration::from_millis(10));
        assert_eq!(timing.hold_threshold, Duration::from_millis(500));

        assert!(config.logging.trace_config().is_none());

        #[cfg(unix)]
        assert_eq!(
            config.transport.pipe_paths().firmware_input,
            PathBuf::from(".").join("Firmware_i")
        );
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/nonexistent/hampod.toml");
        assert_eq!(config_path(Some(&path)), Some(path.clone()));

        let config = load(Some(&path));
        assert_eq!(config.router.queue_capacity, RESPONSE_QUEUE_CAPACITY);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("hampod-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hampod.toml");
        fs::write(&path, "[router]\nqueue_capacity = 4\n").unwrap();

        let config = load_from(&path).unwrap();
        assert_eq!(config.router.queue_capacity, 4);

        fs::write(&path, "[router\nbroken").unwrap();
        assert!(load_from(&path).is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
