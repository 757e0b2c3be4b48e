//! Application-wide constants
//!
//! Centralized defaults; every value here can be overridden from config.

// =============================================================================
// Wire protocol
// =============================================================================

/// Maximum payload carried by one frame
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Header size: type (1) + length (2) + tag (2)
pub const HEADER_LEN: usize = 5;

// =============================================================================
// Transport
// =============================================================================

/// Directory holding the two named pipes
pub const DEFAULT_PIPE_DIR: &str = ".";

/// Pipe written by the control side, read by the firmware side
pub const FIRMWARE_INPUT_PIPE: &str = "Firmware_i";

/// Pipe written by the firmware side, read by the control side
pub const FIRMWARE_OUTPUT_PIPE: &str = "Firmware_o";

/// Attempts to open the outbound pipe before giving up
pub const CONNECT_RETRY_ATTEMPTS: u32 = 1000;

/// Delay between outbound pipe open attempts (milliseconds)
pub const CONNECT_RETRY_DELAY_MS: u64 = 10;

// =============================================================================
// Router
// =============================================================================

/// Capacity of each response queue
pub const RESPONSE_QUEUE_CAPACITY: usize = 16;

/// Default wait for a response (milliseconds)
pub const RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Default wait for an audio playback response (milliseconds)
pub const AUDIO_RESPONSE_TIMEOUT_MS: u64 = 10_000;

// =============================================================================
// Keypad
// =============================================================================

/// Keypad poll interval (milliseconds)
pub const KEYPAD_POLL_INTERVAL_MS: u64 = 10;

/// Polls of the same key before a hold is reported (100 x 10ms = 1s)
pub const KEYPAD_HOLD_POLLS: u32 = 100;

/// Consecutive empty polls before a key counts as released (30 x 10ms)
pub const KEYPAD_RELEASE_POLLS: u32 = 30;

/// Hold threshold in milliseconds, as configured for overlay key handling
pub const KEYPAD_HOLD_THRESHOLD_MS: u64 = 500;

/// Request payload asking the firmware for a key sample
pub const KEYPAD_READ_REQUEST: u8 = b'r';

/// Key symbols meaning "no key pressed"
pub const NO_KEY_SYMBOLS: [u8; 2] = [b'-', 0xFF];

/// How long a key typed on stdin stays down without an explicit duration
pub const STDIN_KEY_PRESS_MS: u64 = 150;

/// Key toggling shift for the next key press
pub const SHIFT_KEY: char = 'A';

// =============================================================================
// Audio and config requests
// =============================================================================

/// AUDIO prefix: speak the text that follows
pub const AUDIO_SPEAK: u8 = b's';

/// AUDIO prefix: play a pre-generated clip (`.wav` appended)
pub const AUDIO_PLAY: u8 = b'p';

/// AUDIO prefix: stop current playback
pub const AUDIO_INTERRUPT: u8 = b'i';

/// Response status byte: success
pub const STATUS_OK: u8 = 0;

/// Response status byte: failure
pub const STATUS_FAILED: u8 = 1;

// =============================================================================
// Overlays
// =============================================================================

/// Frequency entry buffer capacity (characters)
pub const MAX_FREQ_DIGITS: usize = 12;

/// Set Mode value buffer capacity (characters)
pub const MAX_SET_VALUE_DIGITS: usize = 6;

/// Lowest frequency accepted by Frequency Mode (MHz)
pub const MIN_FREQ_MHZ: f64 = 0.1;

/// Highest frequency accepted by Frequency Mode (MHz)
pub const MAX_FREQ_MHZ: f64 = 500.0;

// =============================================================================
// Speech
// =============================================================================

/// Piper executable
pub const DEFAULT_PIPER_BIN: &str = "piper";

/// Piper medium quality model
pub const DEFAULT_PIPER_MODEL: &str = "en_US-lessac-medium.onnx";

/// Piper low quality model (persistent and stream engines)
pub const DEFAULT_PIPER_MODEL_LOW: &str = "en_US-lessac-low.onnx";

/// Festival text-to-wave executable
pub const DEFAULT_FESTIVAL_BIN: &str = "text2wave";

/// Audio player executable
pub const DEFAULT_PLAYER_BIN: &str = "aplay";

/// ALSA output device
pub const DEFAULT_AUDIO_DEVICE: &str = "default";

/// Sample rate of raw audio from low quality Piper models
pub const RAW_SAMPLE_RATE: u32 = 16_000;

/// Scratch file for one-shot synthesis
pub const SPEECH_SCRATCH_FILE: &str = "/tmp/hampod_speak.wav";

/// Output silence that marks the end of an interrupted utterance (milliseconds)
pub const SPEECH_DRAIN_QUIET_MS: u64 = 300;

/// Longest a speak waits for an interrupted utterance to drain (milliseconds)
pub const SPEECH_DRAIN_MAX_MS: u64 = 5000;

/// Directory of pre-generated audio clips
pub const PREGEN_AUDIO_DIR: &str = "pregen_audio";

// =============================================================================
// Radio
// =============================================================================

/// Hamlib rigctld default address
pub const DEFAULT_RIGCTLD_ADDR: &str = "127.0.0.1:4532";

/// Socket timeout for rigctld commands (milliseconds)
pub const RIG_IO_TIMEOUT_MS: u64 = 1000;

/// Interval between frequency polls for change announcements (milliseconds)
pub const RADIO_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// Logging
// =============================================================================

/// Interval between trace file flushes (milliseconds)
pub const TRACE_FLUSH_INTERVAL_MS: u64 = 1000;

/// Trace lines buffered before new ones are dropped
pub const TRACE_CHANNEL_CAPACITY: usize = 1024;

// =============================================================================
// Buffers
// =============================================================================

/// Channel capacity for events flowing into the control loop
pub const CHANNEL_CAPACITY: usize = 256;
