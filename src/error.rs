//! Centralized error types for the control core
//!
//! All fallible operations return `HampodError`.
//! Use `Result<T>` as shorthand for `std::result::Result<T, HampodError>`.

use std::fmt;
use std::path::PathBuf;

/// All control-core errors
#[derive(Debug)]
pub enum HampodError {
    // === Transport ===
    /// Short or failed read/write on a channel
    Transport {
        context: &'static str,
        source: std::io::Error,
    },
    /// Peer never created its end of the channel within the retry window
    ConnectTimeout { path: PathBuf, attempts: u32 },
    /// Failed to create a named pipe
    PipeCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Protocol ===
    /// Frame declares a payload larger than the protocol allows
    FrameTooLarge { len: usize },
    /// Frame type code has no mapping
    UnknownPacketType { code: u8 },
    /// Response did not arrive before the deadline
    Timeout { waited_ms: u64 },
    /// Response queue was shut down
    Shutdown,
    /// Response was malformed or carried a failure status
    Protocol { message: String },

    // === Speech ===
    /// Synthesis engine or player binary could not be started
    EngineUnavailable {
        program: String,
        source: std::io::Error,
    },
    /// Speech manager used before `init()`
    SpeechNotInitialized,
    /// Persistent synthesis process has exited
    ProcessDead,
    /// One-shot synthesis command exited unsuccessfully
    SynthesisFailed { program: String, status: String },

    // === Config ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime or worker thread creation failed
    Runtime { source: std::io::Error },
}

impl std::error::Error for HampodError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. }
            | Self::PipeCreate { source, .. }
            | Self::EngineUnavailable { source, .. }
            | Self::Io { source, .. }
            | Self::Runtime { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for HampodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { context, source } => {
                write!(f, "Transport failure ({}): {}", context, source)
            }
            Self::ConnectTimeout { path, attempts } => write!(
                f,
                "Unsuccessful connection to {} after {} attempts",
                path.display(),
                attempts
            ),
            Self::PipeCreate { path, .. } => {
                write!(f, "Cannot create pipe: {}", path.display())
            }
            Self::FrameTooLarge { len } => write!(f, "Frame too large: {} bytes", len),
            Self::UnknownPacketType { code } => write!(f, "Unknown packet type 0x{:02x}", code),
            Self::Timeout { waited_ms } => write!(f, "No response after {} ms", waited_ms),
            Self::Shutdown => write!(f, "Response queue shut down"),
            Self::Protocol { message } => write!(f, "Protocol error: {}", message),
            Self::EngineUnavailable { program, source } => {
                write!(f, "Speech engine unavailable: {}: {}", program, source)
            }
            Self::SpeechNotInitialized => write!(f, "Speech manager not initialized"),
            Self::ProcessDead => write!(f, "Speech process is not running"),
            Self::SynthesisFailed { program, status } => {
                write!(f, "{} failed: {}", program, status)
            }
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

impl HampodError {
    /// Wrap an I/O error from a channel read or write
    pub fn transport(context: &'static str, source: std::io::Error) -> Self {
        Self::Transport { context, source }
    }
}

/// Alias for Result with HampodError
pub type Result<T> = std::result::Result<T, HampodError>;

/// Radio-control failures
#[derive(Debug)]
pub enum RadioError {
    /// No rig connected; the call never reached the radio
    Disconnected,
    /// Rig refused the command (Hamlib status code)
    Rejected { code: i32 },
    /// Value outside the range the parameter accepts
    InvalidValue { what: &'static str, value: i64 },
    /// Reply could not be understood
    BadReply { reply: String },
    /// Socket failure talking to the rig
    Io(std::io::Error),
}

impl std::error::Error for RadioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Radio not connected"),
            Self::Rejected { code } => write!(f, "Rig rejected command (RPRT {})", code),
            Self::InvalidValue { what, value } => write!(f, "Invalid {}: {}", what, value),
            Self::BadReply { reply } => write!(f, "Unexpected rig reply: {:?}", reply),
            Self::Io(e) => write!(f, "Rig I/O error: {}", e),
        }
    }
}

impl From<std::io::Error> for RadioError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
