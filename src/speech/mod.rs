//! Speech synthesis
//!
//! - `SpeechManager` - owns the synthesis engine processes (firmware side)
//! - `AudioClient` - `Speaker` that forwards phrases over the transport
//! - `latency` - interactive latency harness

mod client;
pub mod latency;
mod manager;
mod oneshot;
mod persistent;

pub use client::AudioClient;
pub use manager::{SpeechManager, SpeechState};

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Synthesis engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechEngine {
    /// `text2wave` per utterance, then the player
    #[default]
    Festival,
    /// Piper per utterance, medium model, WAV file
    Piper,
    /// Piper per utterance, low model, WAV file
    PiperLow,
    /// Piper per utterance, raw audio piped straight to the player
    PiperStream,
    /// One long-lived Piper process fed a line per utterance
    PiperPersistent,
}

impl SpeechEngine {
    pub const ALL: [SpeechEngine; 5] = [
        SpeechEngine::Festival,
        SpeechEngine::Piper,
        SpeechEngine::PiperLow,
        SpeechEngine::PiperStream,
        SpeechEngine::PiperPersistent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpeechEngine::Festival => "festival",
            SpeechEngine::Piper => "piper",
            SpeechEngine::PiperLow => "piper-low",
            SpeechEngine::PiperStream => "piper-stream",
            SpeechEngine::PiperPersistent => "piper-persistent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    /// Piper engines honour `length_scale`
    pub fn uses_piper(self) -> bool {
        self != SpeechEngine::Festival
    }
}

impl fmt::Display for SpeechEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Resolve a program name the way the shell would
///
/// Names containing a `/` are checked as paths; bare names are searched in
/// `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// One line of text for a synthesis engine
///
/// Line breaks would split one utterance into several.
pub fn utterance_line(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_names() {
        for engine in SpeechEngine::ALL {
            assert_eq!(SpeechEngine::from_name(engine.name()), Some(engine));
        }
        assert_eq!(SpeechEngine::from_name("espeak"), None);
        assert_eq!(format!("{:<8}|", SpeechEngine::Piper), "piper   |");
    }

    #[test]
    fn test_engine_serde_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            engine: SpeechEngine,
        }

        let w: Wrapper = toml::from_str("engine = \"piper-low\"").unwrap();
        assert_eq!(w.engine, SpeechEngine::PiperLow);

        let text = toml::to_string(&Wrapper {
            engine: SpeechEngine::PiperPersistent,
        })
        .unwrap();
        assert!(text.contains("engine = \"piper-persistent\""));
    }

    #[test]
    fn test_only_festival_ignores_length_scale() {
        assert!(!SpeechEngine::Festival.uses_piper());
        assert!(SpeechEngine::PiperStream.uses_piper());
    }

    #[test]
    fn test_utterance_line_flattens_breaks() {
        assert_eq!(utterance_line("Mode\nUSB\r"), "Mode USB ");
        assert_eq!(utterance_line("Power 50"), "Power 50");
    }

    #[cfg(unix)]
    #[test]
    fn test_find_program() {
        assert!(find_program("sh").is_some());
        assert!(find_program("/bin/sh").is_some());
        assert!(find_program("hampod-no-such-binary").is_none());
        assert!(find_program("/nonexistent/piper").is_none());
    }
}
