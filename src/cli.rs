//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::speech::SpeechEngine;

// =============================================================================
// CLI Definition
// =============================================================================

/// Keypad and speech control core for the HAMPOD radio interface
#[derive(Parser, Debug, Default)]
#[command(name = "hampod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: hampod.toml next to the executable or in the working directory)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the control side (default)
    Control,

    /// Run the hardware side: create the pipes, serve keys typed on stdin and speech
    Firmware,

    /// Speak key names and print synthesis latency
    SpeechTest {
        /// Synthesis engine
        #[arg(value_enum, default_value_t = EngineArg::Festival)]
        engine: EngineArg,

        /// Piper length scale; larger is slower
        #[arg(default_value = "1.0")]
        speed: String,
    },
}

/// Engine names accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    Festival,
    Piper,
    PiperLow,
    PiperStream,
    PiperPersistent,
}

impl From<EngineArg> for SpeechEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Festival => SpeechEngine::Festival,
            EngineArg::Piper => SpeechEngine::Piper,
            EngineArg::PiperLow => SpeechEngine::PiperLow,
            EngineArg::PiperStream => SpeechEngine::PiperStream,
            EngineArg::PiperPersistent => SpeechEngine::PiperPersistent,
        }
    }
}

impl Cli {
    /// Subcommand to run; `control` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Control)
    }
}

// =============================================================================
// Tests
// =============================================================================
