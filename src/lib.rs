//! HAMPOD control core
//!
//! Two processes talk over a pair of named pipes:
//!
//! - the **firmware side** owns the keypad and the audio output
//! - the **control side** polls keys, runs the keypad overlays and drives
//!   the radio, asking the firmware side to speak
//!
//! The control side is built from a request [`router`] over the
//! [`transport`], a [`keypad`] poller, the [`overlay`] modes dispatched by
//! [`control`], and the [`radio`] collaborator.

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod control;
pub mod error;
pub mod firmware;
pub mod keypad;
pub mod logging;
pub mod overlay;
pub mod radio;
pub mod router;
pub mod speech;
pub mod transport;

pub use error::{HampodError, RadioError, Result};
