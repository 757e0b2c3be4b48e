//! Named-pipe transport between the firmware and software processes
//!
//! The firmware side creates both FIFOs and opens them. The software side
//! opens the firmware's output for reading, then retries opening the
//! firmware's input for writing until the peer has created it.
//!
//! FIFO opens block until the other end is opened, so both sides open in
//! the same order (output pipe first) to avoid a deadlock.

use super::{RetryPolicy, TransportChannels};
use crate::constants::{FIRMWARE_INPUT_PIPE, FIRMWARE_OUTPUT_PIPE};
use crate::error::{HampodError, Result};
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Locations of the two pipes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipePaths {
    /// Written by software, read by firmware
    pub firmware_input: PathBuf,
    /// Written by firmware, read by software
    pub firmware_output: PathBuf,
}

impl PipePaths {
    /// Standard pipe names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            firmware_input: dir.join(FIRMWARE_INPUT_PIPE),
            firmware_output: dir.join(FIRMWARE_OUTPUT_PIPE),
        }
    }
}

/// Named-pipe transport
pub struct PipeTransport {
    paths: PipePaths,
}

impl PipeTransport {
    pub fn new(paths: PipePaths) -> Self {
        Self { paths }
    }

    /// Firmware side: create both FIFOs and open them
    ///
    /// Blocks until the software side has opened its ends.
    pub fn listen(&self) -> Result<TransportChannels> {
        make_fifo(&self.paths.firmware_input)?;
        make_fifo(&self.paths.firmware_output)?;

        info!(
            "Waiting for software on {}",
            self.paths.firmware_output.display()
        );
        let writer = OpenOptions::new()
            .write(true)
            .open(&self.paths.firmware_output)
            .map_err(|e| HampodError::transport("open firmware output", e))?;
        let reader = File::open(&self.paths.firmware_input)
            .map_err(|e| HampodError::transport("open firmware input", e))?;

        info!("Software connected");
        Ok(TransportChannels::new(reader, writer))
    }

    /// Software side: open the firmware's pipes, retrying while they do not exist
    pub fn connect(&self, retry: RetryPolicy) -> Result<TransportChannels> {
        info!("Connecting to {}", self.paths.firmware_output.display());
        let reader = open_with_retry(&self.paths.firmware_output, retry, |p| File::open(p))?;

        info!(
            "Attempting to connect to {}",
            self.paths.firmware_input.display()
        );
        let writer = open_with_retry(&self.paths.firmware_input, retry, |p| {
            OpenOptions::new().write(true).open(p)
        })?;

        info!("Successful connection to firmware");
        Ok(TransportChannels::new(reader, writer))
    }
}

/// Open `path`, retrying only while it does not exist yet
fn open_with_retry(
    path: &Path,
    retry: RetryPolicy,
    open: impl Fn(&Path) -> std::io::Result<File>,
) -> Result<File> {
    let attempts = retry.attempts.max(1);
    for attempt in 1..=attempts {
        match open(path) {
            Ok(file) => return Ok(file),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Attempt {}/{}: {} not there yet", attempt, attempts, path.display());
                if attempt < attempts {
                    std::thread::sleep(retry.delay);
                }
            }
            Err(e) => return Err(HampodError::transport("open pipe", e)),
        }
    }

    Err(HampodError::ConnectTimeout {
        path: path.to_path_buf(),
        attempts,
    })
}

/// Create a FIFO at `path`; an existing one is reused
fn make_fifo(path: &Path) -> Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        HampodError::ConfigValidation {
            field: "pipe_dir",
            reason: format!("path contains NUL: {}", path.display()),
        }
    })?;

    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() != ErrorKind::AlreadyExists {
            return Err(HampodError::PipeCreate {
                path: path.to_path_buf(),
                source: err,
            });
        }
    }
    Ok(())
}
