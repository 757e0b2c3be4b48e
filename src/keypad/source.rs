//! Key sample sources
//!
//! A source answers "which key is down right now" once per poll tick.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::codec::PacketType;
use crate::constants::{KEYPAD_READ_REQUEST, NO_KEY_SYMBOLS};
use crate::error::{HampodError, Result};
use crate::router::Client;

/// One key sample per call
pub trait KeySource: Send {
    /// Currently pressed key, or `None`
    fn read_key(&mut self) -> Result<Option<char>>;
}

/// Symbols present on the 4x4 keypad
pub fn is_key_symbol(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='D' | '*' | '#')
}

// =============================================================================
// Remote keypad (software side)
// =============================================================================

/// Samples the firmware keypad over the transport
pub struct RemoteKeypad {
    client: Client,
    timeout: Duration,
}

impl RemoteKeypad {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl KeySource for RemoteKeypad {
    fn read_key(&mut self) -> Result<Option<char>> {
        let response = self.client.request(
            PacketType::Keypad,
            Bytes::from_static(&[KEYPAD_READ_REQUEST]),
            self.timeout,
        )?;

        match response.first_byte() {
            None => Err(HampodError::Protocol {
                message: "empty keypad response".to_string(),
            }),
            Some(b) if NO_KEY_SYMBOLS.contains(&b) => Ok(None),
            Some(b) => Ok(Some(char::from(b))),
        }
    }
}

// =============================================================================
// Stdin keys (firmware side)
// =============================================================================

/// Keys typed one per line, standing in for the keypad scan
///
/// A line is a key symbol, optionally followed by how long it stays down in
/// milliseconds: `5` is a short press, `B 1500` holds B for 1.5 s.
pub struct StdinKeys {
    pressed: Arc<Mutex<Option<(char, Instant)>>>,
}

impl StdinKeys {
    /// Read key lines from the process's stdin
    pub fn spawn(press: Duration) -> Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()), press)
    }

    /// Read key lines from any line source
    pub fn from_reader(reader: impl BufRead + Send + 'static, press: Duration) -> Result<Self> {
        let pressed = Arc::new(Mutex::new(None));
        let thread_pressed = pressed.clone();

        thread::Builder::new()
            .name("hampod-stdin-keys".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    match parse_key_line(&line, press) {
                        Some((key, held)) => {
                            debug!("Key {} down for {:?}", key, held);
                            *thread_pressed.lock() = Some((key, Instant::now() + held));
                        }
                        None if line.trim().is_empty() => {}
                        None => warn!("Not a key: {:?}", line.trim()),
                    }
                }
                debug!("Key input closed");
            })
            .map_err(|source| HampodError::Runtime { source })?;

        Ok(Self { pressed })
    }
}

impl KeySource for StdinKeys {
    fn read_key(&mut self) -> Result<Option<char>> {
        let mut pressed = self.pressed.lock();
        match *pressed {
            Some((key, until)) if Instant::now() < until => Ok(Some(key)),
            Some(_) => {
                *pressed = None;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Parse `<key> [millis]`
fn parse_key_line(line: &str, default_press: Duration) -> Option<(char, Duration)> {
    let mut parts = line.split_whitespace();
    let token = parts.next()?;
    let mut chars = token.chars();
    let key = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !is_key_symbol(key) {
        return None;
    }

    let held = match parts.next() {
        Some(ms) => Duration::from_millis(ms.parse().ok()?),
        None => default_press,
    };
    Some((key, held))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_key_symbols() {
        for c in "0123456789ABCD*#".chars() {
            assert!(is_key_symbol(c));
        }
        assert!(!is_key_symbol('E'));
        assert!(!is_key_symbol('-'));
    }

    #[test]
    fn test_parse_key_line() {
        let tap = Duration::from_millis(50);
        assert_eq!(parse_key_line("5", tap), Some(('5', tap)));
        assert_eq!(parse_key_line(" b ", tap), Some(('B', tap)));
        assert_eq!(
            parse_key_line("# 1500", tap),
            Some(('#', Duration::from_millis(1500)))
        );
        assert_eq!(parse_key_line("", tap), None);
        assert_eq!(parse_key_line("12", tap), None);
        assert_eq!(parse_key_line("x", tap), None);
        assert_eq!(parse_key_line("5 soon", tap), None);
    }

    #[test]
    fn test_stdin_keys_release_after_press() {
        let input = Cursor::new(b"7 100\n".to_vec());
        let mut keys = StdinKeys::from_reader(input, Duration::from_millis(50)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(1);
        let mut seen = None;
        while Instant::now() < deadline && seen.is_none() {
            seen = keys.read_key().unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(seen, Some('7'));

        thread::sleep(Duration::from_millis(150));
        assert_eq!(keys.read_key().unwrap(), None);
    }
}
