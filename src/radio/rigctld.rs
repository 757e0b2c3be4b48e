//! Hamlib `rigctld` client
//!
//! Plain-text protocol over TCP, one command per line. Set commands answer
//! `RPRT <code>`; get commands answer with one value line per field, or
//! `RPRT <negative code>` on failure.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use super::{Func, Level, RadioMode, RadioResult, Rig, Vfo};
use crate::error::RadioError;

pub struct RigctldRig {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl RigctldRig {
    /// Connect to a running `rigctld`
    pub fn connect(addr: &str, timeout: Duration) -> RadioResult<Self> {
        let sock_addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RadioError::BadReply {
                reply: format!("no address for {}", addr),
            })?;

        let stream = TcpStream::connect_timeout(&sock_addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let writer = stream.try_clone()?;
        info!("Connected to rigctld at {}", addr);
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    fn send(&mut self, command: &str) -> RadioResult<()> {
        debug!("rigctld <- {}", command);
        self.writer.write_all(command.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> RadioResult<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Err(RadioError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "rigctld closed the connection",
            )));
        }
        let line = line.trim_end().to_string();
        debug!("rigctld -> {}", line);
        Ok(line)
    }

    /// Send a set command and check its `RPRT` status
    fn set(&mut self, command: &str) -> RadioResult<()> {
        self.send(command)?;
        let line = self.read_line()?;
        match parse_rprt(&line) {
            Some(0) => Ok(()),
            Some(code) => Err(RadioError::Rejected { code }),
            None => Err(RadioError::BadReply { reply: line }),
        }
    }

    /// Send a get command and return the first value line
    fn get(&mut self, command: &str) -> RadioResult<String> {
        self.send(command)?;
        let line = self.read_line()?;
        match parse_rprt(&line) {
            Some(code) if code < 0 => Err(RadioError::Rejected { code }),
            _ => Ok(line),
        }
    }
}

/// `RPRT -11` -> `Some(-11)`
fn parse_rprt(line: &str) -> Option<i32> {
    line.strip_prefix("RPRT ")?.trim().parse().ok()
}

fn parse_value<T: std::str::FromStr>(line: String) -> RadioResult<T> {
    line.trim()
        .parse()
        .map_err(|_| RadioError::BadReply { reply: line })
}

/// Command text for setting `level` to `value`
fn level_command(level: Level, value: f32) -> String {
    if level.is_integer() {
        format!("L {} {}", level.name(), value.round() as i32)
    } else {
        format!("L {} {:.2}", level.name(), value)
    }
}

impl Rig for RigctldRig {
    fn set_level(&mut self, level: Level, value: f32) -> RadioResult<()> {
        self.set(&level_command(level, value))
    }

    fn get_level(&mut self, level: Level) -> RadioResult<f32> {
        let line = self.get(&format!("l {}", level.name()))?;
        parse_value(line)
    }

    fn set_func(&mut self, func: Func, on: bool) -> RadioResult<()> {
        self.set(&format!("U {} {}", func.name(), u8::from(on)))
    }

    fn get_func(&mut self, func: Func) -> RadioResult<bool> {
        let line = self.get(&format!("u {}", func.name()))?;
        Ok(parse_value::<i32>(line)? != 0)
    }

    fn set_freq(&mut self, hz: u64) -> RadioResult<()> {
        self.set(&format!("F {}", hz))
    }

    fn get_freq(&mut self) -> RadioResult<u64> {
        let line = self.get("f")?;
        // Some backends report "14250000.000000"
        let hz: f64 = parse_value(line)?;
        Ok(hz.round() as u64)
    }

    fn set_mode(&mut self, mode: RadioMode) -> RadioResult<()> {
        // Passband 0 selects the rig's normal width
        self.set(&format!("M {} 0", mode.name()))
    }

    fn get_mode(&mut self) -> RadioResult<String> {
        let mode = self.get("m")?;
        // Second line is the passband width
        let _ = self.read_line()?;
        Ok(mode)
    }

    fn set_vfo(&mut self, vfo: Vfo) -> RadioResult<()> {
        self.set(&format!("V {}", vfo.wire_name()))
    }

    fn get_vfo(&mut self) -> RadioResult<Vfo> {
        let line = self.get("v")?;
        Vfo::from_wire_name(line.trim()).ok_or(RadioError::BadReply { reply: line })
    }
}
