//! Rotating packet trace file.
//!
//! The router's reader thread must never stall on disk I/O, so tracing is:
//! - a bounded queue (non-blocking `try_send`, overflow dropped)
//! - a dedicated thread with buffered writes and periodic flush

use super::PacketTrace;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TraceFileConfig {
    pub path: PathBuf,
    pub max_bytes: u64,
    pub max_files: usize,
    pub flush_interval: Duration,
    pub channel_capacity: usize,
}

/// Cloneable handle feeding the trace thread
#[derive(Clone)]
pub struct TraceSink {
    tx: SyncSender<PacketTrace>,
}

impl TraceSink {
    /// Queue one trace; dropped if the writer is behind or gone
    pub fn record(&self, trace: PacketTrace) {
        match self.tx.try_send(trace) {
            Ok(()) | Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

pub fn spawn_trace_file(cfg: TraceFileConfig) -> io::Result<TraceSink> {
    if let Some(parent) = cfg.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let (file, size) = open_append(&cfg.path)?;
    let (tx, rx) = sync_channel::<PacketTrace>(cfg.channel_capacity.max(1));

    thread::Builder::new()
        .name("hampod-trace".to_string())
        .spawn(move || run_writer(rx, cfg, file, size))?;

    Ok(TraceSink { tx })
}

fn run_writer(rx: Receiver<PacketTrace>, cfg: TraceFileConfig, file: File, start_size: u64) {
    let max_bytes = cfg.max_bytes.max(1024);
    let max_files = cfg.max_files.max(1);
    let flush_interval = if cfg.flush_interval.is_zero() {
        Duration::from_millis(250)
    } else {
        cfg.flush_interval
    };

    let mut writer = BufWriter::new(file);
    let mut size = start_size;
    let mut dirty = false;
    let mut last_flush = Instant::now();

    loop {
        match rx.recv_timeout(flush_interval) {
            Ok(trace) => {
                let line = trace.format_line();
                if writeln!(writer, "{}", line).is_ok() {
                    size = size.saturating_add(line.len() as u64 + 1);
                    dirty = true;
                }

                if size >= max_bytes {
                    let _ = writer.flush();
                    drop(writer);
                    let _ = rotate_files(&cfg.path, max_files);
                    match open_truncate(&cfg.path) {
                        Ok(f) => {
                            writer = BufWriter::new(f);
                            size = 0;
                            dirty = false;
                            last_flush = Instant::now();
                        }
                        // Cannot reopen: stop tracing
                        Err(_) => break,
                    }
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                if dirty && last_flush.elapsed() >= flush_interval {
                    let _ = writer.flush();
                    dirty = false;
                    last_flush = Instant::now();
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                let _ = writer.flush();
                break;
            }
        }
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

fn open_truncate(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// Shift `trace.log` -> `trace.log.1` -> ... keeping at most `max_files` backups
fn rotate_files(path: &Path, max_files: usize) -> io::Result<()> {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "hampod-trace.log".to_string());
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let _ = fs::remove_file(dir.join(format!("{}.{}", name, max_files)));

    for i in (1..max_files).rev() {
        let src = dir.join(format!("{}.{}", name, i));
        if src.exists() {
            let _ = fs::rename(&src, dir.join(format!("{}.{}", name, i + 1)));
        }
    }

    if path.exists() {
        fs::rename(path, dir.join(format!("{}.1", name)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Frame, PacketType};

    fn unique_temp_dir() -> PathBuf {
        let base = std::env::temp_dir();
        let pid = std::process::id();
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        base.join(format!("hampod-trace-{}-{}", pid, ts))
    }

    #[test]
    fn test_rotate_files_keeps_max_files() {
        let dir = unique_temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("trace.log");

        fs::write(&path, "active").unwrap();
        fs::write(dir.join("trace.log.1"), "one").unwrap();
        fs::write(dir.join("trace.log.2"), "two").unwrap();

        rotate_files(&path, 2).unwrap();

        assert!(!path.exists());
        assert_eq!(fs::read_to_string(dir.join("trace.log.1")).unwrap(), "active");
        assert_eq!(fs::read_to_string(dir.join("trace.log.2")).unwrap(), "one");
        assert!(!dir.join("trace.log.3").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_trace_lines_reach_file() {
        let dir = unique_temp_dir();
        let path = dir.join("trace.log");
        let sink = spawn_trace_file(TraceFileConfig {
            path: path.clone(),
            max_bytes: 1 << 20,
            max_files: 2,
            flush_interval: Duration::from_millis(10),
            channel_capacity: 16,
        })
        .unwrap();

        let frame = Frame::new(PacketType::Keypad, 7, &b"r"[..]).unwrap();
        sink.record(PacketTrace::outbound(&frame));
        // Dropping the last sender makes the writer flush and exit
        drop(sink);

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut contents = String::new();
        while Instant::now() < deadline {
            contents = fs::read_to_string(&path).unwrap_or_default();
            if !contents.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(contents.contains("OUT KEYPAD tag=7 (1 B)"), "{}", contents);

        let _ = fs::remove_dir_all(&dir);
    }
}
