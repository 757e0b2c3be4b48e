//! Logging
//!
//! - `init_tracing` - process-wide `tracing` subscriber
//! - `PacketTrace` - one line per frame crossing the transport
//! - `file` - rotating trace file fed from a bounded queue

pub mod entry;
pub mod file;

pub use entry::{Direction, PacketTrace};
pub use file::{spawn_trace_file, TraceFileConfig, TraceSink};

/// Initialize tracing output
///
/// Call early in main() before any logging occurs.
/// `verbose` selects debug-level output; `RUST_LOG` overrides both.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(filter)
        .try_init();
}
