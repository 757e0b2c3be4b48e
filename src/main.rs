//! HAMPOD control core
//!
//! Usage:
//!   hampod [control]                  Run the control side (default)
//!   hampod firmware                   Run the hardware side
//!   hampod speech-test [ENGINE] [SPEED]
//!                                     Speak key names and print latency

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use hampod::cli::{Cli, Command};
use hampod::config::{self, Config, LoggingConfig, RadioBackend, RadioConfig};
use hampod::constants::{CHANNEL_CAPACITY, STDIN_KEY_PRESS_MS};
use hampod::keypad::{spawn_poller, KeyEvent, StdinKeys};
use hampod::logging::{self, spawn_trace_file, TraceSink};
use hampod::radio::{DummyRig, RadioControl, Reconnect, Rig, RigctldRig};
use hampod::speech::{latency, SpeechEngine, SpeechManager};
use hampod::{HampodError, Result};

/// How often the main thread checks whether workers are done
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    let config = config::load(cli.config.as_deref());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    runtime.spawn(wait_for_signal(shutdown.clone()));

    let result = match cli.command() {
        Command::Control => run_control(config, shutdown),
        Command::Firmware => run_firmware(config, shutdown),
        Command::SpeechTest { engine, speed } => {
            run_speech_test(config, engine.into(), speed, shutdown)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Flip the shutdown flag on SIGINT or SIGTERM
async fn wait_for_signal(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                warn!("Signal handlers unavailable, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested");
    shutdown.store(true, Ordering::SeqCst);
}

/// Sleep until shutdown is requested or `done` reports true
fn supervise(shutdown: &AtomicBool, mut done: impl FnMut() -> bool) {
    while !shutdown.load(Ordering::Relaxed) && !done() {
        thread::sleep(SUPERVISE_INTERVAL);
    }
    shutdown.store(true, Ordering::SeqCst);
}

fn open_trace(cfg: &LoggingConfig) -> Option<TraceSink> {
    let trace = cfg.trace_config()?;
    let path = trace.path.clone();
    match spawn_trace_file(trace) {
        Ok(sink) => {
            info!("Packet trace: {}", path.display());
            Some(sink)
        }
        Err(e) => {
            warn!("Packet trace disabled, cannot open {}: {}", path.display(), e);
            None
        }
    }
}

fn build_radio(cfg: &RadioConfig) -> (Arc<RadioControl>, Option<Reconnect>) {
    match cfg.backend {
        RadioBackend::Dummy => {
            info!("Using in-memory rig");
            (Arc::new(RadioControl::new(Box::new(DummyRig::new()))), None)
        }
        RadioBackend::Rigctld => {
            let addr = cfg.rigctld_addr.clone();
            let timeout = Duration::from_millis(cfg.io_timeout_ms);
            let connect: Reconnect = Box::new(move || {
                let rig: Box<dyn Rig> = Box::new(RigctldRig::connect(&addr, timeout)?);
                Ok(rig)
            });

            let radio = match connect() {
                Ok(rig) => {
                    info!("Connected to rigctld at {}", cfg.rigctld_addr);
                    RadioControl::new(rig)
                }
                Err(e) => {
                    warn!(
                        "rigctld at {} unavailable ({}), radio commands will fail until it answers",
                        cfg.rigctld_addr, e
                    );
                    RadioControl::disconnected()
                }
            };
            (Arc::new(radio), Some(connect))
        }
    }
}

fn join_worker(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("{} thread panicked", name);
    }
}

// =============================================================================
// Control side
// =============================================================================

#[cfg(unix)]
fn run_control(config: Config, shutdown: Arc<AtomicBool>) -> Result<()> {
    use hampod::codec::PacketType;
    use hampod::control::{spawn_control_loop, ControlContext, ControlEvent};
    use hampod::keypad::RemoteKeypad;
    use hampod::radio::spawn_monitor;
    use hampod::router::{Client, Router};
    use hampod::speech::AudioClient;
    use hampod::transport::PipeTransport;

    let trace = open_trace(&config.logging);
    let paths = config.transport.pipe_paths();
    info!(
        "Connecting to firmware via {} / {}",
        paths.firmware_output.display(),
        paths.firmware_input.display()
    );
    let channels = PipeTransport::new(paths).connect(config.transport.retry_policy())?;

    let router = Router::spawn(
        channels.reader,
        &[PacketType::Keypad, PacketType::Audio, PacketType::Config],
        config.router.queue_capacity,
        trace,
    )?;
    let client = Client::new(channels.writer, &router);

    let (radio, reconnect) = build_radio(&config.radio);
    let (tx, rx) = mpsc::channel::<ControlEvent>(CHANNEL_CAPACITY);

    let keypad = RemoteKeypad::new(client.clone(), config.router.response_timeout());
    let poller = spawn_poller(
        Box::new(keypad),
        config.keypad.timing(),
        tx.clone(),
        shutdown.clone(),
    )?;

    let monitor = if config.radio.poll_interval_ms > 0 {
        Some(spawn_monitor(
            radio.clone(),
            Duration::from_millis(config.radio.poll_interval_ms),
            reconnect,
            tx.clone(),
            shutdown.clone(),
        )?)
    } else {
        None
    };
    drop(tx);

    let speech = AudioClient::new(client, config.router.audio_timeout());
    let control = spawn_control_loop(ControlContext::new(radio, speech), rx)?;
    info!("Control side running");

    supervise(&shutdown, || poller.is_finished());
    router.shutdown();

    join_worker("keypad", poller);
    if let Some(monitor) = monitor {
        join_worker("radio monitor", monitor);
    }
    if control.join().is_err() {
        error!("control thread panicked");
    }

    let stats = router.stats();
    info!(
        "Control side stopped ({} frames in, {} out, {} discarded)",
        stats.frames_in(),
        stats.frames_out(),
        stats.mismatched()
    );
    Ok(())
}

// =============================================================================
// Firmware side
// =============================================================================

#[cfg(unix)]
fn run_firmware(config: Config, shutdown: Arc<AtomicBool>) -> Result<()> {
    use hampod::firmware::{serve, FirmwareHandler};
    use hampod::transport::PipeTransport;

    let speech = Arc::new(Mutex::new(SpeechManager::new(config.speech.clone())));
    if let Err(e) = speech.lock().init() {
        warn!("Speech unavailable: {}", e);
    }

    let keys = StdinKeys::spawn(Duration::from_millis(STDIN_KEY_PRESS_MS))?;
    let mut handler = FirmwareHandler::new(
        Box::new(keys),
        speech.clone(),
        config.speech.pregen_dir.clone(),
    );
    let trace = open_trace(&config.logging);
    let transport = PipeTransport::new(config.transport.pipe_paths());
    eprintln!("Type keys one per line: <key> [milliseconds held]");

    let server_shutdown = shutdown.clone();
    let server = thread::Builder::new()
        .name("hampod-firmware".to_string())
        .spawn(move || -> Result<u64> {
            let channels = transport.listen()?;
            info!("Control side connected");
            serve(channels, &mut handler, &server_shutdown, trace)
        })
        .map_err(|source| HampodError::Runtime { source })?;

    supervise(&shutdown, || server.is_finished());
    speech.lock().cleanup();

    // A server still blocked on the pipe is abandoned at exit
    if !server.is_finished() {
        return Ok(());
    }
    match server.join() {
        Ok(result) => result.map(|served| info!("Served {} requests", served)),
        Err(_) => {
            error!("firmware thread panicked");
            Ok(())
        }
    }
}

#[cfg(not(unix))]
fn run_control(_config: Config, _shutdown: Arc<AtomicBool>) -> Result<()> {
    Err(unsupported())
}

#[cfg(not(unix))]
fn run_firmware(_config: Config, _shutdown: Arc<AtomicBool>) -> Result<()> {
    Err(unsupported())
}

#[cfg(not(unix))]
fn unsupported() -> HampodError {
    HampodError::ConfigValidation {
        field: "transport",
        reason: "named pipes require a unix host".into(),
    }
}

// =============================================================================
// Speech latency harness
// =============================================================================

fn run_speech_test(
    mut config: Config,
    engine: SpeechEngine,
    speed: String,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    config.speech.engine = engine;
    config.speech.length_scale = speed;
    config.validate()?;

    let mut speech = SpeechManager::new(config.speech.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let print = |out: &mut io::StdoutLock, line: &str| {
        let _ = writeln!(out, "{}", line);
    };

    print(&mut out, "=== HAMPOD Speech Latency Test ===");
    print(&mut out, "Press Ctrl+C to exit\n");
    print(&mut out, &latency::engine_banner(&speech));
    if engine.uses_piper() {
        print(
            &mut out,
            &format!("Selected Speed (Length Scale): {}", config.speech.length_scale),
        );
    }

    speech.init()?;
    print(&mut out, &format!("Speech engine: {}", speech.impl_name()));
    if engine == SpeechEngine::PiperPersistent {
        print(&mut out, "Pipeline started. Speaking is now asynchronous.");
    }

    let keys = StdinKeys::spawn(Duration::from_millis(STDIN_KEY_PRESS_MS))?;
    let (tx, rx) = mpsc::channel::<KeyEvent>(CHANNEL_CAPACITY);
    let poller = spawn_poller(Box::new(keys), config.keypad.timing(), tx, shutdown)?;

    print(&mut out, "\nSystem Ready!");
    print(
        &mut out,
        "Type a key per line (0-9, A-D, *, #). Each key name is spoken.\n",
    );

    let failures = latency::run(&mut speech, rx, &mut out).map_err(|e| HampodError::Io {
        path: "stdout".into(),
        source: e,
    })?;
    join_worker("keypad", poller);

    print(&mut out, "\nCleaning up...");
    speech.cleanup();
    let _ = std::fs::remove_file(&config.speech.scratch_file);
    if failures > 0 {
        warn!("{} utterances failed", failures);
    }
    Ok(())
}
