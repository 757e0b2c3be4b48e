//! Speech latency harness
//!
//! Speaks the name of every key pressed and prints how long the engine took:
//! synthesis time for WAV engines, full playback for `piper-stream`, and
//! dispatch time for the persistent engine, which speaks asynchronously.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::warn;

use super::{SpeechEngine, SpeechManager};
use crate::keypad::KeyEvent;

/// Word spoken for a key symbol
pub fn spoken_word(key: char) -> &'static str {
    match key {
        '0' => "zero",
        '1' => "one",
        '2' => "two",
        '3' => "three",
        '4' => "four",
        '5' => "five",
        '6' => "six",
        '7' => "seven",
        '8' => "eight",
        '9' => "nine",
        'A' => "alpha",
        'B' => "bravo",
        'C' => "charlie",
        'D' => "delta",
        '*' => "star",
        '#' => "pound",
        _ => "unknown",
    }
}

/// Timing line printed after each utterance
pub fn timing_line(engine: SpeechEngine, elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    match engine {
        SpeechEngine::PiperStream => format!("Total Playback Time (Stream): {} ms", ms),
        SpeechEngine::PiperPersistent => format!("Dispatch Time: {} ms (Async)", ms),
        _ => format!("Synthesis Latency: {} ms", ms),
    }
}

/// Engine banner printed at startup
pub fn engine_banner(speech: &SpeechManager) -> String {
    let config = speech.config();
    match speech.engine() {
        SpeechEngine::Festival => "Selected Engine: FESTIVAL".to_string(),
        SpeechEngine::Piper => format!("Selected Engine: PIPER (Model: {})", config.piper_model),
        SpeechEngine::PiperLow => {
            format!("Selected Engine: PIPER LOW (Model: {})", config.piper_model_low)
        }
        SpeechEngine::PiperStream => {
            format!("Selected Engine: PIPER STREAM (Model: {})", config.piper_model_low)
        }
        SpeechEngine::PiperPersistent => format!(
            "Selected Engine: PIPER PERSISTENT (Model: {})",
            config.piper_model_low
        ),
    }
}

/// Speak key names until the event channel closes
///
/// Returns the number of utterances that failed.
pub fn run<W: Write>(
    speech: &mut SpeechManager,
    mut events: mpsc::Receiver<KeyEvent>,
    out: &mut W,
) -> io::Result<usize> {
    let engine = speech.engine();
    let mut failures = 0;

    while let Some(event) = events.blocking_recv() {
        if event.is_hold {
            continue;
        }
        let word = spoken_word(event.key);
        writeln!(out, "Key: '{}' -> Speaking: \"{}\"", event.key, word)?;

        let start = Instant::now();
        let result = speech.speak(word).map(|_| {
            if engine == SpeechEngine::PiperStream {
                speech.wait_idle();
            }
        });
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                writeln!(out, "{}", timing_line(engine, elapsed))?;
                if engine != SpeechEngine::PiperPersistent {
                    speech.wait_idle();
                }
            }
            Err(e) => {
                failures += 1;
                warn!("Error generating speech for {:?}: {}", word, e);
                writeln!(out, "Error generating speech: {}", e)?;
            }
        }
        out.flush()?;
    }
    Ok(failures)
}
