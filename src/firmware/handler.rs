//! Keypad, audio and config requests served by the hardware side

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::RequestHandler;
use crate::codec::{payload_text, Frame, PacketType};
use crate::constants::{
    AUDIO_INTERRUPT, AUDIO_PLAY, AUDIO_SPEAK, KEYPAD_READ_REQUEST, NO_KEY_SYMBOLS, STATUS_FAILED,
    STATUS_OK,
};
use crate::error::{HampodError, Result};
use crate::keypad::KeySource;
use crate::speech::SpeechManager;

pub struct FirmwareHandler {
    keys: Box<dyn KeySource>,
    speech: Arc<Mutex<SpeechManager>>,
    pregen_dir: PathBuf,
}

impl FirmwareHandler {
    pub fn new(
        keys: Box<dyn KeySource>,
        speech: Arc<Mutex<SpeechManager>>,
        pregen_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            keys,
            speech,
            pregen_dir: pregen_dir.into(),
        }
    }

    fn keypad(&mut self, payload: &[u8]) -> u8 {
        if payload.first() != Some(&KEYPAD_READ_REQUEST) {
            debug!("Unexpected keypad request {:?}", payload);
        }
        match self.keys.read_key() {
            Ok(Some(key)) if key.is_ascii() => key as u8,
            Ok(_) => NO_KEY_SYMBOLS[0],
            Err(e) => {
                warn!("Key scan failed: {}", e);
                NO_KEY_SYMBOLS[0]
            }
        }
    }

    fn audio(&self, payload: &[u8]) -> Result<()> {
        let (&command, rest) = payload.split_first().ok_or_else(|| HampodError::Protocol {
            message: "empty audio request".to_string(),
        })?;
        let text = payload_text(rest);
        let mut speech = self.speech.lock();

        match command {
            AUDIO_SPEAK => speech.speak(&text),
            AUDIO_PLAY => {
                if !is_clip_name(&text) {
                    return Err(HampodError::Protocol {
                        message: format!("clip name outside the clip directory: {:?}", text),
                    });
                }
                let path = self.pregen_dir.join(format!("{}.wav", text));
                speech.play_file(&path)
            }
            AUDIO_INTERRUPT => speech.interrupt(),
            other => Err(HampodError::Protocol {
                message: format!("unknown audio command 0x{:02x}", other),
            }),
        }
    }

    fn config(&self, payload: &[u8]) -> Result<()> {
        let text = payload_text(payload);
        let (key, value) = text.split_once('=').ok_or_else(|| HampodError::Protocol {
            message: format!("config request without '=': {:?}", text),
        })?;
        let mut speech = self.speech.lock();

        match key.trim() {
            "speed" => speech.set_length_scale(value.trim()),
            "device" => speech.set_device(value.trim()),
            other => Err(HampodError::ConfigValidation {
                field: "config request",
                reason: format!("unknown key {:?}", other),
            }),
        }
    }
}

/// A bare clip name: no separators, no parent references
fn is_clip_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

fn status(packet_type: PacketType, result: Result<()>) -> Bytes {
    match result {
        Ok(()) => Bytes::from_static(&[STATUS_OK]),
        Err(e) => {
            warn!("{} request failed: {}", packet_type, e);
            Bytes::from_static(&[STATUS_FAILED])
        }
    }
}

impl RequestHandler for FirmwareHandler {
    fn handle(&mut self, request: &Frame) -> Bytes {
        match request.packet_type {
            PacketType::Keypad => Bytes::copy_from_slice(&[self.keypad(&request.payload)]),
            PacketType::Audio => status(PacketType::Audio, self.audio(&request.payload)),
            PacketType::Config => status(PacketType::Config, self.config(&request.payload)),
        }
    }
}
