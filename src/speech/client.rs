//! Speech requests from the control side

use std::time::Duration;

use tracing::warn;

use crate::codec::{text_payload, Frame, PacketType};
use crate::constants::{AUDIO_INTERRUPT, AUDIO_PLAY, AUDIO_SPEAK, STATUS_OK};
use crate::error::{HampodError, Result};
use crate::overlay::Speaker;
use crate::router::Client;

/// Sends AUDIO and CONFIG requests to the firmware side
pub struct AudioClient {
    client: Client,
    timeout: Duration,
}

impl AudioClient {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn speak(&self, text: &str) -> Result<()> {
        self.audio(text_payload(Some(AUDIO_SPEAK), text))
    }

    /// Play a pre-generated clip by name, without the `.wav` suffix
    pub fn play(&self, clip: &str) -> Result<()> {
        self.audio(text_payload(Some(AUDIO_PLAY), clip))
    }

    pub fn interrupt(&self) -> Result<()> {
        self.audio(text_payload(Some(AUDIO_INTERRUPT), ""))
    }

    /// Send one `key=value` setting
    pub fn configure(&self, key: &str, value: &str) -> Result<()> {
        let payload = text_payload(None, &format!("{}={}", key, value));
        let response = self
            .client
            .request(PacketType::Config, payload, self.timeout)?;
        check_status(&response)
    }

    fn audio(&self, payload: bytes::Bytes) -> Result<()> {
        let response = self
            .client
            .request(PacketType::Audio, payload, self.timeout)?;
        check_status(&response)
    }
}

fn check_status(response: &Frame) -> Result<()> {
    match response.first_byte() {
        Some(STATUS_OK) => Ok(()),
        Some(status) => Err(HampodError::Protocol {
            message: format!("{} request failed with status {}", response.packet_type, status),
        }),
        None => Err(HampodError::Protocol {
            message: format!("empty {} response", response.packet_type),
        }),
    }
}

impl Speaker for AudioClient {
    fn say(&mut self, text: &str) {
        if let Err(e) = self.speak(text) {
            warn!("Speech failed for {:?}: {}", text, e);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::codec::{payload_text, read_frame, write_frame};
    use crate::router::Router;
    use crate::transport::TransportChannels;
    use std::thread;

    /// Answer `count` requests with the given status, returning their payloads
    fn peer(
        mut channels: TransportChannels,
        count: usize,
        status: u8,
    ) -> thread::JoinHandle<Vec<(PacketType, String)>> {
        thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..count {
                let request = read_frame(&mut channels.reader).unwrap();
                seen.push((request.packet_type, payload_text(&request.payload)));
                let response = Frame::new(request.packet_type, request.tag, vec![status]).unwrap();
                write_frame(&mut channels.writer, &response).unwrap();
            }
            seen
        })
    }

    fn setup() -> (TransportChannels, Router, AudioClient) {
        let (remote, local) = TransportChannels::pair().unwrap();
        let router = Router::spawn(
            local.reader,
            &[PacketType::Audio, PacketType::Config],
            4,
            None,
        )
        .unwrap();
        let client = Client::new(local.writer, &router);
        (remote, router, AudioClient::new(client, Duration::from_secs(2)))
    }

    #[test]
    fn test_requests_carry_prefix_and_text() {
        let (remote, router, audio) = setup();
        let firmware = peer(remote, 4, STATUS_OK);

        audio.speak("Frequency set").unwrap();
        audio.play("beep").unwrap();
        audio.interrupt().unwrap();
        audio.configure("speed", "1.2").unwrap();

        assert_eq!(
            firmware.join().unwrap(),
            vec![
                (PacketType::Audio, "sFrequency set".to_string()),
                (PacketType::Audio, "pbeep".to_string()),
                (PacketType::Audio, "i".to_string()),
                (PacketType::Config, "speed=1.2".to_string()),
            ]
        );
        router.shutdown();
    }

    #[test]
    fn test_failure_status_is_an_error() {
        let (remote, router, audio) = setup();
        let firmware = peer(remote, 1, 1);

        assert!(matches!(
            audio.speak("hello"),
            Err(HampodError::Protocol { .. })
        ));
        firmware.join().unwrap();
        router.shutdown();
    }

    #[test]
    fn test_say_swallows_errors() {
        let (remote, router, mut audio) = setup();
        let firmware = peer(remote, 1, 1);
        audio.say("hello");
        firmware.join().unwrap();
        router.shutdown();
    }
}
