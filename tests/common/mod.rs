//! Fake firmware shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;

use hampod::codec::{payload_text, Frame, PacketType};
use hampod::constants::{STATUS_FAILED, STATUS_OK};
use hampod::firmware::{serve, RequestHandler};
use hampod::router::{Client, Router};
use hampod::transport::TransportChannels;

/// Scripted keys, records every audio and config payload
#[derive(Clone, Default)]
pub struct Bench {
    pub keys: Arc<Mutex<VecDeque<Option<char>>>>,
    pub heard: Arc<Mutex<Vec<String>>>,
    pub fail_audio: bool,
}

impl Bench {
    /// Queue a short press: a few samples down, then enough empty samples
    /// to release
    pub fn tap(&self, keys: &str) {
        let mut script = self.keys.lock();
        for key in keys.chars() {
            script.extend([Some(key), Some(key)]);
            script.extend([None; 4]);
        }
    }

    /// Queue a press lasting `samples` polls
    pub fn hold(&self, key: char, samples: usize) {
        let mut script = self.keys.lock();
        script.extend(std::iter::repeat(Some(key)).take(samples));
        script.extend([None; 4]);
    }

    pub fn heard(&self) -> Vec<String> {
        self.heard.lock().clone()
    }

    /// Wait until `pred` holds for what the firmware has heard
    pub fn wait_for(&self, timeout: Duration, pred: impl Fn(&[String]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if pred(&self.heard.lock()) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

impl RequestHandler for Bench {
    fn handle(&mut self, request: &Frame) -> Bytes {
        match request.packet_type {
            PacketType::Keypad => {
                let key = self.keys.lock().pop_front().flatten();
                Bytes::from(vec![key.map_or(b'-', |k| k as u8)])
            }
            PacketType::Audio | PacketType::Config => {
                self.heard.lock().push(payload_text(&request.payload));
                let status = if self.fail_audio {
                    STATUS_FAILED
                } else {
                    STATUS_OK
                };
                Bytes::from(vec![status])
            }
        }
    }
}

pub struct Session {
    pub router: Router,
    pub client: Client,
    pub server: thread::JoinHandle<hampod::Result<u64>>,
}

/// Firmware server on one end of a socket pair, router and client on the other
pub fn start(bench: Bench) -> Session {
    let (control, firmware) = TransportChannels::pair().unwrap();
    let server = thread::spawn(move || {
        let mut handler = bench;
        let shutdown = AtomicBool::new(false);
        serve(firmware, &mut handler, &shutdown, None)
    });

    let router = Router::spawn(
        control.reader,
        &[PacketType::Keypad, PacketType::Audio, PacketType::Config],
        16,
        None,
    )
    .unwrap();
    let client = Client::new(control.writer, &router);
    Session {
        router,
        client,
        server,
    }
}
