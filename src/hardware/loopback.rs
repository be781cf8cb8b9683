//! In-memory transports for testing and development

use crate::core::{FRAME_OVERHEAD, START_BYTE};
use crate::hardware::{LinkError, LinkResult, TransportAdapter};
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;

/// Echoes every byte it is sent back onto its own receive queue
///
/// Receiving from an empty queue can never be satisfied, so the unbounded
/// `receive_byte` reports `LinkError::Closed` instead of hanging.
pub struct LoopbackTransport {
    echo_queue: VecDeque<u8>,
    bytes_sent: u64,
    noise_probability: f32,
    /// Bytes of the frame currently being sent, 0 between frames
    frame_position: usize,
    frame_len: Option<usize>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            echo_queue: VecDeque::new(),
            bytes_sent: 0,
            noise_probability: 0.0,
            frame_position: 0,
            frame_len: None,
        }
    }

    /// Inject a burst of non-START garbage ahead of each frame's START byte
    /// with the given probability (0.0 to 1.0). START values inside a frame
    /// are data and never get noise in front of them.
    pub fn with_line_noise(mut self, probability: f32) -> Self {
        self.noise_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn pending(&self) -> usize {
        self.echo_queue.len()
    }

    fn should_inject_noise(&self) -> bool {
        if self.noise_probability <= 0.0 {
            return false;
        }

        let mut rng = rand::thread_rng();
        rng.gen::<f32>() < self.noise_probability
    }

    fn inject_noise(&mut self) {
        let mut rng = rand::thread_rng();
        let count = rng.gen_range(1..=4);
        for _ in 0..count {
            let mut byte: u8 = rng.gen();
            if byte == START_BYTE {
                byte = !byte;
            }
            self.echo_queue.push_back(byte);
        }
    }

    /// Follow the outgoing frame so noise only lands between frames
    fn track_frame(&mut self, byte: u8) {
        if self.frame_position == 0 {
            if byte == START_BYTE {
                self.frame_position = 1;
            }
            return;
        }

        self.frame_position += 1;
        if self.frame_position == 4 {
            // byte 3 is the payload length
            self.frame_len = Some(byte as usize + FRAME_OVERHEAD);
        }
        if self.frame_len == Some(self.frame_position) {
            self.frame_position = 0;
            self.frame_len = None;
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportAdapter for LoopbackTransport {
    fn send_byte(&mut self, byte: u8) -> LinkResult<()> {
        if self.frame_position == 0 && byte == START_BYTE && self.should_inject_noise() {
            self.inject_noise();
        }

        self.track_frame(byte);
        self.echo_queue.push_back(byte);
        self.bytes_sent += 1;
        Ok(())
    }

    fn receive_byte(&mut self) -> LinkResult<u8> {
        self.echo_queue.pop_front().ok_or(LinkError::Closed)
    }

    fn receive_byte_within(&mut self, timeout: Duration) -> LinkResult<u8> {
        self.echo_queue.pop_front().ok_or(LinkError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

/// Plays back a fixed receive stream and records everything sent
pub struct ScriptedTransport {
    incoming: VecDeque<u8>,
    sent: Vec<u8>,
}

impl ScriptedTransport {
    pub fn new(incoming: impl IntoIterator<Item = u8>) -> Self {
        Self {
            incoming: incoming.into_iter().collect(),
            sent: Vec::new(),
        }
    }

    /// A peer that never sends anything
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    /// Append more bytes to the receive stream
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    pub fn remaining(&self) -> usize {
        self.incoming.len()
    }
}

impl TransportAdapter for ScriptedTransport {
    fn send_byte(&mut self, byte: u8) -> LinkResult<()> {
        self.sent.push(byte);
        Ok(())
    }

    fn receive_byte(&mut self) -> LinkResult<u8> {
        self.incoming.pop_front().ok_or(LinkError::Closed)
    }

    fn receive_byte_within(&mut self, timeout: Duration) -> LinkResult<u8> {
        self.incoming.pop_front().ok_or(LinkError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_echoes_in_order() {
        let mut link = LoopbackTransport::new();
        link.send_byte(0x01).unwrap();
        link.send_byte(0x02).unwrap();

        assert_eq!(link.bytes_sent(), 2);
        assert_eq!(link.receive_byte().unwrap(), 0x01);
        assert_eq!(link.receive_byte().unwrap(), 0x02);
        assert!(matches!(link.receive_byte(), Err(LinkError::Closed)));
    }

    #[test]
    fn test_loopback_timeout_when_empty() {
        let mut link = LoopbackTransport::new();
        let result = link.receive_byte_within(Duration::from_millis(5));
        assert!(matches!(result, Err(LinkError::Timeout { timeout_ms: 5 })));
    }

    #[test]
    fn test_line_noise_never_forges_start() {
        let mut link = LoopbackTransport::new().with_line_noise(1.0);
        link.send_byte(START_BYTE).unwrap();

        assert!(link.pending() >= 2);
        let mut seen = Vec::new();
        while let Ok(byte) = link.receive_byte() {
            seen.push(byte);
        }
        assert_eq!(seen.iter().filter(|&&b| b == START_BYTE).count(), 1);
        assert_eq!(*seen.last().unwrap(), START_BYTE);
    }

    #[test]
    fn test_line_noise_stays_between_frames() {
        let mut link = LoopbackTransport::new().with_line_noise(1.0);
        let frame = [START_BYTE, 0x01, 0x01, 0x03, 0x01, START_BYTE, 0x02, 0x00, 0x7F];
        for _ in 0..2 {
            for &byte in &frame {
                link.send_byte(byte).unwrap();
            }
        }

        let mut seen = Vec::new();
        while let Ok(byte) = link.receive_byte() {
            seen.push(byte);
        }

        // two noise bursts, each directly followed by an intact frame
        let first = seen.iter().position(|&b| b == START_BYTE).unwrap();
        assert!(first >= 1);
        assert_eq!(&seen[first..first + frame.len()], &frame);

        let rest = &seen[first + frame.len()..];
        let second = rest.iter().position(|&b| b == START_BYTE).unwrap();
        assert!(second >= 1);
        assert_eq!(&rest[second..], &frame);
    }

    #[test]
    fn test_scripted_playback_and_recording() {
        let mut link = ScriptedTransport::new([0xAA, 0xBB]);
        link.send_byte(0x10).unwrap();
        assert_eq!(link.receive_byte().unwrap(), 0xAA);

        link.push_incoming(&[0xCC]);
        assert_eq!(link.remaining(), 2);
        assert_eq!(link.sent(), &[0x10]);
    }
}
