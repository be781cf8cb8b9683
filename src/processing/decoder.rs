//! Receive state machine for frame-boundary synchronization
//!
//! Bytes are fed in one at a time. Anything before a START byte is noise and
//! is skipped without complaint; once START is seen the decoder walks the
//! header, payload, feedback flag and terminator, then hands back a frame
//! and goes back to searching.

use crate::core::{CommandFrame, CommandKind, END_BYTE, MAX_PAYLOAD_LEN, START_BYTE};
use crate::processing::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// What to do with the byte after the feedback flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminatorPolicy {
    /// Read the byte and accept any value
    #[default]
    Lenient,
    /// Reject frames whose last byte is not END
    Strict,
}

/// Where the decoder is inside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Searching,
    Header,
    Payload,
    Feedback,
    Terminator,
}

const HEADER_LEN: usize = 3;

pub struct FrameDecoder {
    policy: TerminatorPolicy,
    state: DecoderState,
    header: [u8; HEADER_LEN],
    header_pos: usize,
    payload: Vec<u8>,
    feedback: bool,
    discarded: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_policy(TerminatorPolicy::default())
    }

    pub fn with_policy(policy: TerminatorPolicy) -> Self {
        Self {
            policy,
            state: DecoderState::Searching,
            header: [0; HEADER_LEN],
            header_pos: 0,
            payload: Vec::with_capacity(MAX_PAYLOAD_LEN),
            feedback: false,
            discarded: 0,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn policy(&self) -> TerminatorPolicy {
        self.policy
    }

    /// Noise bytes skipped while searching for START, since creation
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drop any partial frame and resume searching
    pub fn reset(&mut self) {
        self.state = DecoderState::Searching;
        self.header_pos = 0;
        self.payload.clear();
        self.feedback = false;
    }

    /// Feed one byte. Returns the frame once its terminator has been read.
    ///
    /// On error the partial frame is dropped and the decoder is back in
    /// `Searching`, so the caller may keep feeding bytes.
    pub fn push(&mut self, byte: u8) -> ProtocolResult<Option<CommandFrame>> {
        match self.state {
            DecoderState::Searching => {
                if byte == START_BYTE {
                    self.header_pos = 0;
                    self.state = DecoderState::Header;
                } else {
                    self.discarded += 1;
                }
            }
            DecoderState::Header => {
                self.header[self.header_pos] = byte;
                self.header_pos += 1;

                if self.header_pos == HEADER_LEN {
                    let length = self.header[2] as usize;
                    if length > MAX_PAYLOAD_LEN {
                        self.reset();
                        return Err(ProtocolError::PayloadTooLarge {
                            length,
                            max: MAX_PAYLOAD_LEN,
                        });
                    }

                    self.payload.clear();
                    self.state = if length == 0 {
                        DecoderState::Feedback
                    } else {
                        DecoderState::Payload
                    };
                }
            }
            DecoderState::Payload => {
                self.payload.push(byte);
                if self.payload.len() == self.header[2] as usize {
                    self.state = DecoderState::Feedback;
                }
            }
            DecoderState::Feedback => {
                self.feedback = byte != 0;
                self.state = DecoderState::Terminator;
            }
            DecoderState::Terminator => {
                if self.policy == TerminatorPolicy::Strict && byte != END_BYTE {
                    self.reset();
                    return Err(ProtocolError::TerminatorMismatch { found: byte });
                }

                let frame = CommandFrame::new(
                    self.header[0],
                    CommandKind::from(self.header[1]),
                    std::mem::take(&mut self.payload),
                    self.feedback,
                )?;
                self.reset();
                return Ok(Some(frame));
            }
        }

        Ok(None)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<ProtocolResult<Option<CommandFrame>>> {
        bytes.iter().map(|&b| decoder.push(b)).collect()
    }

    #[test]
    fn test_state_walk() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.state(), DecoderState::Searching);

        decoder.push(START_BYTE).unwrap();
        assert_eq!(decoder.state(), DecoderState::Header);

        decoder.push(0x01).unwrap();
        decoder.push(0x01).unwrap();
        decoder.push(0x01).unwrap();
        assert_eq!(decoder.state(), DecoderState::Payload);

        decoder.push(0x05).unwrap();
        assert_eq!(decoder.state(), DecoderState::Feedback);

        decoder.push(0x00).unwrap();
        assert_eq!(decoder.state(), DecoderState::Terminator);

        let frame = decoder.push(END_BYTE).unwrap().unwrap();
        assert_eq!(frame.kind(), CommandKind::WaterPlant);
        assert_eq!(frame.payload(), &[0x05]);
        assert_eq!(decoder.state(), DecoderState::Searching);
    }

    #[test]
    fn test_empty_payload_skips_payload_state() {
        let mut decoder = FrameDecoder::new();
        feed(&mut decoder, &[START_BYTE, 0x01, 0x02, 0x00]);
        assert_eq!(decoder.state(), DecoderState::Feedback);
    }

    #[test]
    fn test_noise_is_counted_and_skipped() {
        let mut decoder = FrameDecoder::new();
        let results = feed(&mut decoder, &[0x00, 0xFF, 0x7F, START_BYTE]);
        assert!(results.iter().all(|r| matches!(r, Ok(None))));
        assert_eq!(decoder.discarded(), 3);
        assert_eq!(decoder.state(), DecoderState::Header);
    }

    #[test]
    fn test_oversized_length_resets() {
        let mut decoder = FrameDecoder::new();
        feed(&mut decoder, &[START_BYTE, 0x01, 0x01]);

        let result = decoder.push(51);
        assert!(matches!(
            result,
            Err(ProtocolError::PayloadTooLarge { length: 51, max: 50 })
        ));
        assert_eq!(decoder.state(), DecoderState::Searching);
    }

    #[test]
    fn test_lenient_accepts_any_terminator() {
        let mut decoder = FrameDecoder::new();
        feed(&mut decoder, &[START_BYTE, 0x01, 0x02, 0x00, 0x01]);
        let frame = decoder.push(0x00).unwrap().unwrap();
        assert!(frame.feedback_requested());
    }

    #[test]
    fn test_strict_rejects_bad_terminator() {
        let mut decoder = FrameDecoder::with_policy(TerminatorPolicy::Strict);
        feed(&mut decoder, &[START_BYTE, 0x01, 0x02, 0x00, 0x00]);

        let result = decoder.push(0x55);
        assert!(matches!(result, Err(ProtocolError::TerminatorMismatch { found: 0x55 })));
        assert_eq!(decoder.state(), DecoderState::Searching);

        feed(&mut decoder, &[START_BYTE, 0x01, 0x02, 0x00, 0x00]);
        assert!(decoder.push(END_BYTE).unwrap().is_some());
    }

    #[test]
    fn test_nonzero_feedback_byte_is_true() {
        let mut decoder = FrameDecoder::new();
        feed(&mut decoder, &[START_BYTE, 0x01, 0x03, 0x00, 0xA0]);
        let frame = decoder.push(END_BYTE).unwrap().unwrap();
        assert!(frame.feedback_requested());
    }

    #[test]
    fn test_start_byte_inside_payload_is_data() {
        let mut decoder = FrameDecoder::new();
        feed(&mut decoder, &[START_BYTE, 0x01, 0x03, 0x02, START_BYTE, 0x10, 0x00]);
        let frame = decoder.push(END_BYTE).unwrap().unwrap();
        assert_eq!(frame.payload(), &[START_BYTE, 0x10]);
    }
}
