//! Sub-commands for the serial MP3 module driven by Audio frames
//!
//! Each sub-command is three bytes: an opcode and a 16-bit argument, sent
//! high byte first.

use serde::{Deserialize, Serialize};

pub const NEXT_TRACK: u8 = 0x01;
pub const PREVIOUS_TRACK: u8 = 0x02;
pub const PLAY_TRACK: u8 = 0x03;
pub const SET_VOLUME: u8 = 0x06;
pub const RESUME: u8 = 0x0D;
pub const PAUSE: u8 = 0x0E;
pub const PLAY_WITH_VOLUME: u8 = 0x22;

/// Loudest volume step the module accepts
pub const MAX_VOLUME: u8 = 0x1E;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCommand {
    pub opcode: u8,
    pub arg_hi: u8,
    pub arg_lo: u8,
}

impl AudioCommand {
    pub const fn new(opcode: u8, arg_hi: u8, arg_lo: u8) -> Self {
        Self { opcode, arg_hi, arg_lo }
    }

    /// First three payload bytes, verbatim; `None` if the payload is shorter
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [opcode, arg_hi, arg_lo, ..] => Some(Self::new(*opcode, *arg_hi, *arg_lo)),
            _ => None,
        }
    }

    pub fn play_with_volume(volume: u8, track: u8) -> Self {
        Self::new(PLAY_WITH_VOLUME, volume.min(MAX_VOLUME), track)
    }

    pub fn play_track(track: u16) -> Self {
        let [hi, lo] = track.to_be_bytes();
        Self::new(PLAY_TRACK, hi, lo)
    }

    pub fn set_volume(volume: u8) -> Self {
        Self::new(SET_VOLUME, 0x00, volume.min(MAX_VOLUME))
    }

    pub fn next_track() -> Self {
        Self::new(NEXT_TRACK, 0x00, 0x00)
    }

    pub fn previous_track() -> Self {
        Self::new(PREVIOUS_TRACK, 0x00, 0x00)
    }

    pub fn pause() -> Self {
        Self::new(PAUSE, 0x00, 0x00)
    }

    pub fn resume() -> Self {
        Self::new(RESUME, 0x00, 0x00)
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.opcode, self.arg_hi, self.arg_lo]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_with_volume_layout() {
        assert_eq!(AudioCommand::play_with_volume(0x1E, 0x01).to_bytes(), [0x22, 0x1E, 0x01]);
        assert_eq!(AudioCommand::play_with_volume(0xFF, 0x02).arg_hi, MAX_VOLUME);
    }

    #[test]
    fn test_from_payload_takes_first_three_bytes() {
        let command = AudioCommand::from_payload(&[0x0E, 0x00, 0x00, 0x99]).unwrap();
        assert_eq!(command, AudioCommand::pause());
        assert!(AudioCommand::from_payload(&[0x01, 0x00]).is_none());
    }

    #[test]
    fn test_play_track_is_big_endian() {
        assert_eq!(AudioCommand::play_track(0x0102).to_bytes(), [PLAY_TRACK, 0x01, 0x02]);
    }
}
