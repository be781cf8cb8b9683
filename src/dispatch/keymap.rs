//! Keyboard symbol to command frame table for the debug console

use crate::core::{CommandFrame, CommandKind};
use crate::dispatch::audio;
use crate::processing::ProtocolResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub symbol: char,
    pub kind: CommandKind,
    pub payload: &'static [u8],
    pub feedback: bool,
    pub description: &'static str,
}

impl KeyBinding {
    pub fn to_frame(&self, version: u8) -> ProtocolResult<CommandFrame> {
        CommandFrame::new(version, self.kind, self.payload, self.feedback)
    }
}

pub static DEFAULT_KEYMAP: &[KeyBinding] = &[
    KeyBinding {
        symbol: 'w',
        kind: CommandKind::WaterPlant,
        payload: &[0x00],
        feedback: false,
        description: "toggle pump 0",
    },
    KeyBinding {
        symbol: 'W',
        kind: CommandKind::WaterPlant,
        payload: &[0x01],
        feedback: false,
        description: "toggle pump 1",
    },
    KeyBinding {
        symbol: 's',
        kind: CommandKind::RequestSensorData,
        payload: &[],
        feedback: true,
        description: "read sensors",
    },
    KeyBinding {
        symbol: 'p',
        kind: CommandKind::Audio,
        payload: &[audio::PLAY_WITH_VOLUME, audio::MAX_VOLUME, 0x01],
        feedback: false,
        description: "play track 1 at full volume",
    },
    KeyBinding {
        symbol: 'n',
        kind: CommandKind::Audio,
        payload: &[audio::NEXT_TRACK, 0x00, 0x00],
        feedback: false,
        description: "next track",
    },
    KeyBinding {
        symbol: 'b',
        kind: CommandKind::Audio,
        payload: &[audio::PREVIOUS_TRACK, 0x00, 0x00],
        feedback: false,
        description: "previous track",
    },
    KeyBinding {
        symbol: 'x',
        kind: CommandKind::Audio,
        payload: &[audio::PAUSE, 0x00, 0x00],
        feedback: false,
        description: "pause audio",
    },
    KeyBinding {
        symbol: 'r',
        kind: CommandKind::Audio,
        payload: &[audio::RESUME, 0x00, 0x00],
        feedback: false,
        description: "resume audio",
    },
    KeyBinding {
        symbol: 'q',
        kind: CommandKind::Audio,
        payload: &[audio::SET_VOLUME, 0x00, 0x0A],
        feedback: false,
        description: "quiet volume",
    },
];

pub struct Keymap {
    bindings: &'static [KeyBinding],
    version: u8,
}

impl Keymap {
    pub fn new(version: u8) -> Self {
        Self::with_bindings(DEFAULT_KEYMAP, version)
    }

    pub fn with_bindings(bindings: &'static [KeyBinding], version: u8) -> Self {
        Self { bindings, version }
    }

    pub fn bindings(&self) -> &'static [KeyBinding] {
        self.bindings
    }

    pub fn lookup(&self, symbol: char) -> Option<&'static KeyBinding> {
        self.bindings.iter().find(|binding| binding.symbol == symbol)
    }

    /// Frame bound to `symbol`, or `None` for unbound keys
    pub fn frame_for(&self, symbol: char) -> ProtocolResult<Option<CommandFrame>> {
        self.lookup(symbol)
            .map(|binding| binding.to_frame(self.version))
            .transpose()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(crate::core::DEFAULT_PROTOCOL_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::codec;
    use std::collections::HashSet;

    #[test]
    fn test_symbols_are_unique() {
        let symbols: HashSet<char> = DEFAULT_KEYMAP.iter().map(|b| b.symbol).collect();
        assert_eq!(symbols.len(), DEFAULT_KEYMAP.len());
    }

    #[test]
    fn test_every_binding_builds_a_frame() {
        let keymap = Keymap::default();
        for binding in keymap.bindings() {
            let frame = keymap.frame_for(binding.symbol).unwrap().unwrap();
            assert_eq!(frame.kind(), binding.kind);
            assert_eq!(frame.payload(), binding.payload);
        }
    }

    #[test]
    fn test_play_key_encodes_audio_frame() {
        let frame = Keymap::default().frame_for('p').unwrap().unwrap();
        assert_eq!(
            codec::encode(&frame).unwrap(),
            vec![0x7E, 0x01, 0x03, 0x03, 0x22, 0x1E, 0x01, 0x00, 0x7F]
        );
    }

    #[test]
    fn test_sensor_key_asks_for_feedback() {
        let frame = Keymap::new(2).frame_for('s').unwrap().unwrap();
        assert!(frame.feedback_requested());
        assert_eq!(frame.version(), 2);
    }

    #[test]
    fn test_unbound_key() {
        assert!(Keymap::default().frame_for('?').unwrap().is_none());
    }
}
