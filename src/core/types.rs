//! Core data types for the command protocol

use crate::core::constants::{DEFAULT_PROTOCOL_VERSION, FRAME_OVERHEAD, MAX_PAYLOAD_LEN};
use crate::processing::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// What a frame asks the receiving unit to do
///
/// Codes outside the known set survive encode/decode as `Unknown` so the
/// dispatcher can decide to ignore them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum CommandKind {
    WaterPlant,
    RequestSensorData,
    Audio,
    Unknown(u8),
}

impl CommandKind {
    /// Wire code for this kind
    pub fn code(self) -> u8 {
        match self {
            CommandKind::WaterPlant => 0x01,
            CommandKind::RequestSensorData => 0x02,
            CommandKind::Audio => 0x03,
            CommandKind::Unknown(code) => code,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(CommandKind::from(self.code()), CommandKind::Unknown(_))
    }
}

impl From<u8> for CommandKind {
    fn from(code: u8) -> Self {
        match code {
            0x01 => CommandKind::WaterPlant,
            0x02 => CommandKind::RequestSensorData,
            0x03 => CommandKind::Audio,
            other => CommandKind::Unknown(other),
        }
    }
}

impl From<CommandKind> for u8 {
    fn from(kind: CommandKind) -> Self {
        kind.code()
    }
}

// Equality follows the wire code so `Unknown(1)` and `WaterPlant` compare equal.
impl PartialEq for CommandKind {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for CommandKind {}

impl Hash for CommandKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match CommandKind::from(self.code()) {
            CommandKind::WaterPlant => write!(f, "water-plant"),
            CommandKind::RequestSensorData => write!(f, "request-sensor-data"),
            CommandKind::Audio => write!(f, "audio"),
            CommandKind::Unknown(code) => write!(f, "unknown(0x{:02X})", code),
        }
    }
}

/// One complete protocol message
///
/// Fields are private: a frame can only be built through [`CommandFrame::new`],
/// which enforces the payload capacity, and is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrameRecord", into = "FrameRecord")]
pub struct CommandFrame {
    version: u8,
    kind: CommandKind,
    payload: Vec<u8>,
    feedback_requested: bool,
}

impl CommandFrame {
    /// Build a frame, rejecting payloads longer than [`MAX_PAYLOAD_LEN`]
    pub fn new(
        version: u8,
        kind: CommandKind,
        payload: impl Into<Vec<u8>>,
        feedback_requested: bool,
    ) -> ProtocolResult<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                length: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        Ok(Self {
            version,
            // `Unknown(1)` and `WaterPlant` must route the same way
            kind: CommandKind::from(kind.code()),
            payload,
            feedback_requested,
        })
    }

    /// Fire-and-forget frame stamped with the default protocol version
    pub fn command(kind: CommandKind, payload: impl Into<Vec<u8>>) -> ProtocolResult<Self> {
        Self::new(DEFAULT_PROTOCOL_VERSION, kind, payload, false)
    }

    /// Frame stamped with the default protocol version that asks for a reply
    pub fn request(kind: CommandKind, payload: impl Into<Vec<u8>>) -> ProtocolResult<Self> {
        Self::new(DEFAULT_PROTOCOL_VERSION, kind, payload, true)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Length byte as it appears on the wire
    pub fn payload_len(&self) -> u8 {
        // Bounded by MAX_PAYLOAD_LEN at construction.
        self.payload.len() as u8
    }

    pub fn feedback_requested(&self) -> bool {
        self.feedback_requested
    }

    /// Number of bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{} {} [{} bytes]{}",
            self.version,
            self.kind,
            self.payload.len(),
            if self.feedback_requested { " +feedback" } else { "" }
        )
    }
}

/// Plain serde shape of a frame; converted through `CommandFrame::new`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameRecord {
    #[serde(default = "default_version")]
    version: u8,
    kind: CommandKind,
    #[serde(default)]
    payload: Vec<u8>,
    #[serde(default)]
    feedback: bool,
}

fn default_version() -> u8 {
    DEFAULT_PROTOCOL_VERSION
}

impl TryFrom<FrameRecord> for CommandFrame {
    type Error = ProtocolError;

    fn try_from(record: FrameRecord) -> Result<Self, Self::Error> {
        CommandFrame::new(record.version, record.kind, record.payload, record.feedback)
    }
}

impl From<CommandFrame> for FrameRecord {
    fn from(frame: CommandFrame) -> Self {
        Self {
            version: frame.version,
            kind: frame.kind,
            payload: frame.payload,
            feedback: frame.feedback_requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_kind_codes() {
        assert_eq!(CommandKind::from(1), CommandKind::WaterPlant);
        assert_eq!(CommandKind::from(2), CommandKind::RequestSensorData);
        assert_eq!(CommandKind::from(3), CommandKind::Audio);
        assert_eq!(CommandKind::from(99), CommandKind::Unknown(99));
        assert_eq!(u8::from(CommandKind::Audio), 3);
        assert!(!CommandKind::Unknown(0).is_known());
    }

    #[test]
    fn test_unknown_with_known_code_compares_equal() {
        assert_eq!(CommandKind::Unknown(1), CommandKind::WaterPlant);
        assert!(CommandKind::Unknown(3).is_known());
    }

    #[test]
    fn test_frame_stores_canonical_kind() {
        let frame = CommandFrame::command(CommandKind::Unknown(1), vec![0x00]).unwrap();
        assert!(matches!(frame.kind(), CommandKind::WaterPlant));

        let frame = CommandFrame::command(CommandKind::Unknown(99), vec![]).unwrap();
        assert!(matches!(frame.kind(), CommandKind::Unknown(99)));
    }

    #[test]
    fn test_frame_construction() {
        let frame = CommandFrame::new(1, CommandKind::Audio, vec![0x22, 0x1E, 0x01], false).unwrap();
        assert_eq!(frame.version(), 1);
        assert_eq!(frame.kind(), CommandKind::Audio);
        assert_eq!(frame.payload_len(), 3);
        assert_eq!(frame.encoded_len(), 9);
        assert!(!frame.feedback_requested());
    }

    #[test]
    fn test_payload_capacity() {
        assert!(CommandFrame::command(CommandKind::WaterPlant, vec![0u8; 50]).is_ok());

        let result = CommandFrame::command(CommandKind::WaterPlant, vec![0u8; 51]);
        assert!(matches!(
            result,
            Err(ProtocolError::PayloadTooLarge { length: 51, max: 50 })
        ));
    }

    #[test]
    fn test_frame_json_rejects_oversized_payload() {
        let json = format!(r#"{{"kind": 1, "payload": {:?}}}"#, vec![0u8; 51]);
        assert!(serde_json::from_str::<CommandFrame>(&json).is_err());

        let frame: CommandFrame = serde_json::from_str(r#"{"kind": 2, "feedback": true}"#).unwrap();
        assert_eq!(frame.kind(), CommandKind::RequestSensorData);
        assert_eq!(frame.version(), DEFAULT_PROTOCOL_VERSION);
        assert!(frame.feedback_requested());
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_display() {
        let frame = CommandFrame::request(CommandKind::Unknown(0x63), vec![]).unwrap();
        assert_eq!(frame.to_string(), "v1 unknown(0x63) [0 bytes] +feedback");
    }
}
