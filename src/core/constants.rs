//! Wire-level constants for the framed command protocol

/// Marks the first byte of every frame
pub const START_BYTE: u8 = 0x7E;

/// Expected value of the trailing byte of every frame
pub const END_BYTE: u8 = 0x7F;

/// Capacity of the receiver's payload buffer (bytes)
pub const MAX_PAYLOAD_LEN: usize = 50;

/// START + version + kind + length + feedback + END
pub const FRAME_OVERHEAD: usize = 6;

/// Largest encoded frame
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + FRAME_OVERHEAD;

/// Protocol version stamped on frames built by this crate
pub const DEFAULT_PROTOCOL_VERSION: u8 = 1;
