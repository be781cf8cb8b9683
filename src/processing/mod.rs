//! Frame codec, receive state machine and protocol engine

pub mod codec;
pub mod decoder;
pub mod engine;
pub mod error;

pub use codec::{encode, encode_into, decode, decode_with, decode_slice};
pub use decoder::{FrameDecoder, DecoderState, TerminatorPolicy};
pub use engine::{ProtocolEngine, SharedEngine, EngineState, LinkStats};
pub use error::{ProtocolError, ProtocolResult};
