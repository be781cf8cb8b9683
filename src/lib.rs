//! Plant-Care Command Link
//!
//! Framed command protocol between a controller and the units of a
//! plant-care device swarm, over a half-duplex byte link.

pub mod core;
pub mod processing;
pub mod hardware;
pub mod dispatch;
pub mod sensors;
pub mod utils;

// Re-export commonly used types
pub use self::core::{CommandFrame, CommandKind, START_BYTE, END_BYTE, MAX_PAYLOAD_LEN};
pub use processing::{
    encode, decode, FrameDecoder, TerminatorPolicy, ProtocolEngine, SharedEngine,
    EngineState, LinkStats, ProtocolError, ProtocolResult,
};
pub use hardware::{TransportAdapter, LinkConfig, LinkError, LinkResult, LoopbackTransport, SerialTransport};
pub use dispatch::{CommandDispatcher, DispatchOutcome, Keymap, serve_one};
pub use utils::{ConfigurationManager, ProtocolConfig};
