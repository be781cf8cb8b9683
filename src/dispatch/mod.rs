//! Unit-side command handling and host-side key bindings

pub mod audio;
pub mod dispatcher;
pub mod keymap;

pub use audio::AudioCommand;
pub use dispatcher::{
    CommandDispatcher, DispatchOutcome, IgnoreReason, ActuatorError,
    PumpControl, SensorSampler, AudioModule, ServedRequest, serve_one,
};
pub use keymap::{Keymap, KeyBinding, DEFAULT_KEYMAP};
