//! Routes decoded frames to the unit's actuator subsystems
//!
//! Dispatch is fail-open: unknown command kinds, short payloads, missing
//! collaborators and collaborator failures all produce an outcome rather
//! than an error, so one bad frame never stops the unit's service loop.

use crate::core::{CommandFrame, CommandKind};
use crate::dispatch::audio::AudioCommand;
use crate::hardware::TransportAdapter;
use crate::processing::{ProtocolEngine, ProtocolResult};
use crate::sensors::{RawSample, SensorReadings};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure reported by an actuator collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("{subsystem} is not responding")]
    Unavailable { subsystem: &'static str },

    #[error("{subsystem} failed: {reason}")]
    Failed { subsystem: &'static str, reason: String },
}

/// Water pump driver
pub trait PumpControl {
    /// Toggle the pump identified by `actuator`
    fn toggle_pump(&mut self, actuator: u8) -> Result<(), ActuatorError>;
}

/// Source of raw sensor samples
pub trait SensorSampler {
    fn sample(&mut self) -> Result<RawSample, ActuatorError>;
}

/// Serial MP3 module
pub trait AudioModule {
    fn send_command(&mut self, command: AudioCommand) -> Result<(), ActuatorError>;
}

/// Why a frame produced no action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownCommand(u8),
    ShortPayload { expected: usize, found: usize },
    NoHandler(CommandKind),
}

/// Result of dispatching one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    PumpToggled { actuator: u8 },
    SensorsSampled(SensorReadings),
    AudioForwarded(AudioCommand),
    Ignored(IgnoreReason),
    Failed(ActuatorError),
}

impl DispatchOutcome {
    /// Reply frame for a request that asked for feedback
    ///
    /// The reply carries the request's kind. Sensor requests carry the
    /// readings; every other outcome is acknowledged with an empty payload.
    pub fn reply_to(&self, request: &CommandFrame) -> ProtocolResult<Option<CommandFrame>> {
        if !request.feedback_requested() {
            return Ok(None);
        }

        let payload = match self {
            DispatchOutcome::SensorsSampled(readings) => readings.to_payload().to_vec(),
            _ => Vec::new(),
        };

        CommandFrame::new(request.version(), request.kind(), payload, false).map(Some)
    }
}

#[derive(Default)]
pub struct CommandDispatcher {
    pump: Option<Box<dyn PumpControl + Send>>,
    sampler: Option<Box<dyn SensorSampler + Send>>,
    audio: Option<Box<dyn AudioModule + Send>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pump(mut self, pump: impl PumpControl + Send + 'static) -> Self {
        self.pump = Some(Box::new(pump));
        self
    }

    pub fn with_sampler(mut self, sampler: impl SensorSampler + Send + 'static) -> Self {
        self.sampler = Some(Box::new(sampler));
        self
    }

    pub fn with_audio(mut self, audio: impl AudioModule + Send + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    pub fn dispatch(&mut self, frame: &CommandFrame) -> DispatchOutcome {
        let outcome = match frame.kind() {
            CommandKind::WaterPlant => self.water_plant(frame.payload()),
            CommandKind::RequestSensorData => self.sample_sensors(),
            CommandKind::Audio => self.forward_audio(frame.payload()),
            CommandKind::Unknown(code) => DispatchOutcome::Ignored(IgnoreReason::UnknownCommand(code)),
        };

        match &outcome {
            DispatchOutcome::Ignored(reason) => debug!(?reason, %frame, "frame ignored"),
            DispatchOutcome::Failed(error) => warn!(%error, %frame, "actuator failed"),
            _ => info!(?outcome, "dispatched"),
        }
        outcome
    }

    fn water_plant(&mut self, payload: &[u8]) -> DispatchOutcome {
        let Some(&actuator) = payload.first() else {
            return DispatchOutcome::Ignored(IgnoreReason::ShortPayload { expected: 1, found: 0 });
        };
        let Some(pump) = self.pump.as_mut() else {
            return DispatchOutcome::Ignored(IgnoreReason::NoHandler(CommandKind::WaterPlant));
        };

        match pump.toggle_pump(actuator) {
            Ok(()) => DispatchOutcome::PumpToggled { actuator },
            Err(e) => DispatchOutcome::Failed(e),
        }
    }

    fn sample_sensors(&mut self) -> DispatchOutcome {
        let Some(sampler) = self.sampler.as_mut() else {
            return DispatchOutcome::Ignored(IgnoreReason::NoHandler(CommandKind::RequestSensorData));
        };

        match sampler.sample() {
            Ok(sample) => DispatchOutcome::SensorsSampled(SensorReadings::from_raw(&sample)),
            Err(e) => DispatchOutcome::Failed(e),
        }
    }

    fn forward_audio(&mut self, payload: &[u8]) -> DispatchOutcome {
        let Some(command) = AudioCommand::from_payload(payload) else {
            return DispatchOutcome::Ignored(IgnoreReason::ShortPayload {
                expected: 3,
                found: payload.len(),
            });
        };
        let Some(audio) = self.audio.as_mut() else {
            return DispatchOutcome::Ignored(IgnoreReason::NoHandler(CommandKind::Audio));
        };

        match audio.send_command(command) {
            Ok(()) => DispatchOutcome::AudioForwarded(command),
            Err(e) => DispatchOutcome::Failed(e),
        }
    }
}

/// One request handled by the unit's service loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedRequest {
    pub request: CommandFrame,
    pub outcome: DispatchOutcome,
    pub reply: Option<CommandFrame>,
}

/// Receive one frame, dispatch it and answer it if the sender is waiting
pub fn serve_one<T: TransportAdapter>(
    engine: &mut ProtocolEngine<T>,
    dispatcher: &mut CommandDispatcher,
) -> ProtocolResult<ServedRequest> {
    let request = engine.receive_frame()?;
    let outcome = dispatcher.dispatch(&request);

    let reply = outcome.reply_to(&request)?;
    if let Some(reply) = &reply {
        engine.respond(reply)?;
    }

    Ok(ServedRequest {
        request,
        outcome,
        reply,
    })
}
