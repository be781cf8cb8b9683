//! Protocol engine: half-duplex send / feedback / receive orchestration
//!
//! The engine owns the transport. A send always runs to completion before
//! any receive starts, and each call holds the link for its whole cycle:
//!
//! ```text
//! IDLE -> SENDING -> (feedback ? RECEIVING : IDLE) -> IDLE
//! ```
//!
//! Exclusive access comes from `&mut self`; threads that need to share one
//! link go through [`SharedEngine`].

use crate::core::CommandFrame;
use crate::hardware::TransportAdapter;
use crate::processing::codec;
use crate::processing::decoder::{FrameDecoder, TerminatorPolicy};
use crate::processing::error::{ProtocolError, ProtocolResult};
use crate::utils::config::ProtocolConfig;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default pause after each byte so the peer can consume it
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_micros(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Sending,
    Receiving,
}

/// Running counters for one link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub noise_discarded: u64,
    pub receive_errors: u64,
}

pub struct ProtocolEngine<T> {
    transport: T,
    state: EngineState,
    settle_delay: Duration,
    receive_timeout: Option<Duration>,
    decoder: FrameDecoder,
    stats: LinkStats,
}

impl<T: TransportAdapter> ProtocolEngine<T> {
    /// Engine with the default settle delay, unbounded receive and lenient
    /// terminator handling
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: EngineState::Idle,
            settle_delay: DEFAULT_SETTLE_DELAY,
            receive_timeout: None,
            decoder: FrameDecoder::new(),
            stats: LinkStats::default(),
        }
    }

    pub fn from_config(transport: T, config: &ProtocolConfig) -> Self {
        Self::new(transport)
            .with_settle_delay(config.settle_delay())
            .with_receive_timeout(config.receive_timeout())
            .with_terminator_policy(config.terminator_policy)
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Bound each byte wait while receiving; `None` waits forever
    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_terminator_policy(mut self, policy: TerminatorPolicy) -> Self {
        self.decoder = FrameDecoder::with_policy(policy);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> LinkStats {
        LinkStats {
            noise_discarded: self.decoder.discarded(),
            ..self.stats
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send a frame and, if it asks for feedback, wait for the reply
    ///
    /// Returns `Ok(None)` for fire-and-forget frames.
    pub fn send_command(&mut self, frame: &CommandFrame) -> ProtocolResult<Option<CommandFrame>> {
        self.transmit(frame)?;

        if !frame.feedback_requested() {
            self.state = EngineState::Idle;
            return Ok(None);
        }

        self.receive().map(Some)
    }

    /// Wait for the next frame from the peer without sending anything
    pub fn receive_frame(&mut self) -> ProtocolResult<CommandFrame> {
        self.receive()
    }

    /// Send a frame without waiting for anything back, whatever its
    /// feedback flag says
    pub fn respond(&mut self, frame: &CommandFrame) -> ProtocolResult<()> {
        self.transmit(frame)?;
        self.state = EngineState::Idle;
        Ok(())
    }

    /// Leaves the engine in `Sending` on success; the caller decides the
    /// next state
    fn transmit(&mut self, frame: &CommandFrame) -> ProtocolResult<()> {
        let bytes = codec::encode(frame)?;
        debug!(%frame, "sending frame");

        self.state = EngineState::Sending;
        if let Err(e) = self.send_bytes(&bytes) {
            self.state = EngineState::Idle;
            return Err(e);
        }

        self.stats.frames_sent += 1;
        Ok(())
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> ProtocolResult<()> {
        for &byte in bytes {
            self.transport.send_byte(byte)?;
            self.stats.bytes_sent += 1;

            if !self.settle_delay.is_zero() {
                std::thread::sleep(self.settle_delay);
            }
        }
        Ok(())
    }

    fn receive(&mut self) -> ProtocolResult<CommandFrame> {
        self.state = EngineState::Receiving;
        let result = codec::decode_with(&mut self.transport, &mut self.decoder, self.receive_timeout);
        self.state = EngineState::Idle;

        match &result {
            Ok(frame) => {
                self.stats.frames_received += 1;
                debug!(%frame, "received frame");
            }
            Err(e) => {
                self.stats.receive_errors += 1;
                warn!(error = %e, "receive failed");
            }
        }
        result
    }
}

/// Engine handle that many threads can hold
///
/// Every operation takes the link lock for its full cycle, so a send and its
/// feedback wait are never interleaved with another caller's traffic.
pub struct SharedEngine<T> {
    inner: Arc<Mutex<ProtocolEngine<T>>>,
}

impl<T> Clone for SharedEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TransportAdapter> SharedEngine<T> {
    pub fn new(engine: ProtocolEngine<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Wait for the link, then run a full send cycle
    pub fn send_command(&self, frame: &CommandFrame) -> ProtocolResult<Option<CommandFrame>> {
        self.inner.lock().send_command(frame)
    }

    /// Run a send cycle only if nobody else holds the link
    pub fn try_send_command(&self, frame: &CommandFrame) -> ProtocolResult<Option<CommandFrame>> {
        match self.inner.try_lock() {
            Some(mut engine) => engine.send_command(frame),
            None => Err(ProtocolError::EngineBusy),
        }
    }

    pub fn receive_frame(&self) -> ProtocolResult<CommandFrame> {
        self.inner.lock().receive_frame()
    }

    pub fn stats(&self) -> LinkStats {
        self.inner.lock().stats()
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut ProtocolEngine<T>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
