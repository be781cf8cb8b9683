//! Errors raised while framing, sending or receiving commands

use crate::hardware::LinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload longer than the receiver's buffer
    #[error("payload of {length} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { length: usize, max: usize },

    /// Bounded receive wait expired before a full frame arrived
    #[error("no response within {timeout_ms}ms")]
    LinkTimeout { timeout_ms: u64 },

    /// Trailing byte was not END (strict terminator policy only)
    #[error("frame terminator mismatch: expected 0x7F, found 0x{found:02X}")]
    TerminatorMismatch { found: u8 },

    /// A second caller tried to use the link during an in-flight cycle
    #[error("protocol engine busy with another command")]
    EngineBusy,

    /// Transport failure other than a timeout
    #[error(transparent)]
    Link(LinkError),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl From<LinkError> for ProtocolError {
    fn from(error: LinkError) -> Self {
        match error {
            LinkError::Timeout { timeout_ms } => ProtocolError::LinkTimeout { timeout_ms },
            other => ProtocolError::Link(other),
        }
    }
}

impl ProtocolError {
    /// Whether retrying the same operation could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProtocolError::LinkTimeout { .. }
            | ProtocolError::TerminatorMismatch { .. }
            | ProtocolError::EngineBusy => true,
            ProtocolError::PayloadTooLarge { .. } => false,
            ProtocolError::Link(e) => e.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_timeout_is_lifted() {
        let error = ProtocolError::from(LinkError::Timeout { timeout_ms: 40 });
        assert!(matches!(error, ProtocolError::LinkTimeout { timeout_ms: 40 }));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_other_link_errors_are_wrapped() {
        let error = ProtocolError::from(LinkError::Closed);
        assert!(matches!(error, ProtocolError::Link(LinkError::Closed)));
        assert!(!error.is_recoverable());
        assert_eq!(error.to_string(), "link closed by peer");
    }

    #[test]
    fn test_messages() {
        let error = ProtocolError::PayloadTooLarge { length: 51, max: 50 };
        assert_eq!(error.to_string(), "payload of 51 bytes exceeds the 50-byte limit");

        let error = ProtocolError::TerminatorMismatch { found: 0x00 };
        assert_eq!(
            error.to_string(),
            "frame terminator mismatch: expected 0x7F, found 0x00"
        );
    }
}
