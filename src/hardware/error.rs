//! Link error types and handling

use thiserror::Error;

/// Errors raised by a transport adapter
#[derive(Debug, Error)]
pub enum LinkError {
    /// No byte arrived within the configured wait
    #[error("link timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The peer end is gone and no further bytes can arrive
    #[error("link closed by peer")]
    Closed,

    /// The underlying device reported an I/O failure
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or configured
    #[error("serial port error: {0}")]
    Port(#[from] serialport::Error),

    /// The chip-select line could not be driven
    #[error("chip select failed: {reason}")]
    ChipSelect { reason: String },

    /// The adapter could not be set up from its configuration
    #[error("link configuration error: invalid {parameter} = {value}")]
    Configuration { parameter: String, value: String },
}

/// Result type for transport operations
pub type LinkResult<T> = Result<T, LinkError>;

impl LinkError {
    /// Timeouts may clear on the next attempt; everything else will not
    pub fn is_recoverable(&self) -> bool {
        match self {
            LinkError::Timeout { .. } => true,
            LinkError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock
            ),
            LinkError::Closed
            | LinkError::Port(_)
            | LinkError::ChipSelect { .. }
            | LinkError::Configuration { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            LinkError::Timeout { timeout_ms: 250 }.to_string(),
            "link timeout after 250ms"
        );
        assert_eq!(LinkError::Closed.to_string(), "link closed by peer");
    }

    #[test]
    fn test_recoverability() {
        assert!(LinkError::Timeout { timeout_ms: 1 }.is_recoverable());
        assert!(!LinkError::Closed.is_recoverable());

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(!LinkError::from(io).is_recoverable());

        let pin = LinkError::ChipSelect { reason: "Other".to_string() };
        assert!(!pin.is_recoverable());
        assert_eq!(pin.to_string(), "chip select failed: Other");
    }
}
