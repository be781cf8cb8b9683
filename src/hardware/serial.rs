//! Byte-stream bus driver for real links
//!
//! `SerialTransport` drives any `Read + Write` port (a `serialport` handle
//! in production) one byte at a time, asserting a chip-select line around
//! every transfer. Any `embedded_hal` output pin can serve as that line.

use crate::hardware::{InterfaceType, LinkConfig, LinkError, LinkResult, TransportAdapter};
use embedded_hal::digital::{ErrorType, OutputPin};
use serialport::SerialPort;
use std::convert::Infallible;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Line rate used when a serial link leaves `baud_rate` unset
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Select line bracketing each byte transfer
pub trait ChipSelect {
    /// Assert the select line so the peer listens
    fn select(&mut self) -> LinkResult<()>;

    /// Release the select line
    fn deselect(&mut self) -> LinkResult<()>;
}

/// Active-low select: driven low for the transfer, high otherwise
impl<P: OutputPin> ChipSelect for P {
    fn select(&mut self) -> LinkResult<()> {
        self.set_low().map_err(|e| LinkError::ChipSelect {
            reason: format!("{:?}", e),
        })
    }

    fn deselect(&mut self) -> LinkResult<()> {
        self.set_high().map_err(|e| LinkError::ChipSelect {
            reason: format!("{:?}", e),
        })
    }
}

/// For links where the port handles selection itself
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChipSelect;

impl ErrorType for NoChipSelect {
    type Error = Infallible;
}

impl OutputPin for NoChipSelect {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Serial bus driver
pub struct SerialTransport<P, C = NoChipSelect> {
    port: P,
    chip_select: C,
    poll_interval: Duration,
    eof_is_idle: bool,
}

impl<P: Read + Write> SerialTransport<P, NoChipSelect> {
    pub fn new(port: P) -> Self {
        Self::with_chip_select(port, NoChipSelect)
    }
}

impl<P: Read + Write, C: ChipSelect> SerialTransport<P, C> {
    pub fn with_chip_select(port: P, chip_select: C) -> Self {
        Self {
            port,
            chip_select,
            poll_interval: Duration::from_micros(200),
            eof_is_idle: false,
        }
    }

    /// Sleep between polls while the port reports no data
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Treat a zero-length read as "nothing yet" rather than end of stream.
    /// Terminal devices configured with a read timeout behave this way.
    pub fn with_eof_as_idle(mut self, eof_is_idle: bool) -> Self {
        self.eof_is_idle = eof_is_idle;
        self
    }

    pub fn into_inner(self) -> (P, C) {
        (self.port, self.chip_select)
    }

    /// Run one transfer with the select line asserted. A transfer error wins
    /// over a deselect error.
    fn selected<R>(
        &mut self,
        transfer: impl FnOnce(&mut P) -> std::io::Result<R>,
    ) -> LinkResult<std::io::Result<R>> {
        self.chip_select.select()?;
        let result = transfer(&mut self.port);
        let released = self.chip_select.deselect();

        match (result, released) {
            (Err(e), _) if !is_idle(&e) => Err(LinkError::Io(e)),
            (result, Ok(())) => Ok(result),
            (_, Err(e)) => Err(e),
        }
    }

    /// One select-bracketed read attempt
    fn try_read(&mut self) -> LinkResult<Option<u8>> {
        let mut buf = [0u8; 1];

        match self.selected(|port| port.read(&mut buf))? {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) if self.eof_is_idle => Ok(None),
            Ok(_) => Err(LinkError::Closed),
            // only idle kinds get past `selected`
            Err(_) => Ok(None),
        }
    }

    fn read_until(&mut self, deadline: Option<(Instant, Duration)>) -> LinkResult<u8> {
        loop {
            if let Some(byte) = self.try_read()? {
                trace!("rx 0x{:02X}", byte);
                return Ok(byte);
            }

            if let Some((deadline, timeout)) = deadline {
                if Instant::now() >= deadline {
                    return Err(LinkError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            }

            if !self.poll_interval.is_zero() {
                std::thread::sleep(self.poll_interval);
            }
        }
    }
}

/// Read outcomes that mean "no data yet" on a port with a read timeout
fn is_idle(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

impl<P: Read + Write, C: ChipSelect> TransportAdapter for SerialTransport<P, C> {
    fn send_byte(&mut self, byte: u8) -> LinkResult<()> {
        self.selected(|port| port.write_all(&[byte]).and_then(|_| port.flush()))??;
        trace!("tx 0x{:02X}", byte);
        Ok(())
    }

    fn receive_byte(&mut self) -> LinkResult<u8> {
        self.read_until(None)
    }

    fn receive_byte_within(&mut self, timeout: Duration) -> LinkResult<u8> {
        self.read_until(Some((Instant::now() + timeout, timeout)))
    }
}

/// Serial port handle as returned by `serialport`
pub type SerialPortHandle = Box<dyn SerialPort>;

/// Open the port named by a serial link configuration
pub fn open_device(config: &LinkConfig) -> LinkResult<SerialTransport<SerialPortHandle>> {
    open_device_with(config, NoChipSelect)
}

/// Open the port named by a serial link configuration, bracketing every
/// byte with `chip_select`
pub fn open_device_with<C: ChipSelect>(
    config: &LinkConfig,
    chip_select: C,
) -> LinkResult<SerialTransport<SerialPortHandle, C>> {
    config.validate()?;

    if config.interface != InterfaceType::Serial {
        return Err(LinkError::Configuration {
            parameter: "interface".to_string(),
            value: format!("{:?}", config.interface),
        });
    }

    let path = config.device_path.as_deref().unwrap_or_default();
    let baud_rate = config.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    // The port blocks for up to one poll interval per read, so no extra
    // sleep is needed between attempts.
    let read_timeout = config.poll_interval().max(Duration::from_millis(1));

    let port = serialport::new(path, baud_rate).timeout(read_timeout).open()?;
    debug!(device = path, baud_rate, "opened serial link");

    Ok(SerialTransport::with_chip_select(port, chip_select).with_poll_interval(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Read/write pair: reads come from `input`, writes land in `output`
    struct Port {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Port {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for Port {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Port {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Pin that records its levels and can be told to fail
    #[derive(Default)]
    struct RecordingPin {
        levels: Vec<&'static str>,
        fail: bool,
    }

    impl ErrorType for RecordingPin {
        type Error = embedded_hal::digital::ErrorKind;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.levels.push("low");
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.levels.push("high");
            if self.fail {
                return Err(embedded_hal::digital::ErrorKind::Other);
            }
            Ok(())
        }
    }

    /// Port whose writes always fail
    struct BrokenPort;

    impl Read for BrokenPort {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::TimedOut, "no data"))
        }
    }

    impl Write for BrokenPort {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_each_byte_is_select_bracketed() {
        let mut link = SerialTransport::with_chip_select(Port::new(vec![0x42]), RecordingPin::default());
        link.send_byte(0x7E).unwrap();
        link.send_byte(0x01).unwrap();
        assert_eq!(link.receive_byte().unwrap(), 0x42);

        let (port, pin) = link.into_inner();
        assert_eq!(port.output, vec![0x7E, 0x01]);
        assert_eq!(pin.levels, vec!["low", "high", "low", "high", "low", "high"]);
    }

    #[test]
    fn test_write_error_wins_over_deselect_error() {
        let pin = RecordingPin {
            fail: true,
            ..RecordingPin::default()
        };
        let mut link = SerialTransport::with_chip_select(BrokenPort, pin);

        assert!(matches!(link.send_byte(0x7E), Err(LinkError::Io(e)) if e.kind() == ErrorKind::BrokenPipe));
        let (_, pin) = link.into_inner();
        assert_eq!(pin.levels, vec!["low", "high"]);
    }

    #[test]
    fn test_deselect_error_reported_after_clean_transfer() {
        let pin = RecordingPin {
            fail: true,
            ..RecordingPin::default()
        };
        let mut link = SerialTransport::with_chip_select(Port::new(vec![]), pin);
        assert!(matches!(link.send_byte(0x01), Err(LinkError::ChipSelect { .. })));

        let pin = RecordingPin {
            fail: true,
            ..RecordingPin::default()
        };
        let mut link = SerialTransport::with_chip_select(BrokenPort, pin);
        assert!(matches!(
            link.receive_byte_within(Duration::from_millis(5)),
            Err(LinkError::ChipSelect { .. })
        ));
    }

    #[test]
    fn test_read_timeout_counts_as_idle() {
        let mut link = SerialTransport::new(BrokenPort).with_poll_interval(Duration::ZERO);
        let result = link.receive_byte_within(Duration::from_millis(5));
        assert!(matches!(result, Err(LinkError::Timeout { timeout_ms: 5 })));
    }

    #[test]
    fn test_end_of_stream_is_closed() {
        let mut link = SerialTransport::new(Port::new(vec![]));
        assert!(matches!(link.receive_byte(), Err(LinkError::Closed)));
    }

    #[test]
    fn test_idle_device_times_out() {
        let mut link = SerialTransport::new(Port::new(vec![]))
            .with_eof_as_idle(true)
            .with_poll_interval(Duration::from_millis(1));

        let result = link.receive_byte_within(Duration::from_millis(10));
        assert!(matches!(result, Err(LinkError::Timeout { timeout_ms: 10 })));
    }

    #[test]
    fn test_open_device_rejects_loopback_config() {
        let result = open_device(&LinkConfig::loopback());
        assert!(matches!(result, Err(LinkError::Configuration { .. })));
    }

    #[test]
    fn test_open_missing_device() {
        let config = LinkConfig::serial("/nonexistent/plantlink-device", 9600);
        assert!(matches!(open_device(&config), Err(LinkError::Port(_))));
    }
}
