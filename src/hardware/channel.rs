//! Two connected in-memory link ends, for running a host and a peer on
//! separate threads

use crate::hardware::{LinkError, LinkResult, TransportAdapter};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// One end of an in-memory full link
///
/// Bytes sent on one end arrive at the other. Receiving blocks the calling
/// thread until the peer sends or drops its end.
pub struct ChannelTransport {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

impl ChannelTransport {
    /// Create a connected pair `(host, peer)`
    pub fn pair() -> (Self, Self) {
        let (host_tx, peer_rx) = unbounded();
        let (peer_tx, host_rx) = unbounded();

        (
            Self { tx: host_tx, rx: host_rx },
            Self { tx: peer_tx, rx: peer_rx },
        )
    }
}

impl TransportAdapter for ChannelTransport {
    fn send_byte(&mut self, byte: u8) -> LinkResult<()> {
        self.tx.send(byte).map_err(|_| LinkError::Closed)
    }

    fn receive_byte(&mut self) -> LinkResult<u8> {
        self.rx.recv().map_err(|_| LinkError::Closed)
    }

    fn receive_byte_within(&mut self, timeout: Duration) -> LinkResult<u8> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => LinkError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            },
            RecvTimeoutError::Disconnected => LinkError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_bytes_cross_the_pair() {
        let (mut host, mut peer) = ChannelTransport::pair();
        host.send_byte(0x11).unwrap();
        peer.send_byte(0x22).unwrap();

        assert_eq!(peer.receive_byte().unwrap(), 0x11);
        assert_eq!(host.receive_byte().unwrap(), 0x22);
    }

    #[test]
    fn test_receive_blocks_until_peer_sends() {
        let (mut host, mut peer) = ChannelTransport::pair();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            peer.send_byte(0x7E).unwrap();
        });

        assert_eq!(host.receive_byte().unwrap(), 0x7E);
        handle.join().unwrap();
    }

    #[test]
    fn test_timeout_and_close() {
        let (mut host, peer) = ChannelTransport::pair();
        assert!(matches!(
            host.receive_byte_within(Duration::from_millis(5)),
            Err(LinkError::Timeout { timeout_ms: 5 })
        ));

        drop(peer);
        assert!(matches!(host.receive_byte(), Err(LinkError::Closed)));
        assert!(matches!(host.send_byte(0x00), Err(LinkError::Closed)));
    }
}
