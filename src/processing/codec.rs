//! Frame codec
//!
//! Wire layout:
//!
//! ```text
//! [0x7E][version][kind][length][payload: length bytes][feedback][0x7F]
//! ```

use crate::core::{CommandFrame, END_BYTE, MAX_PAYLOAD_LEN, START_BYTE};
use crate::hardware::TransportAdapter;
use crate::processing::decoder::{FrameDecoder, TerminatorPolicy};
use crate::processing::error::{ProtocolError, ProtocolResult};
use std::time::Duration;

/// Encode a frame into a fresh buffer
pub fn encode(frame: &CommandFrame) -> ProtocolResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(frame.encoded_len());
    encode_into(frame, &mut buf)?;
    Ok(buf)
}

/// Append the encoded frame to `buf`
pub fn encode_into(frame: &CommandFrame, buf: &mut Vec<u8>) -> ProtocolResult<()> {
    let payload = frame.payload();
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            length: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    buf.reserve(frame.encoded_len());
    buf.push(START_BYTE);
    buf.push(frame.version());
    buf.push(frame.kind().code());
    buf.push(frame.payload_len());
    buf.extend_from_slice(payload);
    buf.push(u8::from(frame.feedback_requested()));
    buf.push(END_BYTE);
    Ok(())
}

/// Read one frame from the link, blocking until it is complete
pub fn decode<T: TransportAdapter + ?Sized>(
    source: &mut T,
    policy: TerminatorPolicy,
) -> ProtocolResult<CommandFrame> {
    let mut decoder = FrameDecoder::with_policy(policy);
    decode_with(source, &mut decoder, None)
}

/// Read one frame through an existing decoder
///
/// With `byte_timeout` set, each individual byte wait is bounded and an
/// idle link surfaces as `LinkTimeout`.
pub fn decode_with<T: TransportAdapter + ?Sized>(
    source: &mut T,
    decoder: &mut FrameDecoder,
    byte_timeout: Option<Duration>,
) -> ProtocolResult<CommandFrame> {
    loop {
        let byte = match byte_timeout {
            Some(timeout) => source.receive_byte_within(timeout),
            None => source.receive_byte(),
        };

        let byte = match byte {
            Ok(byte) => byte,
            Err(e) => {
                decoder.reset();
                return Err(e.into());
            }
        };

        if let Some(frame) = decoder.push(byte)? {
            return Ok(frame);
        }
    }
}

/// Decode the first frame in a byte slice
///
/// Returns the frame and the number of bytes consumed, or `None` when the
/// slice ends before a frame is complete.
pub fn decode_slice(
    bytes: &[u8],
    policy: TerminatorPolicy,
) -> ProtocolResult<Option<(CommandFrame, usize)>> {
    let mut decoder = FrameDecoder::with_policy(policy);
    for (index, &byte) in bytes.iter().enumerate() {
        if let Some(frame) = decoder.push(byte)? {
            return Ok(Some((frame, index + 1)));
        }
    }
    Ok(None)
}
