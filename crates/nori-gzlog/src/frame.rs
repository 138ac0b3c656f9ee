//! On-disk frame format.
//!
//! Frame format:
//! - len: u32 (big-endian), length of the compressed payload
//! - sep: u8 (0x00)
//! - payload: bytes[len]
//! - len: u32 (big-endian), repeated so the file can be walked backwards
//! - sep: u8 (0x00)

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Separator byte following each length field.
pub const SEPARATOR: u8 = 0x00;

/// Size of the leading `len | sep` header.
pub const HEADER_LEN: usize = 5;

/// Size of the trailing `len | sep` copy.
pub const TRAILER_LEN: usize = 5;

/// Total bytes a frame adds on top of its payload.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + TRAILER_LEN;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Compressed payload of {0} bytes does not fit in a u32 length field")]
    PayloadTooLarge(usize),
    #[error("Corrupt frame at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
    #[error("Incomplete frame")]
    Incomplete,
}

/// Checks that a payload length fits the fixed-width length field.
pub fn payload_len(len: usize) -> Result<u32, FrameError> {
    u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge(len))
}

/// Encodes a compressed payload into a complete frame.
pub fn encode(payload: &[u8]) -> Result<Bytes, FrameError> {
    let len = payload_len(payload.len())?;

    let mut buf = BytesMut::with_capacity(payload.len() + FRAME_OVERHEAD);
    buf.put_u32(len);
    buf.put_u8(SEPARATOR);
    buf.put_slice(payload);
    buf.put_u32(len);
    buf.put_u8(SEPARATOR);

    Ok(buf.freeze())
}

/// Parses a 5-byte `len | sep` field found at `offset`.
pub fn decode_len(field: &[u8; 5], offset: u64) -> Result<u32, FrameError> {
    let mut cursor = &field[..];
    let len = cursor.get_u32();
    let sep = cursor.get_u8();

    if sep != SEPARATOR {
        return Err(FrameError::Corrupt {
            offset,
            reason: format!("expected separator 0x00, found {sep:#04x}"),
        });
    }

    Ok(len)
}

/// Decodes one frame from the start of `data`.
///
/// Returns the payload slice and the number of bytes consumed. Both length
/// copies must agree.
pub fn decode(data: &[u8], offset: u64) -> Result<(&[u8], usize), FrameError> {
    if data.len() < HEADER_LEN {
        return Err(FrameError::Incomplete);
    }

    let head: &[u8; 5] = data[..HEADER_LEN]
        .try_into()
        .map_err(|_| FrameError::Incomplete)?;
    let len = decode_len(head, offset)? as usize;

    let total = len + FRAME_OVERHEAD;
    if data.len() < total {
        return Err(FrameError::Incomplete);
    }

    let trailer_at = HEADER_LEN + len;
    let tail: &[u8; 5] = data[trailer_at..total]
        .try_into()
        .map_err(|_| FrameError::Incomplete)?;
    let tail_len = decode_len(tail, offset + trailer_at as u64)? as usize;

    if tail_len != len {
        return Err(FrameError::Corrupt {
            offset,
            reason: format!("header length {len} does not match trailer length {tail_len}"),
        });
    }

    Ok((&data[HEADER_LEN..trailer_at], total))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_frame_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
            let frame = encode(&payload).unwrap();
            let (decoded, size) = decode(&frame, 0).unwrap();

            prop_assert_eq!(decoded, &payload[..]);
            prop_assert_eq!(size, payload.len() + FRAME_OVERHEAD);
            prop_assert_eq!(&frame[..4], &frame[size - 5..size - 1]);
        }

        #[test]
        fn prop_concatenated_frames_split_cleanly(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..16),
        ) {
            let mut buf = Vec::new();
            for p in &payloads {
                buf.extend_from_slice(&encode(p).unwrap());
            }

            let mut offset = 0usize;
            for p in &payloads {
                let (decoded, size) = decode(&buf[offset..], offset as u64).unwrap();
                prop_assert_eq!(decoded, &p[..]);
                offset += size;
            }
            prop_assert_eq!(offset, buf.len());
        }
    }
}
