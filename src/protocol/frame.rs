use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

pub const FIN_BIT: u8 = 0x80;

const MASK_KEY_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

/// Close frames are detected on the raw first byte, before any decoding.
pub fn is_close_frame(first_byte: u8) -> bool {
    first_byte & 0x0F == Opcode::Close as u8
}

/// Wraps a payload in a single server frame: FIN set, never masked, with the
/// 7-bit, 16-bit or 64-bit length encoding selected by the payload size.
pub fn encode_frame(payload: &[u8], opcode: Opcode) -> Bytes {
    let mut frame = BytesMut::with_capacity(payload.len() + 10);
    frame.put_u8(opcode as u8 | FIN_BIT);

    if payload.len() < 126 {
        frame.put_u8(payload.len() as u8);
    } else if payload.len() <= 65535 {
        frame.put_u8(126);
        frame.put_u16(payload.len() as u16);
    } else {
        frame.put_u8(127);
        frame.put_u64(payload.len() as u64);
    }

    frame.put_slice(payload);
    frame.freeze()
}

/// Extracts and unmasks the payload of a single client frame.
///
/// The declared total length is validated against the received buffer before
/// the masking key bytes are read, so a short buffer with a large declared
/// length can never be over-read.
pub fn decode_frame(buffer: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if buffer.len() < 2 {
        return Err(ProtocolError::TruncatedHeader);
    }

    let (payload_length, key_start) = match buffer[1] & 0x7F {
        126 => {
            if buffer.len() < 4 {
                return Err(ProtocolError::TruncatedHeader);
            }

            (u16::from_be_bytes([buffer[2], buffer[3]]) as usize, 4)
        }
        127 => {
            if buffer.len() < 10 {
                return Err(ProtocolError::TruncatedHeader);
            }

            let mut length_bytes = [0u8; 8];
            length_bytes.copy_from_slice(&buffer[2..10]);
            (u64::from_be_bytes(length_bytes) as usize, 10)
        }
        length => (length as usize, 2),
    };

    let length_mismatch = ProtocolError::LengthMismatch {
        declared: payload_length,
        available: buffer.len(),
    };

    match payload_length.checked_add(key_start + MASK_KEY_SIZE) {
        Some(total_length) if total_length <= buffer.len() => {}
        _ => return Err(length_mismatch),
    }

    let mut key = [0u8; MASK_KEY_SIZE];
    key.copy_from_slice(&buffer[key_start..key_start + MASK_KEY_SIZE]);

    let payload_start = key_start + MASK_KEY_SIZE;
    let mut payload = buffer[payload_start..payload_start + payload_length].to_vec();
    unmask(&mut payload, key);

    Ok(payload)
}

/// XOR masking is an involution, so the same routine masks and unmasks.
pub fn unmask(payload: &mut [u8], key: [u8; MASK_KEY_SIZE]) {
    for (index, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[index % MASK_KEY_SIZE];
    }
}
