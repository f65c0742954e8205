//! OSC message encoder
//!
//! Writes the address pattern, the type tag string and each argument in
//! order. Strings are null terminated and zero padded to a 4-byte boundary;
//! numbers are 4-byte big-endian.

use bytes::{BufMut, Bytes, BytesMut};

use super::padding;
use crate::protocol::{OscMessage, OscValue};

/// OSC encoder that reuses its output buffer between messages
pub struct OscEncoder {
    /// Encoding buffer (reused to avoid allocations)
    buffer: BytesMut,
    /// Messages encoded
    messages_encoded: u64,
    /// Total bytes produced
    bytes_produced: u64,
}

impl OscEncoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
            messages_encoded: 0,
            bytes_produced: 0,
        }
    }

    /// Encode a message into a single datagram payload.
    ///
    /// Encoding never fails. An empty address is written as-is and is
    /// refused by [`decode_message`](super::decode_message) on receive.
    pub fn encode(&mut self, message: &OscMessage) -> Bytes {
        self.buffer.clear();
        self.buffer.reserve(encoded_len(message));

        put_string(&mut self.buffer, &message.address);
        put_string(&mut self.buffer, &message.type_tags());

        for arg in &message.arguments {
            match arg {
                OscValue::Int(v) => self.buffer.put_i32(*v),
                OscValue::Float(v) => self.buffer.put_f32(*v),
                OscValue::String(s) => put_string(&mut self.buffer, s),
            }
        }

        self.messages_encoded += 1;
        self.bytes_produced += self.buffer.len() as u64;

        self.buffer.split().freeze()
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            messages_encoded: self.messages_encoded,
            bytes_produced: self.bytes_produced,
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.messages_encoded = 0;
        self.bytes_produced = 0;
    }
}

impl Default for OscEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encoder statistics
#[derive(Debug, Clone, Default)]
pub struct EncoderStats {
    pub messages_encoded: u64,
    pub bytes_produced: u64,
}

/// Exact size of the encoded form of `message`
pub fn encoded_len(message: &OscMessage) -> usize {
    let string_len = |s: &str| {
        let len = wire_bytes(s).len();
        len + 1 + padding(len)
    };

    let args: usize = message
        .arguments
        .iter()
        .map(|arg| match arg {
            OscValue::Int(_) | OscValue::Float(_) => 4,
            OscValue::String(s) => string_len(s),
        })
        .sum();

    string_len(&message.address) + string_len(&message.type_tags()) + args
}

/// Write a null-terminated string padded to a multiple of 4 bytes.
fn put_string(buf: &mut BytesMut, s: &str) {
    let bytes = wire_bytes(s);
    buf.put_slice(bytes);
    buf.put_u8(0);
    buf.put_bytes(0, padding(bytes.len()));
}

/// String content as written on the wire; an embedded NUL ends the string.
fn wire_bytes(s: &str) -> &[u8] {
    let bytes = s.as_bytes();
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_padding() {
        let mut encoder = OscEncoder::new();

        // "/abc" + NUL = 5 bytes -> padded to 8, "," + NUL -> 4
        let encoded = encoder.encode(&OscMessage::new("/abc"));
        assert_eq!(&encoded[..], b"/abc\0\0\0\0,\0\0\0");

        // "/ab" + NUL = 4 bytes, no extra padding
        let encoded = encoder.encode(&OscMessage::new("/ab"));
        assert_eq!(&encoded[..], b"/ab\0,\0\0\0");
    }

    #[test]
    fn test_argument_layout() {
        let mut encoder = OscEncoder::new();
        let msg = OscMessage::new("/x").arg(1).arg(1.0f32).arg("hi");
        let encoded = encoder.encode(&msg);

        let expected: &[u8] = &[
            b'/', b'x', 0, 0, // address
            b',', b'i', b'f', b's', 0, 0, 0, 0, // type tags
            0, 0, 0, 1, // int 1
            0x3F, 0x80, 0, 0, // float 1.0
            b'h', b'i', 0, 0, // "hi"
        ];
        assert_eq!(&encoded[..], expected);
        assert_eq!(encoded.len(), encoded_len(&msg));
    }

    #[test]
    fn test_negative_int_is_twos_complement() {
        let mut encoder = OscEncoder::new();
        let encoded = encoder.encode(&OscMessage::new("/n").arg(-2));
        assert_eq!(&encoded[encoded.len() - 4..], &[0xFF, 0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn test_embedded_nul_truncates_string() {
        let mut encoder = OscEncoder::new();
        let encoded = encoder.encode(&OscMessage::new("/t").arg("ab\0cd"));
        assert_eq!(&encoded[8..], b"ab\0\0");
    }

    #[test]
    fn test_stats() {
        let mut encoder = OscEncoder::new();
        encoder.encode(&OscMessage::new("/a"));
        encoder.encode(&OscMessage::new("/b").arg(3));

        let stats = encoder.stats();
        assert_eq!(stats.messages_encoded, 2);
        assert_eq!(stats.bytes_produced, 8 + 12);

        encoder.reset_stats();
        assert_eq!(encoder.stats().messages_encoded, 0);
    }
}
