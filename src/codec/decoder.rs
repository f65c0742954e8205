//! OSC message decoder
//!
//! Reads an address pattern, a type tag string and the arguments it
//! declares. Malformed input is reported as a [`DecodeError`]; nothing here
//! panics on truncated or garbage datagrams.

use super::padding;
use crate::error::DecodeError;
use crate::protocol::{OscMessage, OscValue};

/// OSC decoder with statistics
pub struct OscDecoder {
    /// Messages decoded
    messages_decoded: u64,
    /// Datagrams rejected
    decode_failures: u64,
    /// Total bytes consumed by successful decodes
    bytes_consumed: u64,
}

impl OscDecoder {
    pub fn new() -> Self {
        Self {
            messages_decoded: 0,
            decode_failures: 0,
            bytes_consumed: 0,
        }
    }

    /// Decode a single datagram
    pub fn decode(&mut self, data: &[u8]) -> Result<OscMessage, DecodeError> {
        match decode_message(data) {
            Ok(message) => {
                self.messages_decoded += 1;
                self.bytes_consumed += data.len() as u64;
                Ok(message)
            }
            Err(e) => {
                self.decode_failures += 1;
                Err(e)
            }
        }
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            messages_decoded: self.messages_decoded,
            decode_failures: self.decode_failures,
            bytes_consumed: self.bytes_consumed,
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.messages_decoded = 0;
        self.decode_failures = 0;
        self.bytes_consumed = 0;
    }
}

impl Default for OscDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder statistics
#[derive(Debug, Clone, Default)]
pub struct DecoderStats {
    pub messages_decoded: u64,
    pub decode_failures: u64,
    pub bytes_consumed: u64,
}

/// Decode a datagram into an [`OscMessage`].
///
/// Type tags other than `i`, `f` and `s` fail the whole message with
/// [`DecodeError::UnknownTypeTag`]: their width is unknown, so any argument
/// after them could not be read reliably. An empty address pattern is
/// rejected with [`DecodeError::EmptyAddress`].
pub fn decode_message(data: &[u8]) -> Result<OscMessage, DecodeError> {
    let mut reader = Reader::new(data);

    let address = reader.read_string()?;
    if address.is_empty() {
        return Err(DecodeError::EmptyAddress);
    }

    // Checked as raw bytes so a non-ASCII lead byte is still a bad tag string
    let tags = match reader.read_bytes()? {
        [b',', tags @ ..] => tags,
        _ => return Err(DecodeError::InvalidTypeTag),
    };

    let mut arguments = Vec::with_capacity(tags.len());
    for &tag in tags {
        let value = match tag {
            b's' => OscValue::String(reader.read_string()?),
            b'f' => OscValue::Float(f32::from_bits(reader.read_u32()?)),
            b'i' => OscValue::Int(reader.read_u32()? as i32),
            other => return Err(DecodeError::UnknownTypeTag(char::from(other))),
        };
        arguments.push(value);
    }

    Ok(OscMessage { address, arguments })
}

/// Bounds-checked cursor over a datagram
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read the bytes of a null-terminated field and skip its alignment
    /// padding.
    ///
    /// Padding missing at the very end of the datagram is tolerated.
    fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let data = self.data;
        let start = self.pos;
        let rest = data.get(start..).unwrap_or_default();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::TruncatedStream(data.len()))?;

        self.pos = (start + len + 1 + padding(len)).min(data.len());
        Ok(&rest[..len])
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8(start))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes: [u8; 4] = self
            .data
            .get(self.pos..self.pos + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or(DecodeError::TruncatedStream(self.pos))?;
        self.pos += 4;
        Ok(u32::from_be_bytes(bytes))
    }
}
