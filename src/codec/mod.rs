//! OSC codec
//!
//! Pure encoding and decoding of single OSC messages. No bundles, no
//! timetags; arguments are limited to int32, float32 and string.

pub mod decoder;
pub mod encoder;

pub use decoder::{decode_message, DecoderStats, OscDecoder};
pub use encoder::{encoded_len, EncoderStats, OscEncoder};

use bytes::Bytes;

use crate::protocol::OscMessage;

/// Zero bytes following a string of `len` bytes and its terminator so the
/// next field starts on a 4-byte boundary.
pub(crate) fn padding(len: usize) -> usize {
    (4 - (len + 1) % 4) % 4
}

/// Encode a message with a throwaway encoder
pub fn encode_message(message: &OscMessage) -> Bytes {
    OscEncoder::new().encode(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OscValue;
    use proptest::prelude::*;

    fn arb_string() -> impl Strategy<Value = String> {
        "[^\\x00]{0,24}"
    }

    fn arb_value() -> impl Strategy<Value = OscValue> {
        prop_oneof![
            any::<i32>().prop_map(OscValue::Int),
            any::<f32>()
                .prop_filter("NaN never compares equal", |f| !f.is_nan())
                .prop_map(OscValue::Float),
            arb_string().prop_map(OscValue::String),
        ]
    }

    fn arb_message() -> impl Strategy<Value = OscMessage> {
        (
            "/[a-z_/]{0,20}",
            prop::collection::vec(arb_value(), 0..12),
        )
            .prop_map(|(address, arguments)| OscMessage { address, arguments })
    }

    /// Offset just past the null-terminated, padded string at `start`
    fn string_end(buf: &[u8], start: usize) -> usize {
        let len = buf[start..].iter().position(|&b| b == 0).unwrap();
        start + len + 1 + padding(len)
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(0), 3);
        assert_eq!(padding(1), 2);
        assert_eq!(padding(2), 1);
        assert_eq!(padding(3), 0);
        assert_eq!(padding(4), 3);
    }

    proptest! {
        #[test]
        fn roundtrip(msg in arb_message()) {
            let encoded = encode_message(&msg);
            let decoded = decode_message(&encoded).unwrap();
            prop_assert_eq!(decoded, msg);
        }

        #[test]
        fn sections_are_aligned(msg in arb_message()) {
            let encoded = encode_message(&msg);
            prop_assert_eq!(encoded.len() % 4, 0);

            let after_address = string_end(&encoded, 0);
            prop_assert_eq!(after_address % 4, 0);

            let after_tags = string_end(&encoded, after_address);
            prop_assert_eq!(after_tags % 4, 0);
            prop_assert_eq!(encoded.len(), encoded_len(&msg));
        }

        #[test]
        fn garbage_never_panics(data in prop::collection::vec(any::<u8>(), 0..128)) {
            let _ = decode_message(&data);
        }

        #[test]
        fn bad_type_tag_is_rejected(address in "/[a-z]{0,10}", first in any::<u8>()) {
            prop_assume!(first != b',');
            let mut data = encode_message(&OscMessage::new(address)).to_vec();
            let tag_start = string_end(&data, 0);
            data[tag_start] = first;
            prop_assert_eq!(decode_message(&data), Err(crate::error::DecodeError::InvalidTypeTag));
        }
    }
}
