//! Error types for the MIDI to OSC bridge

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inbound OSC datagram could not be decoded.
///
/// A failed decode never replaces the last good message held by the receiver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Stream truncated at offset {0}")]
    TruncatedStream(usize),

    #[error("Type tag string does not start with ','")]
    InvalidTypeTag,

    #[error("Empty address pattern")]
    EmptyAddress,

    #[error("Unsupported type tag '{0}'")]
    UnknownTypeTag(char),

    #[error("String at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Multicast join failed: {0}")]
    JoinFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Could not resolve {0}")]
    AddressResolution(String),

    #[error("Sender is not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_converts() {
        let err: Error = DecodeError::InvalidTypeTag.into();
        assert!(matches!(err, Error::Decode(DecodeError::InvalidTypeTag)));
        assert!(err.to_string().contains("','"));
    }

    #[test]
    fn test_network_error_message() {
        let err = NetworkError::PacketTooLarge(2048);
        assert_eq!(err.to_string(), "Packet too large: 2048 bytes");
    }
}
