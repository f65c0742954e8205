//! Unicast OSC sender
//!
//! One connected, non-blocking UDP socket per destination. Reconfiguring
//! is always a full disconnect then connect.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use crate::codec::OscEncoder;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::error::NetworkError;
use crate::network::udp::{create_sender_socket, resolve};
use crate::protocol::{Endpoint, OscMessage};

/// Anything that can take an outgoing OSC message
pub trait MessageSink {
    fn send_message(&mut self, message: &OscMessage) -> Result<(), NetworkError>;
}

struct Connection {
    socket: UdpSocket,
    endpoint: Endpoint,
    peer: SocketAddr,
}

/// Sends encoded OSC messages to a single destination
pub struct OscSender {
    connection: Option<Connection>,
    encoder: OscEncoder,
    messages_sent: u64,
    bytes_sent: u64,
    send_failures: u64,
}

impl OscSender {
    /// Create a disconnected sender
    pub fn new() -> Self {
        Self {
            connection: None,
            encoder: OscEncoder::new(),
            messages_sent: 0,
            bytes_sent: 0,
            send_failures: 0,
        }
    }

    /// Connect to `endpoint`, tearing down any existing connection first.
    ///
    /// On failure the sender is left disconnected.
    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<(), NetworkError> {
        self.disconnect();

        let peer = resolve(endpoint)?;
        let socket = create_sender_socket(peer)?;

        tracing::info!("Connected to OSC server {} ({})", endpoint, peer);
        self.connection = Some(Connection {
            socket,
            endpoint: endpoint.clone(),
            peer,
        });
        Ok(())
    }

    /// Close the socket. Returns whether a connection was open.
    pub fn disconnect(&mut self) -> bool {
        match self.connection.take() {
            Some(conn) => {
                tracing::debug!("Disconnected from {}", conn.endpoint);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Current destination, if connected
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.connection.as_ref().map(|c| &c.endpoint)
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.connection.as_ref().map(|c| c.peer)
    }

    /// Encode `message` and write it as one datagram.
    ///
    /// A write that would block counts as a failure; nothing is retried.
    pub fn send(&mut self, message: &OscMessage) -> Result<(), NetworkError> {
        let result = self.try_send(message);
        if let Err(e) = &result {
            self.send_failures += 1;
            tracing::warn!("Failed to send OSC message {}: {}", message.address, e);
        }
        result
    }

    fn try_send(&mut self, message: &OscMessage) -> Result<(), NetworkError> {
        let conn = self.connection.as_ref().ok_or(NetworkError::NotConnected)?;

        let packet = self.encoder.encode(message);
        if packet.len() > MAX_DATAGRAM_SIZE {
            return Err(NetworkError::PacketTooLarge(packet.len()));
        }

        let written = conn.socket.send(&packet).map_err(|e| match e.kind() {
            ErrorKind::WouldBlock => NetworkError::SendFailed("socket would block".to_string()),
            _ => NetworkError::SendFailed(e.to_string()),
        })?;

        if written != packet.len() {
            return Err(NetworkError::SendFailed(format!(
                "short write: {} of {} bytes",
                written,
                packet.len()
            )));
        }

        self.messages_sent += 1;
        self.bytes_sent += written as u64;
        tracing::debug!("OSC message sent: {} ({} bytes)", message.address, written);
        Ok(())
    }

    /// Get statistics
    pub fn stats(&self) -> SenderStats {
        SenderStats {
            messages_sent: self.messages_sent,
            bytes_sent: self.bytes_sent,
            send_failures: self.send_failures,
        }
    }
}

impl Default for OscSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSink for OscSender {
    fn send_message(&mut self, message: &OscMessage) -> Result<(), NetworkError> {
        self.send(message)
    }
}

/// Sender statistics
#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_message;
    use std::time::Duration;

    fn local_target() -> (UdpSocket, Endpoint) {
        let target = UdpSocket::bind("127.0.0.1:0").unwrap();
        target
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = target.local_addr().unwrap().port();
        (target, Endpoint::new("127.0.0.1", port))
    }

    #[test]
    fn test_send_without_connect_fails() {
        let mut sender = OscSender::new();
        let err = sender.send(&OscMessage::new("/x")).unwrap_err();
        assert!(matches!(err, NetworkError::NotConnected));
        assert_eq!(sender.stats().send_failures, 1);
    }

    #[test]
    fn test_send_delivers_one_datagram() {
        let (target, endpoint) = local_target();
        let mut sender = OscSender::new();
        sender.connect(&endpoint).unwrap();
        assert_eq!(sender.endpoint(), Some(&endpoint));

        let msg = OscMessage::new("/midi/message").arg("note_off").arg(64).arg(1.5f32);
        sender.send(&msg).unwrap();

        let mut buf = [0u8; 1024];
        let n = target.recv(&mut buf).unwrap();
        assert_eq!(decode_message(&buf[..n]).unwrap(), msg);

        let stats = sender.stats();
        assert_eq!(stats.messages_sent, 1);
        assert_eq!(stats.bytes_sent, n as u64);
    }

    #[test]
    fn test_reconnect_moves_destination() {
        let (first, first_endpoint) = local_target();
        let (second, second_endpoint) = local_target();
        let mut sender = OscSender::new();

        sender.connect(&first_endpoint).unwrap();
        sender.send(&OscMessage::new("/one")).unwrap();

        assert!(sender.disconnect());
        assert!(!sender.is_connected());
        assert!(matches!(
            sender.send(&OscMessage::new("/lost")),
            Err(NetworkError::NotConnected)
        ));

        sender.connect(&second_endpoint).unwrap();
        sender.send(&OscMessage::new("/two")).unwrap();

        let mut buf = [0u8; 64];
        let n = first.recv(&mut buf).unwrap();
        assert_eq!(decode_message(&buf[..n]).unwrap().address, "/one");
        let n = second.recv(&mut buf).unwrap();
        assert_eq!(decode_message(&buf[..n]).unwrap().address, "/two");
    }

    #[test]
    fn test_failed_connect_leaves_disconnected() {
        let (_target, endpoint) = local_target();
        let mut sender = OscSender::new();
        sender.connect(&endpoint).unwrap();

        assert!(sender.connect(&Endpoint::new("not a host name", 8000)).is_err());
        assert!(!sender.is_connected());
    }

    #[test]
    fn test_long_tag_list_fits_one_datagram() {
        let (target, endpoint) = local_target();
        let mut sender = OscSender::new();
        sender.connect(&endpoint).unwrap();

        let mut msg = OscMessage::new("/midi/message").arg("note_on").arg(60).arg(100);
        for i in 0..200 {
            msg.push(format!("tag{i:03}"));
        }
        sender.send(&msg).unwrap();

        let mut buf = vec![0u8; 65_536];
        let n = target.recv(&mut buf).unwrap();
        assert!(n > 1472);
        let decoded = decode_message(&buf[..n]).unwrap();
        assert_eq!(decoded.arguments.len(), 203);
        assert_eq!(decoded.arguments[202].as_str(), Some("tag199"));
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_oversized_message_rejected() {
        let (_target, endpoint) = local_target();
        let mut sender = OscSender::new();
        sender.connect(&endpoint).unwrap();

        let msg = OscMessage::new("/big").arg("x".repeat(MAX_DATAGRAM_SIZE));
        assert!(matches!(sender.send(&msg), Err(NetworkError::PacketTooLarge(_))));
        assert_eq!(sender.stats().messages_sent, 0);
    }
}
