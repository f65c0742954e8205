//! Multicast OSC receiver
//!
//! Pull-based: nothing reads the socket until [`MulticastReceiver::drain_latest`]
//! is called. A drain empties everything pending and decodes only the last
//! datagram, so intermediate messages are dropped. That suits state-snapshot
//! traffic such as tag announcements; callers that need every message in
//! sequence should not use this receiver.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, UdpSocket};

use crate::codec::OscDecoder;
use crate::config::ReceiverConfig;
use crate::constants::{MAX_DRAIN_READS, RECV_BUFFER_SIZE};
use crate::error::NetworkError;
use crate::network::udp::create_multicast_socket;
use crate::protocol::{OscMessage, OscValue};

/// Joined group, left again when the receiver closes
struct Membership {
    group: Ipv4Addr,
    interface: Ipv4Addr,
}

/// Receiver bound to a multicast group
pub struct MulticastReceiver {
    socket: UdpSocket,
    membership: Option<Membership>,
    port: u16,
    /// Last successfully decoded message
    latest: Option<OscMessage>,
    decoder: OscDecoder,
    /// Scratch buffers; the one at `current` holds the newest datagram
    buffers: [[u8; RECV_BUFFER_SIZE]; 2],
    datagrams_received: u64,
    datagrams_discarded: u64,
}

impl MulticastReceiver {
    /// Bind the group port and join the group
    pub fn open(config: &ReceiverConfig) -> Result<Self, NetworkError> {
        let socket = create_multicast_socket(config)?;
        tracing::info!(
            "Successfully joined multicast group on {}:{}",
            config.group,
            config.port
        );

        let mut receiver = Self::from_socket(socket, config.port);
        receiver.membership = Some(Membership {
            group: config.group,
            interface: config.interface,
        });
        Ok(receiver)
    }

    /// Wrap an already bound socket; no group membership is managed.
    pub(crate) fn from_socket(socket: UdpSocket, port: u16) -> Self {
        Self {
            socket,
            membership: None,
            port,
            latest: None,
            decoder: OscDecoder::new(),
            buffers: [[0u8; RECV_BUFFER_SIZE]; 2],
            datagrams_received: 0,
            datagrams_discarded: 0,
        }
    }

    /// Leave the group and close the socket
    pub fn close(mut self) {
        self.leave();
    }

    fn leave(&mut self) {
        if let Some(m) = self.membership.take() {
            match self.socket.leave_multicast_v4(&m.group, &m.interface) {
                Ok(()) => tracing::debug!("Left multicast group {}", m.group),
                Err(e) => tracing::warn!("Failed to leave multicast group {}: {}", m.group, e),
            }
        }
    }

    /// Read every pending datagram without blocking and decode the newest.
    ///
    /// Returns the arguments of the most recently decoded message, which may
    /// come from an earlier drain when nothing new arrived. A newest datagram
    /// that fails to decode is logged and leaves the previous message in place.
    pub fn drain_latest(&mut self) -> Vec<OscValue> {
        let mut current = 0;
        let mut latest_len = None;
        let mut reads = 0;

        for _ in 0..MAX_DRAIN_READS {
            let next = match latest_len {
                Some(_) => 1 - current,
                None => current,
            };

            match self.socket.recv(&mut self.buffers[next]) {
                Ok(0) => break,
                Ok(n) => {
                    current = next;
                    latest_len = Some(n);
                    reads += 1;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Multicast read failed: {}", e);
                    break;
                }
            }
        }

        if let Some(len) = latest_len {
            self.datagrams_received += reads;
            self.datagrams_discarded += reads - 1;
            tracing::debug!(
                "Received latest data from multicast group: {} bytes ({} older discarded)",
                len,
                reads - 1
            );

            match self.decoder.decode(&self.buffers[current][..len]) {
                Ok(message) => {
                    tracing::debug!("Parsed OSC address: {}", message.address);
                    self.latest = Some(message);
                }
                Err(e) => tracing::warn!("Dropping malformed multicast datagram: {}", e),
            }
        }

        self.latest_arguments()
    }

    /// Arguments of the last decoded message without touching the socket
    pub fn latest_arguments(&self) -> Vec<OscValue> {
        self.latest
            .as_ref()
            .map(|m| m.arguments.clone())
            .unwrap_or_default()
    }

    pub fn latest_address(&self) -> Option<&str> {
        self.latest.as_ref().map(|m| m.address.as_str())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn group(&self) -> Option<Ipv4Addr> {
        self.membership.as_ref().map(|m| m.group)
    }

    /// Get statistics
    pub fn stats(&self) -> ReceiverStats {
        let decoder = self.decoder.stats();
        ReceiverStats {
            datagrams_received: self.datagrams_received,
            datagrams_discarded: self.datagrams_discarded,
            messages_decoded: decoder.messages_decoded,
            decode_failures: decoder.decode_failures,
        }
    }
}

impl Drop for MulticastReceiver {
    fn drop(&mut self) {
        self.leave();
    }
}

/// Receiver statistics
#[derive(Debug, Clone, Default)]
pub struct ReceiverStats {
    pub datagrams_received: u64,
    pub datagrams_discarded: u64,
    pub messages_decoded: u64,
    pub decode_failures: u64,
}
