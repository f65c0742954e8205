//! # MIDI OSC Bridge
//!
//! Forwards MIDI note and controller events as OSC messages over UDP and
//! picks up tag announcements from a multicast group.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              HOST                                │
//! │   MIDI events        tags / ip / port          "poll for tags"   │
//! └───────┬───────────────────────┬──────────────────────┬───────────┘
//!         │                       │                      │
//!         ▼                       ▼                      ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     OscBridge (bridge)                           │
//! │  ┌────────────────┐   ┌──────────────┐   ┌────────────────────┐  │
//! │  │   translator   │──▶│  OscSender   │   │ MulticastReceiver  │  │
//! │  │ /midi/message  │   │  (unicast)   │   │   drain_latest()   │  │
//! │  │ + tag fan-out  │   └──────┬───────┘   └─────────▲──────────┘  │
//! │  └────────────────┘          │ encode              │ decode      │
//! │                         ┌────▼─────────────────────┴────┐        │
//! │                         │          codec (OSC)          │        │
//! │                         └───────────────────────────────┘        │
//! └────────────────────────────────┬─────────────────▲───────────────┘
//!                                  │ UDP             │ UDP multicast
//!                                  ▼                 │
//!                        127.0.0.1:8000      239.255.0.1:9000
//! ```
//!
//! Everything is synchronous and non-blocking; no thread owns a socket.

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod translator;

pub use bridge::{BridgeState, OscBridge};
pub use error::{Error, Result};
pub use protocol::{EventKind, MidiEvent, OscMessage, OscValue, TagList};

/// Application-wide constants
pub mod constants {
    use std::net::Ipv4Addr;

    /// Default unicast destination host
    pub const DEFAULT_SEND_HOST: &str = "127.0.0.1";

    /// Default unicast destination port
    pub const DEFAULT_SEND_PORT: u16 = 8000;

    /// Default multicast group for tag announcements
    pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 0, 1);

    /// Default multicast port
    pub const DEFAULT_MULTICAST_PORT: u16 = 9000;

    /// Tag list used until the host sets one
    pub const DEFAULT_TAG: &str = "piano";

    /// Receive buffer per datagram; longer datagrams are truncated
    pub const RECV_BUFFER_SIZE: usize = 1024;

    /// Upper bound on reads per drain
    pub const MAX_DRAIN_READS: usize = 4096;

    /// Largest UDP payload over IPv4; bigger sends are refused up front
    pub const MAX_DATAGRAM_SIZE: usize = 65_507;
}
