//! Host-facing bridge
//!
//! Owns the session settings, the unicast sender and the multicast
//! receiver. The host calls in from whatever threads it likes: settings sit
//! behind a read/write lock and the sender behind a mutex, so a reconnect is
//! never observed half-done by a concurrent send.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::config::{BridgeConfig, ReceiverConfig};
use crate::error::NetworkError;
use crate::network::{MulticastReceiver, OscSender, ReceiverStats, SenderStats};
use crate::protocol::{Endpoint, MidiEvent, OscValue, TagList};
use crate::translator::{self, Dispatch, HiResClock};

/// Values the host persists between sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    pub ip_address: String,
    pub port: u16,
    /// Newline-delimited tag list
    pub tags: String,
}

/// Mutable session settings
#[derive(Debug, Clone)]
struct Session {
    endpoint: Endpoint,
    tags: TagList,
}

/// Outcome counts for one processed block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Events of kinds that are never forwarded
    pub ignored: usize,
}

/// Combined statistics
#[derive(Debug, Clone)]
pub struct BridgeStats {
    pub sender: SenderStats,
    pub receiver: Option<ReceiverStats>,
}

pub struct OscBridge {
    session: RwLock<Session>,
    sender: Mutex<OscSender>,
    /// `None` when the group could not be joined; polls then return nothing
    receiver: Mutex<Option<MulticastReceiver>>,
    clock: HiResClock,
}

impl OscBridge {
    /// Connect the sender and join the multicast group.
    ///
    /// Either step may fail; the failure is logged and the bridge stays
    /// usable (sends fail until a successful reconnect, polls return nothing).
    pub fn new(config: &BridgeConfig) -> Self {
        let receiver = open_receiver(&config.receiver);
        let bridge = Self::from_parts(config.sender.endpoint(), config.tag_list(), receiver);

        // reconnect logs its own failure
        let _ = bridge.reconnect();
        bridge
    }

    pub(crate) fn from_parts(
        endpoint: Endpoint,
        tags: TagList,
        receiver: Option<MulticastReceiver>,
    ) -> Self {
        Self {
            session: RwLock::new(Session { endpoint, tags }),
            sender: Mutex::new(OscSender::new()),
            receiver: Mutex::new(receiver),
            clock: HiResClock::new(),
        }
    }

    /// Stamp `event` with the current time, translate and send it
    pub fn handle_event(&self, event: MidiEvent) -> Result<Dispatch, NetworkError> {
        let event = self.clock.stamp(event);
        let session = self.session.read();
        let mut sender = self.sender.lock();
        translator::dispatch(&event, &session.tags, &mut *sender)
    }

    /// Forward the note and controller events of one block, in order
    pub fn process_block(&self, events: &[MidiEvent]) -> BlockReport {
        let mut report = BlockReport::default();

        for event in events {
            if !event.is_forwarded() {
                report.ignored += 1;
                continue;
            }
            match self.handle_event(*event) {
                Ok(Dispatch::Sent) => report.sent += 1,
                Ok(Dispatch::Skipped) => report.skipped += 1,
                Err(_) => report.failed += 1,
            }
        }
        report
    }

    /// Replace the tag list
    pub fn set_tags(&self, tags: TagList) {
        tracing::debug!("Tags set to: {:?}", tags.as_slice());
        self.session.write().tags = tags;
    }

    /// Replace the tag list from newline-delimited text
    pub fn set_tags_text(&self, text: &str) {
        self.set_tags(TagList::from_lines(text));
    }

    pub fn tags(&self) -> TagList {
        self.session.read().tags.clone()
    }

    pub fn tags_text(&self) -> String {
        self.session.read().tags.to_lines()
    }

    /// Drain the multicast socket and return the newest message's arguments
    pub fn poll_tags(&self) -> Vec<OscValue> {
        match self.receiver.lock().as_mut() {
            Some(receiver) => receiver.drain_latest(),
            None => Vec::new(),
        }
    }

    pub fn ip_address(&self) -> String {
        self.session.read().endpoint.host.clone()
    }

    /// Takes effect on the next [`reconnect`](Self::reconnect)
    pub fn set_ip_address(&self, host: &str) {
        self.session.write().endpoint.host = host.to_string();
    }

    pub fn port(&self) -> u16 {
        self.session.read().endpoint.port
    }

    /// Takes effect on the next [`reconnect`](Self::reconnect)
    pub fn set_port(&self, port: u16) {
        self.session.write().endpoint.port = port;
    }

    pub fn endpoint(&self) -> Endpoint {
        self.session.read().endpoint.clone()
    }

    /// Disconnect, then connect to the configured endpoint
    pub fn reconnect(&self) -> Result<(), NetworkError> {
        let endpoint = self.endpoint();
        let mut sender = self.sender.lock();
        sender.disconnect();
        sender.connect(&endpoint).map_err(|e| {
            tracing::warn!("Failed to connect to OSC server {}: {}", endpoint, e);
            e
        })
    }

    pub fn is_connected(&self) -> bool {
        self.sender.lock().is_connected()
    }

    pub fn is_receiving(&self) -> bool {
        self.receiver.lock().is_some()
    }

    /// Snapshot for persistence
    pub fn state(&self) -> BridgeState {
        let session = self.session.read();
        BridgeState {
            ip_address: session.endpoint.host.clone(),
            port: session.endpoint.port,
            tags: session.tags.to_lines(),
        }
    }

    /// Restore persisted values. The connection is left as is until the
    /// next reconnect.
    pub fn restore_state(&self, state: &BridgeState) {
        let mut session = self.session.write();
        session.endpoint = Endpoint::new(state.ip_address.clone(), state.port);
        session.tags = TagList::from_lines(&state.tags);
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            sender: self.sender.lock().stats(),
            receiver: self.receiver.lock().as_ref().map(MulticastReceiver::stats),
        }
    }
}

fn open_receiver(config: &ReceiverConfig) -> Option<MulticastReceiver> {
    match MulticastReceiver::open(config) {
        Ok(receiver) => Some(receiver),
        Err(e) => {
            tracing::warn!(
                "Multicast receiver unavailable on {}:{}: {}",
                config.group,
                config.port,
                e
            );
            None
        }
    }
}
