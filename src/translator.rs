//! MIDI event to OSC translation
//!
//! Every forwarded event becomes one `/midi/message` carrying the event
//! fields followed by every routing tag as trailing string arguments.

use std::time::Instant;

use crate::error::NetworkError;
use crate::network::MessageSink;
use crate::protocol::{EventKind, MidiEvent, OscMessage, TagList, MIDI_MESSAGE_ADDRESS, NULL_ADDRESS};

/// Monotonic millisecond counter with sub-millisecond resolution
#[derive(Debug, Clone, Copy)]
pub struct HiResClock {
    origin: Instant,
}

impl HiResClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the clock was created
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Stamp an event with the current time
    pub fn stamp(&self, event: MidiEvent) -> MidiEvent {
        event.at(self.now_ms())
    }
}

impl Default for HiResClock {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Sent,
    /// Tag list was empty, nothing was sent
    Skipped,
}

/// Build the message for an event, without tags.
///
/// Unsupported event kinds map to `/null` with no arguments.
pub fn translate(event: &MidiEvent) -> OscMessage {
    // Precision loss on large counters is accepted
    let timestamp = event.timestamp_ms as f32;
    let number = i32::from(event.number);
    let value = i32::from(event.value);

    match event.kind {
        EventKind::NoteOn => OscMessage::new(MIDI_MESSAGE_ADDRESS)
            .arg("note_on")
            .arg(number)
            .arg(value)
            .arg(timestamp),
        EventKind::NoteOff => OscMessage::new(MIDI_MESSAGE_ADDRESS)
            .arg("note_off")
            .arg(number)
            .arg(timestamp),
        EventKind::ControlChange => OscMessage::new(MIDI_MESSAGE_ADDRESS)
            .arg("controller")
            .arg(number)
            .arg(value)
            .arg(timestamp),
        EventKind::Other(_) => OscMessage::new(NULL_ADDRESS),
    }
}

/// Build the outgoing message with every tag appended, or `None` when there
/// are no tags to route to.
pub fn build_message(event: &MidiEvent, tags: &TagList) -> Option<OscMessage> {
    if tags.is_empty() {
        return None;
    }

    let mut message = translate(event);
    for tag in tags.iter() {
        message.push(tag);
    }
    Some(message)
}

/// Translate `event` and hand it to `sink`.
///
/// Empty tag lists skip the send entirely. Send failures are returned to
/// the caller and not retried.
pub fn dispatch<S: MessageSink + ?Sized>(
    event: &MidiEvent,
    tags: &TagList,
    sink: &mut S,
) -> Result<Dispatch, NetworkError> {
    match build_message(event, tags) {
        Some(message) => {
            sink.send_message(&message)?;
            Ok(Dispatch::Sent)
        }
        None => {
            tracing::debug!("Skipping OSC send: no tags configured to target an instrument");
            Ok(Dispatch::Skipped)
        }
    }
}
