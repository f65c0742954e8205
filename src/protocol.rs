//! Protocol data model
//!
//! OSC values and messages as they travel on the wire, the MIDI-like
//! events handed over by the host, and the tag list used for routing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address used for every translated MIDI event
pub const MIDI_MESSAGE_ADDRESS: &str = "/midi/message";

/// Address used for events the translator does not understand
pub const NULL_ADDRESS: &str = "/null";

/// A single OSC argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OscValue {
    Int(i32),
    Float(f32),
    String(String),
}

impl OscValue {
    /// Type tag character written into the type tag string
    pub fn type_tag(&self) -> char {
        match self {
            OscValue::Int(_) => 'i',
            OscValue::Float(_) => 'f',
            OscValue::String(_) => 's',
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            OscValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            OscValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OscValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OscValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscValue::Int(v) => write!(f, "{}", v),
            OscValue::Float(v) => write!(f, "{}", v),
            OscValue::String(s) => f.write_str(s),
        }
    }
}

impl From<i32> for OscValue {
    fn from(v: i32) -> Self {
        OscValue::Int(v)
    }
}

impl From<f32> for OscValue {
    fn from(v: f32) -> Self {
        OscValue::Float(v)
    }
}

impl From<&str> for OscValue {
    fn from(s: &str) -> Self {
        OscValue::String(s.to_string())
    }
}

impl From<String> for OscValue {
    fn from(s: String) -> Self {
        OscValue::String(s)
    }
}

/// An OSC message: address pattern plus positional arguments
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OscMessage {
    pub address: String,
    pub arguments: Vec<OscValue>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_args(address: impl Into<String>, arguments: Vec<OscValue>) -> Self {
        Self {
            address: address.into(),
            arguments,
        }
    }

    /// Append an argument, builder style
    pub fn arg(mut self, value: impl Into<OscValue>) -> Self {
        self.arguments.push(value.into());
        self
    }

    pub fn push(&mut self, value: impl Into<OscValue>) {
        self.arguments.push(value.into());
    }

    /// Type tag string derived from the arguments, e.g. `,sif`
    pub fn type_tags(&self) -> String {
        let mut tags = String::with_capacity(self.arguments.len() + 1);
        tags.push(',');
        tags.extend(self.arguments.iter().map(OscValue::type_tag));
        tags
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}

/// Kind of MIDI-like event supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn,
    NoteOff,
    ControlChange,
    /// Any other status byte
    Other(u8),
}

/// MIDI-like event with the time it was observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    pub kind: EventKind,
    pub channel: u8,
    /// Note number or controller number
    pub number: u8,
    /// Velocity or controller value
    pub value: u8,
    /// Millisecond counter captured when the event was stamped
    pub timestamp_ms: f64,
}

impl MidiEvent {
    pub fn note_on(note: u8, velocity: u8) -> Self {
        Self::new(EventKind::NoteOn, note, velocity)
    }

    pub fn note_off(note: u8) -> Self {
        Self::new(EventKind::NoteOff, note, 0)
    }

    pub fn control_change(controller: u8, value: u8) -> Self {
        Self::new(EventKind::ControlChange, controller, value)
    }

    pub fn other(status: u8) -> Self {
        Self::new(EventKind::Other(status), 0, 0)
    }

    fn new(kind: EventKind, number: u8, value: u8) -> Self {
        Self {
            kind,
            channel: 0,
            number,
            value,
            timestamp_ms: 0.0,
        }
    }

    /// Set the timestamp, builder style
    pub fn at(mut self, timestamp_ms: f64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Classify a raw MIDI message.
    ///
    /// Note-on with velocity 0 is a note-off. Returns `None` for an empty
    /// slice or a channel message missing its data bytes.
    pub fn from_bytes(bytes: &[u8], timestamp_ms: f64) -> Option<Self> {
        let status = *bytes.first()?;
        let channel = status & 0x0F;
        let data = |i: usize| bytes.get(i).map(|b| b & 0x7F);

        let (kind, number, value) = match status & 0xF0 {
            0x90 => {
                let (note, velocity) = (data(1)?, data(2)?);
                if velocity == 0 {
                    (EventKind::NoteOff, note, 0)
                } else {
                    (EventKind::NoteOn, note, velocity)
                }
            }
            0x80 => (EventKind::NoteOff, data(1)?, data(2)?),
            0xB0 => (EventKind::ControlChange, data(1)?, data(2)?),
            _ => {
                return Some(Self {
                    kind: EventKind::Other(status),
                    channel: if status < 0xF0 { channel } else { 0 },
                    number: data(1).unwrap_or(0),
                    value: data(2).unwrap_or(0),
                    timestamp_ms,
                })
            }
        };

        Some(Self {
            kind,
            channel,
            number,
            value,
            timestamp_ms,
        })
    }

    /// Whether the block processor forwards this event
    pub fn is_forwarded(&self) -> bool {
        !matches!(self.kind, EventKind::Other(_))
    }
}

/// Ordered list of routing tags, replaced wholesale
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new(tags: Vec<String>) -> Self {
        Self(tags)
    }

    /// Parse newline-delimited tag text. Blank lines are dropped and each
    /// tag is trimmed.
    pub fn from_lines(text: &str) -> Self {
        Self(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Newline-joined form used for persistence
    pub fn to_lines(&self) -> String {
        self.0.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for TagList {
    fn from(tags: Vec<String>) -> Self {
        Self(tags)
    }
}

impl From<&[&str]> for TagList {
    fn from(tags: &[&str]) -> Self {
        Self(tags.iter().map(|s| s.to_string()).collect())
    }
}

/// Unicast destination for outgoing messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        let msg = OscMessage::new("/midi/message")
            .arg("note_on")
            .arg(60)
            .arg(100)
            .arg(12.5f32);
        assert_eq!(msg.type_tags(), ",siif");
        assert_eq!(OscMessage::new("/null").type_tags(), ",");
    }

    #[test]
    fn test_from_bytes_note_on() {
        let event = MidiEvent::from_bytes(&[0x93, 60, 100], 5.0).unwrap();
        assert_eq!(event.kind, EventKind::NoteOn);
        assert_eq!(event.channel, 3);
        assert_eq!(event.number, 60);
        assert_eq!(event.value, 100);
        assert_eq!(event.timestamp_ms, 5.0);
    }

    #[test]
    fn test_from_bytes_zero_velocity_is_note_off() {
        let event = MidiEvent::from_bytes(&[0x90, 64, 0], 0.0).unwrap();
        assert_eq!(event.kind, EventKind::NoteOff);
        assert_eq!(event.number, 64);
    }

    #[test]
    fn test_from_bytes_controller_and_other() {
        let cc = MidiEvent::from_bytes(&[0xB0, 7, 127], 0.0).unwrap();
        assert_eq!(cc.kind, EventKind::ControlChange);
        assert_eq!((cc.number, cc.value), (7, 127));

        let bend = MidiEvent::from_bytes(&[0xE0, 0, 64], 0.0).unwrap();
        assert_eq!(bend.kind, EventKind::Other(0xE0));
        assert!(!bend.is_forwarded());

        assert!(MidiEvent::from_bytes(&[], 0.0).is_none());
        assert!(MidiEvent::from_bytes(&[0x90, 60], 0.0).is_none());
    }

    #[test]
    fn test_tag_list_lines() {
        let tags = TagList::from_lines("piano\r\n  lead \n\nbass\n");
        assert_eq!(tags.as_slice(), &["piano", "lead", "bass"]);
        assert_eq!(tags.to_lines(), "piano\nlead\nbass");
        assert!(TagList::from_lines("").is_empty());
        assert!(TagList::from_lines("\n \n").is_empty());
    }

    #[test]
    fn test_tag_list_never_holds_empty_tags() {
        assert!(TagList::from_lines("\r\n").is_empty());
        assert!(TagList::from_lines("\r\n\r\n").is_empty());

        let tags = TagList::from_lines("a\n\nb");
        assert_eq!(tags.as_slice(), &["a", "b"]);
        assert_eq!(TagList::from_lines(&tags.to_lines()), tags);
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("127.0.0.1", 8000).to_string(), "127.0.0.1:8000");
    }
}
