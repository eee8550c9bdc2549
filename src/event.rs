//! The event types shared across the name table, hub, matcher, send, and
//! record/replay subsystems.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Integer identifying a physical key on one OS backend.
///
/// Opaque across backends: the same number means nothing once you cross a
/// backend boundary, which is why every public API that accepts one also
/// accepts a name that resolves to it.
pub type ScanCode = u32;

/// `down` or `up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Down,
    Up,
}

impl EventType {
    pub fn is_down(self) -> bool {
        matches!(self, EventType::Down)
    }

    pub fn is_up(self) -> bool {
        matches!(self, EventType::Up)
    }
}

/// A single physical key transition, as delivered by a [`crate::backend::Backend`]
/// and enriched by the [`crate::hub::Hub`] before hooks see it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: EventType,
    pub scan_code: ScanCode,
    pub name: Option<String>,
    /// Monotonic seconds, taken from the OS where available.
    pub time: f64,
    pub device: Option<u64>,
    pub is_keypad: bool,
    /// Snapshot of held modifier names at event time. Populated by the hub,
    /// never by the backend.
    pub modifiers: Option<HashSet<String>>,
    /// Set by the hub when the backend tags this event as one `send`
    /// synthesized itself.
    pub injected: bool,
}

impl Event {
    pub fn new(event_type: EventType, scan_code: ScanCode, time: f64) -> Self {
        Event {
            event_type,
            scan_code,
            name: None,
            time,
            device: None,
            is_keypad: false,
            modifiers: None,
            injected: false,
        }
    }
}

/// The JSON-lines wire format used by `keyhook listen`/`record`/`replay`:
/// exactly these five keys, no more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    pub event_type: EventType,
    pub scan_code: ScanCode,
    pub name: Option<String>,
    pub time: f64,
    pub is_keypad: bool,
}

impl From<&Event> for WireEvent {
    fn from(e: &Event) -> Self {
        WireEvent {
            event_type: e.event_type,
            scan_code: e.scan_code,
            name: e.name.clone(),
            time: e.time,
            is_keypad: e.is_keypad,
        }
    }
}

impl From<WireEvent> for Event {
    fn from(w: WireEvent) -> Self {
        Event {
            event_type: w.event_type,
            scan_code: w.scan_code,
            name: w.name,
            time: w.time,
            device: None,
            is_keypad: w.is_keypad,
            modifiers: None,
            injected: false,
        }
    }
}

/// A hook's decision on whether the OS should keep the event from other
/// applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionVote {
    #[default]
    Allow,
    Suppress,
}

impl SuppressionVote {
    /// Disjunction: any `Suppress` wins.
    pub fn or(self, other: SuppressionVote) -> SuppressionVote {
        if self == SuppressionVote::Suppress || other == SuppressionVote::Suppress {
            SuppressionVote::Suppress
        } else {
            SuppressionVote::Allow
        }
    }

    pub fn is_suppress(self) -> bool {
        self == SuppressionVote::Suppress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_vote_or_is_disjunction() {
        assert_eq!(
            SuppressionVote::Allow.or(SuppressionVote::Allow),
            SuppressionVote::Allow
        );
        assert_eq!(
            SuppressionVote::Allow.or(SuppressionVote::Suppress),
            SuppressionVote::Suppress
        );
        assert_eq!(
            SuppressionVote::Suppress.or(SuppressionVote::Allow),
            SuppressionVote::Suppress
        );
    }

    #[test]
    fn wire_event_round_trip_keeps_the_five_keys() {
        let mut e = Event::new(EventType::Down, 30, 1.5);
        e.name = Some("a".to_string());
        e.device = Some(7);
        e.modifiers = Some(HashSet::new());
        e.injected = true;

        let wire = WireEvent::from(&e);
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"event_type\":\"down\""));
        assert!(!json.contains("device"));
        assert!(!json.contains("injected"));

        let back: Event = serde_json::from_str::<WireEvent>(&json).unwrap().into();
        assert_eq!(back.scan_code, 30);
        assert_eq!(back.name.as_deref(), Some("a"));
        assert!(back.device.is_none());
    }
}
