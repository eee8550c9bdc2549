//! Typed-string reconstructor: a pure function over an event stream that
//! turns key-downs into the strings a user typed, tracking shift/capslock
//! state and finalizing on segmenting keys (enter/tab/esc).
//!
//! Exposed two ways: a `feed`/`end` step function for hosts without native
//! iterators, and a lazy pull-iterator adapter ([`reconstruct`]) for hosts
//! that do.

use crate::event::{Event, EventType};
use crate::names::NameTable;

fn is_shift_name(name: &str) -> bool {
    name == "shift" || name == "left shift" || name == "right shift"
}

/// Step-function form of the reconstructor: `feed` returns a finished string
/// whenever a segmenting key closes one out; `end` flushes whatever is left.
pub struct Reconstructor {
    shift_down_count: u32,
    capslock: bool,
    allow_backspace: bool,
    buffer: String,
}

impl Reconstructor {
    pub fn new(allow_backspace: bool) -> Self {
        Reconstructor {
            shift_down_count: 0,
            capslock: false,
            allow_backspace,
            buffer: String::new(),
        }
    }

    /// Feed one event. Returns `Some(string)` when a segmenting key
    /// (enter/tab/esc) finalizes the buffer, even if that string is empty.
    pub fn feed(&mut self, names: &NameTable, event: &Event) -> Option<String> {
        let name = event
            .name
            .clone()
            .or_else(|| names.name_for(event.scan_code, false))?;

        if event.event_type == EventType::Up {
            if is_shift_name(&name) {
                self.shift_down_count = self.shift_down_count.saturating_sub(1);
            }
            return None;
        }

        if is_shift_name(&name) {
            self.shift_down_count += 1;
            return None;
        }
        if name == "caps lock" {
            self.capslock = !self.capslock;
            return None;
        }

        match name.as_str() {
            "enter" | "tab" | "esc" => Some(std::mem::take(&mut self.buffer)),
            "backspace" => {
                if self.allow_backspace {
                    self.buffer.pop();
                }
                None
            }
            "space" => {
                self.buffer.push(' ');
                None
            }
            _ if name.chars().count() == 1 => {
                let ch = name.chars().next().unwrap();
                let out = if ch.is_alphabetic() {
                    let shifted = self.shift_down_count > 0;
                    if shifted ^ self.capslock {
                        ch.to_ascii_uppercase()
                    } else {
                        ch.to_ascii_lowercase()
                    }
                } else {
                    ch
                };
                self.buffer.push(out);
                None
            }
            _ => None,
        }
    }

    /// Flush the current buffer, e.g. at end-of-stream. `None` if empty.
    pub fn end(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

/// Lazy pull iterator over an event source, safe to run over an infinite
/// stream: it only ever holds the current partial string in memory.
pub struct ReconstructIter<'a, I> {
    names: &'a NameTable,
    events: I,
    reconstructor: Reconstructor,
    ended: bool,
}

impl<'a, I: Iterator<Item = Event>> Iterator for ReconstructIter<'a, I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match self.events.next() {
                Some(event) => {
                    if let Some(s) = self.reconstructor.feed(self.names, &event) {
                        return Some(s);
                    }
                }
                None => {
                    if self.ended {
                        return None;
                    }
                    self.ended = true;
                    return self.reconstructor.end();
                }
            }
        }
    }
}

/// Wrap an event source in a [`ReconstructIter`].
pub fn reconstruct<I: IntoIterator<Item = Event>>(
    names: &NameTable,
    allow_backspace: bool,
    events: I,
) -> ReconstructIter<'_, I::IntoIter> {
    ReconstructIter {
        names,
        events: events.into_iter(),
        reconstructor: Reconstructor::new(allow_backspace),
        ended: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameTable;

    fn table() -> NameTable {
        NameTable::build(
            vec![
                (42, "left shift".to_string(), false),
                (30, "a".to_string(), false),
                (48, "b".to_string(), false),
                (57, "space".to_string(), false),
                (28, "enter".to_string(), false),
                (14, "backspace".to_string(), false),
            ],
            vec![],
        )
    }

    fn down(code: u32, t: f64) -> Event {
        Event::new(EventType::Down, code, t)
    }
    fn up(code: u32, t: f64) -> Event {
        Event::new(EventType::Up, code, t)
    }

    #[test]
    fn shift_held_uppercases_letters() {
        let table = table();
        let events = vec![down(42, 0.0), down(30, 0.1), up(42, 0.2), down(48, 0.3)];
        let strings: Vec<_> = reconstruct(&table, true, events).collect();
        assert_eq!(strings, vec!["Ab"]);
    }

    #[test]
    fn enter_finalizes_and_starts_a_fresh_string() {
        let table = table();
        let events = vec![down(30, 0.0), down(28, 0.1), down(48, 0.2)];
        let strings: Vec<_> = reconstruct(&table, true, events).collect();
        assert_eq!(strings, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn backspace_removes_last_char_only_when_allowed() {
        let table = table();
        let events = vec![down(30, 0.0), down(48, 0.1), down(14, 0.2)];

        let allowed: Vec<_> = reconstruct(&table, true, events.clone()).collect();
        assert_eq!(allowed, vec!["a".to_string()]);

        let disallowed: Vec<_> = reconstruct(&table, false, events).collect();
        assert_eq!(disallowed, vec!["ab".to_string()]);
    }

    #[test]
    fn space_is_a_text_character_not_a_segmenter() {
        let table = table();
        let events = vec![down(30, 0.0), down(57, 0.1), down(48, 0.2)];
        let strings: Vec<_> = reconstruct(&table, true, events).collect();
        assert_eq!(strings, vec!["a b"]);
    }
}
