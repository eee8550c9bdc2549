//! Word listener: reconstructs typed characters from key events and fires a
//! callback when a tracked word is immediately followed by a trigger key.
//! Abbreviation expansion is built on top of this plus backspace synthesis
//! and [`crate::send::write`].

use crate::error::Result;
use crate::hub::{Hub, HookFilter, HookId};
use crate::names::NameTable;
use crate::send;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordId(pub u64);

struct Registration {
    word: String,
    trigger_codes: Vec<crate::event::ScanCode>,
    match_suffix: bool,
    case_sensitive: bool,
    timeout: f64,
    callback: Arc<Mutex<Box<dyn FnMut() + Send>>>,
}

struct State {
    buffer: String,
    last_char_time: f64,
}

impl Default for State {
    fn default() -> Self {
        State { buffer: String::new(), last_char_time: f64::NEG_INFINITY }
    }
}

struct Slot {
    registration: Registration,
    state: State,
}

struct Table {
    entries: HashMap<u64, Slot>,
    order: Vec<u64>,
}

/// Owns every word-trigger registration and the hub hook that drives them.
pub struct WordListener {
    table: Arc<Mutex<Table>>,
    names: Arc<parking_lot::RwLock<NameTable>>,
    next_id: AtomicU64,
    hub_hook: Mutex<Option<HookId>>,
}

impl WordListener {
    pub fn new(names: Arc<parking_lot::RwLock<NameTable>>) -> Self {
        WordListener {
            table: Arc::new(Mutex::new(Table { entries: HashMap::new(), order: Vec::new() })),
            names,
            next_id: AtomicU64::new(1),
            hub_hook: Mutex::new(None),
        }
    }

    pub fn install(&self, hub: &Hub) -> Result<()> {
        let mut hub_hook = self.hub_hook.lock();
        if hub_hook.is_some() {
            return Ok(());
        }
        let table = self.table.clone();
        let names = self.names.clone();
        let id = hub.add_hook(
            HookFilter::down_only(),
            false,
            Box::new(move |event| {
                on_event(&table, &names, event);
                crate::event::SuppressionVote::Allow
            }),
        )?;
        *hub_hook = Some(id);
        Ok(())
    }

    /// `word` fires when it appears immediately before any of `triggers`
    /// (trigger key names, e.g. `["space", "tab", "enter"]`).
    pub fn add_word(
        &self,
        word: &str,
        triggers: &[&str],
        match_suffix: bool,
        case_sensitive: bool,
        timeout: f64,
        callback: Box<dyn FnMut() + Send>,
    ) -> WordId {
        let trigger_codes = {
            let names = self.names.read();
            triggers.iter().flat_map(|t| names.lookup(t)).collect()
        };
        let registration = Registration {
            word: if case_sensitive { word.to_string() } else { word.to_lowercase() },
            trigger_codes,
            match_suffix,
            case_sensitive,
            timeout,
            callback: Arc::new(Mutex::new(callback)),
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut table = self.table.lock();
        table.order.push(id);
        table
            .entries
            .insert(id, Slot { registration, state: State::default() });
        WordId(id)
    }

    /// An abbreviation: typing `word` then a trigger key deletes the typed
    /// word and trigger, then types `replacement`.
    pub fn add_abbreviation(
        &self,
        hub: Arc<Hub>,
        word: &str,
        replacement: &str,
        triggers: &[&str],
        case_sensitive: bool,
    ) -> WordId {
        let word_owned = word.to_string();
        let replacement_owned = replacement.to_string();
        let backspace_code = {
            let names = self.names.read();
            names.lookup("backspace").first().copied()
        };
        self.add_word(
            word,
            triggers,
            false,
            case_sensitive,
            1.0,
            Box::new(move || {
                if let Some(code) = backspace_code {
                    for _ in 0..(word_owned.chars().count() + 1) {
                        let _ = hub.press(code);
                        let _ = hub.release(code);
                    }
                }
                let _ = send::write(&hub, &replacement_owned, 0.0, false, false);
            }),
        )
    }

    pub fn remove(&self, id: WordId) -> bool {
        self.table.lock().entries.remove(&id.0).is_some()
    }
}

fn fire(registration: &Registration) {
    let callback = registration.callback.clone();
    std::thread::spawn(move || {
        (callback.lock())();
    });
}

/// Character this event types, honoring the shift snapshot on the event;
/// `None` for non-character keys.
fn char_for_event(names: &NameTable, event: &crate::event::Event) -> Option<char> {
    let name = event.name.clone().or_else(|| names.name_for(event.scan_code, false))?;
    let mut chars = name.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let shifted = event
        .modifiers
        .as_ref()
        .map(|m| m.iter().any(|n| n == "shift" || n.ends_with("shift")))
        .unwrap_or(false);
    if ch.is_alphabetic() {
        Some(if shifted { ch.to_ascii_uppercase() } else { ch.to_ascii_lowercase() })
    } else {
        Some(ch)
    }
}

fn on_event(table: &Mutex<Table>, names: &parking_lot::RwLock<NameTable>, event: &crate::event::Event) {
    if event.injected {
        return;
    }

    let names = names.read();
    let non_shift_modifier_held = event
        .modifiers
        .as_ref()
        .map(|m| m.iter().any(|n| !(n == "shift" || n.ends_with("shift"))))
        .unwrap_or(false);

    let mut guard = table.lock();
    let order = guard.order.clone();
    let now = event.time;

    for id in &order {
        let Some(slot) = guard.entries.get_mut(id) else { continue };

        if non_shift_modifier_held {
            slot.state.buffer.clear();
            continue;
        }

        let is_trigger = slot.registration.trigger_codes.contains(&event.scan_code);
        if is_trigger {
            let matched = if slot.registration.case_sensitive {
                if slot.registration.match_suffix {
                    slot.state.buffer.ends_with(&slot.registration.word)
                } else {
                    slot.state.buffer == slot.registration.word
                }
            } else {
                let lower = slot.state.buffer.to_lowercase();
                if slot.registration.match_suffix {
                    lower.ends_with(&slot.registration.word)
                } else {
                    lower == slot.registration.word
                }
            };
            if matched {
                fire(&slot.registration);
            }
            slot.state.buffer.clear();
            continue;
        }

        match char_for_event(&names, event) {
            Some(ch) => {
                if now - slot.state.last_char_time > slot.registration.timeout {
                    slot.state.buffer.clear();
                }
                slot.state.buffer.push(ch);
                slot.state.last_char_time = now;
            }
            None => slot.state.buffer.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeBackend, Injection};
    use crate::backend::Backend;
    use crate::event::{Event, EventType};
    use crate::hub::HookFilter;
    use std::sync::atomic::AtomicUsize;

    fn setup() -> (Hub, FakeBackend) {
        let backend = FakeBackend::with_default_mapping();
        let hub = Hub::new(Box::new(backend.clone())).unwrap();
        hub.add_hook(HookFilter::any(), false, Box::new(|_| crate::event::SuppressionVote::Allow))
            .unwrap();
        (hub, backend)
    }

    fn down(code: crate::event::ScanCode, name: &str, t: f64) -> Event {
        let mut e = Event::new(EventType::Down, code, t);
        e.name = Some(name.to_string());
        e.modifiers = Some(Default::default());
        e
    }

    #[test]
    fn exact_match_fires_on_trigger() {
        let (hub, backend) = setup();
        let listener = WordListener::new(hub.names());
        listener.install(&hub).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        listener.add_word("hi", &["space"], false, true, 1.0, Box::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        backend.inject(down(35, "h", 0.0));
        backend.inject(down(24, "i", 0.1));
        backend.inject(down(57, "space", 0.2));
        std::thread::sleep(std::time::Duration::from_millis(20));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn abbreviation_backspaces_then_writes_replacement() {
        let (hub, backend) = setup();
        let hub = Arc::new(hub);
        let listener = WordListener::new(hub.names());
        listener.install(&hub).unwrap();

        listener.add_abbreviation(hub.clone(), "tm", "(tm)", &["space"], true);

        backend.inject(down(20, "t", 0.0));
        backend.inject(down(50, "m", 0.1));
        backend.inject(down(57, "space", 0.2));
        std::thread::sleep(std::time::Duration::from_millis(20));

        let injections = backend.injections();
        let backspaces = injections
            .iter()
            .filter(|i| matches!(i, Injection::Press(14)))
            .count();
        assert_eq!(backspaces, 3); // "tm" + the trigger key
        assert!(injections.iter().any(|i| matches!(i, Injection::Unicode('('))));
    }
}
