//! Dispatch hub: owns the single backend event tap and fans events out to
//! every registered hook, in registration order, collecting suppression
//! votes along the way.

use crate::backend::{Backend, HookHandle};
use crate::error::BackendError;
use crate::event::{Event, EventType, ScanCode, SuppressionVote};
use crate::names::NameTable;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of one hook registration, returned by [`Hub::add_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub u64);

/// What subset of events a hook wants to see.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookFilter {
    pub scan_code: Option<ScanCode>,
    pub direction: Option<EventType>,
}

impl HookFilter {
    pub fn any() -> Self {
        HookFilter::default()
    }

    pub fn for_key(scan_code: ScanCode) -> Self {
        HookFilter { scan_code: Some(scan_code), direction: None }
    }

    pub fn down_only() -> Self {
        HookFilter { scan_code: None, direction: Some(EventType::Down) }
    }

    pub fn up_only() -> Self {
        HookFilter { scan_code: None, direction: Some(EventType::Up) }
    }

    fn matches(&self, event: &Event) -> bool {
        if let Some(code) = self.scan_code {
            if code != event.scan_code {
                return false;
            }
        }
        if let Some(dir) = self.direction {
            if dir != event.event_type {
                return false;
            }
        }
        true
    }
}

pub type HookFn = Box<dyn FnMut(&Event) -> SuppressionVote + Send>;

struct HookEntry {
    filter: HookFilter,
    suppress: bool,
    callback: HookFn,
}

/// Insertion-ordered table supporting O(1) removal: entries are tombstoned
/// out of the map and left in `order` until the next full scan, which already
/// has to walk every live entry for dispatch.
struct HookTable {
    entries: HashMap<u64, HookEntry>,
    order: Vec<u64>,
}

impl HookTable {
    fn new() -> Self {
        HookTable { entries: HashMap::new(), order: Vec::new() }
    }

    fn insert(&mut self, id: u64, entry: HookEntry) {
        self.order.push(id);
        self.entries.insert(id, entry);
    }

    fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }
}

/// Global mutable set of currently-down scan codes, maintained solely by the
/// hub thread from observed down/up events.
pub struct PressedSet {
    codes: RwLock<HashSet<ScanCode>>,
}

impl PressedSet {
    fn new() -> Self {
        PressedSet { codes: RwLock::new(HashSet::new()) }
    }

    pub fn is_pressed(&self, code: ScanCode) -> bool {
        self.codes.read().contains(&code)
    }

    pub fn snapshot(&self) -> HashSet<ScanCode> {
        self.codes.read().clone()
    }

    fn apply(&self, event_type: EventType, code: ScanCode) {
        let mut codes = self.codes.write();
        match event_type {
            EventType::Down => {
                codes.insert(code);
            }
            EventType::Up => {
                codes.remove(&code);
            }
        }
    }
}

/// Owns the single OS hook and fans events out to hooks registered via
/// [`Hub::add_hook`]. Construct one per [`crate::engine::Engine`].
pub struct Hub {
    backend: Mutex<Box<dyn Backend>>,
    names: Arc<RwLock<NameTable>>,
    pressed: Arc<PressedSet>,
    hooks: Arc<Mutex<HookTable>>,
    next_id: AtomicU64,
    handle: Mutex<Option<HookHandle>>,
}

impl Hub {
    /// Build a hub around a backend without starting its event tap yet; the
    /// tap starts lazily on the first [`Hub::add_hook`] call.
    pub fn new(mut backend: Box<dyn Backend>) -> Result<Self, BackendError> {
        backend.init()?;
        let names = NameTable::build(backend.mapping(), Vec::new());
        Ok(Hub {
            backend: Mutex::new(backend),
            names: Arc::new(RwLock::new(names)),
            pressed: Arc::new(PressedSet::new()),
            hooks: Arc::new(Mutex::new(HookTable::new())),
            next_id: AtomicU64::new(1),
            handle: Mutex::new(None),
        })
    }

    pub fn names(&self) -> Arc<RwLock<NameTable>> {
        self.names.clone()
    }

    pub fn pressed(&self) -> Arc<PressedSet> {
        self.pressed.clone()
    }

    /// Rebuild the name table from the backend's current mapping, keeping
    /// alias overrides already applied.
    pub fn reload_names(&self) {
        let mapping = self.backend.lock().mapping();
        self.names.write().reload(mapping);
    }

    fn ensure_started(&self) -> Result<(), BackendError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }
        let names = self.names.clone();
        let pressed = self.pressed.clone();
        let hooks = self.hooks.clone();
        let dispatch: crate::backend::HookCallback = Box::new(move |mut event| {
            pressed.apply(event.event_type, event.scan_code);

            if event.name.is_none() {
                event.name = names.read().name_for(event.scan_code, false);
            }
            event.modifiers = Some(modifier_snapshot(&names.read(), &pressed));

            dispatch_to_hooks(&hooks, &event)
        });

        let installed = self.backend.lock().install_hook(dispatch)?;
        *handle = Some(installed);
        Ok(())
    }

    /// Register a hook; starts the backend's event tap on first call.
    /// Returns the id used with [`Hub::remove_hook`].
    pub fn add_hook(
        &self,
        filter: HookFilter,
        suppress: bool,
        callback: HookFn,
    ) -> Result<HookId, BackendError> {
        self.ensure_started()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.hooks.lock().insert(id, HookEntry { filter, suppress, callback });
        Ok(HookId(id))
    }

    /// O(1): the entry is removed from the lookup map immediately, so no
    /// callback for this id starts after this call returns.
    pub fn remove_hook(&self, id: HookId) -> bool {
        self.hooks.lock().remove(id.0)
    }

    pub fn press(&self, code: ScanCode) -> Result<(), BackendError> {
        self.backend.lock().press(code)
    }

    pub fn release(&self, code: ScanCode) -> Result<(), BackendError> {
        self.backend.lock().release(code)
    }

    pub fn type_unicode(&self, codepoint: char) -> Result<(), BackendError> {
        self.backend.lock().type_unicode(codepoint)
    }

    pub fn shutdown(&self) -> Result<(), BackendError> {
        let mut handle = self.handle.lock();
        let mut backend = self.backend.lock();
        if let Some(h) = handle.take() {
            backend.uninstall_hook(h)?;
        }
        backend.shutdown()
    }
}

fn modifier_snapshot(names: &NameTable, pressed: &PressedSet) -> HashSet<String> {
    pressed
        .snapshot()
        .into_iter()
        .filter(|&code| names.is_modifier(code))
        .filter_map(|code| names.name_for(code, false))
        .collect()
}

/// Invoke every live hook whose filter matches, in registration order, except
/// that non-suppressing hooks run after every suppressing hook has voted so a
/// slow observer never delays the suppression decision the backend needs
/// synchronously.
fn dispatch_to_hooks(hooks: &Mutex<HookTable>, event: &Event) -> SuppressionVote {
    let mut table = hooks.lock();
    let order = table.order.clone();

    let mut vote = SuppressionVote::Allow;
    for id in &order {
        let matches_and_suppresses = table
            .entries
            .get(id)
            .map(|e| e.suppress && e.filter.matches(event))
            .unwrap_or(false);
        if !matches_and_suppresses {
            continue;
        }
        if let Some(entry) = table.entries.get_mut(id) {
            vote = vote.or((entry.callback)(event));
        }
    }
    for id in &order {
        let matches_and_allows = table
            .entries
            .get(id)
            .map(|e| !e.suppress && e.filter.matches(event))
            .unwrap_or(false);
        if !matches_and_allows {
            continue;
        }
        if let Some(entry) = table.entries.get_mut(id) {
            (entry.callback)(event);
        }
    }
    vote
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::event::EventType;

    fn hub() -> (Hub, FakeBackend) {
        let backend = FakeBackend::with_default_mapping();
        let hub = Hub::new(Box::new(backend.clone())).unwrap();
        (hub, backend)
    }

    #[test]
    fn pressed_set_tracks_down_and_up() {
        let (hub, backend) = hub();
        let pressed = hub.pressed();
        hub.add_hook(HookFilter::any(), false, Box::new(|_| SuppressionVote::Allow))
            .unwrap();

        backend.inject(Event::new(EventType::Down, 30, 0.0));
        assert!(pressed.is_pressed(30));
        backend.inject(Event::new(EventType::Up, 30, 0.1));
        assert!(!pressed.is_pressed(30));
    }

    #[test]
    fn any_suppressing_hook_wins_the_vote() {
        let (hub, backend) = hub();
        hub.add_hook(HookFilter::any(), false, Box::new(|_| SuppressionVote::Allow))
            .unwrap();
        hub.add_hook(HookFilter::any(), true, Box::new(|_| SuppressionVote::Suppress))
            .unwrap();

        let vote = backend.inject(Event::new(EventType::Down, 30, 0.0));
        assert_eq!(vote, SuppressionVote::Suppress);
    }

    #[test]
    fn removed_hook_never_runs_again() {
        let (hub, backend) = hub();
        let calls = Arc::new(parking_lot::Mutex::new(0));
        let calls_clone = calls.clone();
        let id = hub
            .add_hook(
                HookFilter::any(),
                false,
                Box::new(move |_| {
                    *calls_clone.lock() += 1;
                    SuppressionVote::Allow
                }),
            )
            .unwrap();

        backend.inject(Event::new(EventType::Down, 30, 0.0));
        assert!(hub.remove_hook(id));
        backend.inject(Event::new(EventType::Down, 30, 0.1));

        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn hook_filter_for_key_ignores_other_scan_codes() {
        let (hub, backend) = hub();
        let calls = Arc::new(parking_lot::Mutex::new(0));
        let calls_clone = calls.clone();
        hub.add_hook(
            HookFilter::for_key(30),
            false,
            Box::new(move |_| {
                *calls_clone.lock() += 1;
                SuppressionVote::Allow
            }),
        )
        .unwrap();

        backend.inject(Event::new(EventType::Down, 48, 0.0));
        backend.inject(Event::new(EventType::Down, 30, 0.1));

        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn modifier_snapshot_reflects_held_modifiers() {
        let (hub, backend) = hub();
        let seen_modifiers = Arc::new(parking_lot::Mutex::new(None));
        let seen_clone = seen_modifiers.clone();
        hub.add_hook(
            HookFilter::for_key(30),
            false,
            Box::new(move |e| {
                *seen_clone.lock() = e.modifiers.clone();
                SuppressionVote::Allow
            }),
        )
        .unwrap();

        backend.inject(Event::new(EventType::Down, 29, 0.0));
        backend.inject(Event::new(EventType::Down, 30, 0.01));

        let modifiers = seen_modifiers.lock().clone().unwrap();
        assert!(modifiers.contains("ctrl"));
    }
}
