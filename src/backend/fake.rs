//! Deterministic in-process backend used by this crate's own test suite and
//! available to host applications that want to drive the engine without a
//! real keyboard (CI, golden-scenario tests, fuzzing).
//!
//! `inject` calls the installed hook synchronously on the caller's thread —
//! there is exactly one "hub thread" for as long as the caller only ever
//! injects from one thread, which is what every test in this crate does, and
//! it removes any race between injection order and hook invocation order.

use super::{Backend, HookCallback, HookHandle};
use crate::error::BackendError;
use crate::event::{Event, EventType, ScanCode};
use crate::names::MappingEntry;
use parking_lot::Mutex;
use std::sync::Arc;

/// One entry in the synthesis log `press`/`release`/`type_unicode` append to,
/// inspectable after the fact by tests that assert on what was sent to "the
/// OS" (record/play round-trip, write-restores-state).
#[derive(Debug, Clone, PartialEq)]
pub enum Injection {
    Press(ScanCode),
    Release(ScanCode),
    Unicode(char),
}

struct Shared {
    hook: Option<HookCallback>,
    injections: Vec<Injection>,
    next_handle: u64,
}

/// A fake [`Backend`] seeded with a fixed scan-code mapping.
#[derive(Clone)]
pub struct FakeBackend {
    mapping: Vec<MappingEntry>,
    shared: Arc<Mutex<Shared>>,
}

impl FakeBackend {
    pub fn new(mapping: Vec<MappingEntry>) -> Self {
        FakeBackend {
            mapping,
            shared: Arc::new(Mutex::new(Shared {
                hook: None,
                injections: Vec::new(),
                next_handle: 1,
            })),
        }
    }

    /// A small QWERTY-ish fixture covering the names exercised by this
    /// crate's tests and examples: sided ctrl/shift/alt, a handful of
    /// letters, space, enter, backspace, and a keypad/navigation pair.
    pub fn with_default_mapping() -> Self {
        FakeBackend::new(vec![
            (29, "left ctrl".into(), false),
            (97, "right ctrl".into(), false),
            (42, "left shift".into(), false),
            (54, "right shift".into(), false),
            (56, "left alt".into(), false),
            (100, "right alt".into(), false),
            (30, "a".into(), false),
            (48, "b".into(), false),
            (57, "space".into(), false),
            (28, "enter".into(), false),
            (14, "backspace".into(), false),
            (1, "esc".into(), false),
            (102, "home".into(), false),
            (71, "home".into(), true),
            (104, "page up".into(), false),
            (73, "page up".into(), true),
        ])
    }

    /// Feed one event through the installed hook as though the OS had
    /// produced it. Panics if no hook has been installed, since that
    /// indicates a test bug rather than a recoverable condition.
    pub fn inject(&self, event: Event) -> crate::event::SuppressionVote {
        let mut shared = self.shared.lock();
        let hook = shared
            .hook
            .as_mut()
            .expect("FakeBackend::inject called before install_hook");
        hook(event)
    }

    /// The synthesis log in call order, for assertions.
    pub fn injections(&self) -> Vec<Injection> {
        self.shared.lock().injections.clone()
    }
}

impl Backend for FakeBackend {
    fn init(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), BackendError> {
        self.shared.lock().hook = None;
        Ok(())
    }

    fn mapping(&self) -> Vec<MappingEntry> {
        self.mapping.clone()
    }

    fn install_hook(&mut self, on_event: HookCallback) -> Result<HookHandle, BackendError> {
        let mut shared = self.shared.lock();
        shared.hook = Some(on_event);
        let id = shared.next_handle;
        shared.next_handle += 1;
        Ok(HookHandle(id))
    }

    fn uninstall_hook(&mut self, _handle: HookHandle) -> Result<(), BackendError> {
        self.shared.lock().hook = None;
        Ok(())
    }

    fn press(&self, scan_code: ScanCode) -> Result<(), BackendError> {
        let mut shared = self.shared.lock();
        shared.injections.push(Injection::Press(scan_code));
        if let Some(hook) = shared.hook.as_mut() {
            let mut event = Event::new(EventType::Down, scan_code, 0.0);
            event.injected = true;
            hook(event);
        }
        Ok(())
    }

    fn release(&self, scan_code: ScanCode) -> Result<(), BackendError> {
        let mut shared = self.shared.lock();
        shared.injections.push(Injection::Release(scan_code));
        if let Some(hook) = shared.hook.as_mut() {
            let mut event = Event::new(EventType::Up, scan_code, 0.0);
            event.injected = true;
            hook(event);
        }
        Ok(())
    }

    fn type_unicode(&self, codepoint: char) -> Result<(), BackendError> {
        self.shared.lock().injections.push(Injection::Unicode(codepoint));
        Ok(())
    }

    fn tag_injected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_are_logged_and_replayed_through_the_hook() {
        let mut backend = FakeBackend::with_default_mapping();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        backend
            .install_hook(Box::new(move |e| {
                seen_clone.lock().push((e.event_type, e.scan_code, e.injected));
                crate::event::SuppressionVote::Allow
            }))
            .unwrap();

        backend.press(30).unwrap();
        backend.release(30).unwrap();

        assert_eq!(
            backend.injections(),
            vec![Injection::Press(30), Injection::Release(30)]
        );
        assert_eq!(
            *seen.lock(),
            vec![
                (EventType::Down, 30, true),
                (EventType::Up, 30, true),
            ]
        );
    }

    #[test]
    fn inject_delivers_synchronously_to_the_installed_hook() {
        let mut backend = FakeBackend::with_default_mapping();
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        backend
            .install_hook(Box::new(move |_| {
                *count_clone.lock() += 1;
                crate::event::SuppressionVote::Allow
            }))
            .unwrap();

        backend.inject(Event::new(EventType::Down, 30, 0.0));
        backend.inject(Event::new(EventType::Up, 30, 0.01));

        assert_eq!(*count.lock(), 2);
    }
}
