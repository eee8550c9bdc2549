//! End-to-end scenarios driven entirely through the public [`Engine`] API
//! against a deterministic fake backend.

use keyhook::backend::fake::{FakeBackend, Injection};
use keyhook::event::{Event, EventType};
use keyhook::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn engine_with(backend: FakeBackend) -> (Engine, FakeBackend) {
    let engine = Engine::new(Box::new(backend.clone())).unwrap();
    (engine, backend)
}

#[test]
fn single_key_hotkey_fires_once_and_tracks_pressed_state() {
    let (engine, backend) = engine_with(FakeBackend::with_default_mapping());
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();

    engine
        .add_hotkey(
            "space",
            Box::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
            false,
            Default::default(),
            0.5,
            false,
        )
        .unwrap();

    let vote = backend.inject(Event::new(EventType::Down, 57, 0.0));
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(engine.hub().pressed().is_pressed(57));
    assert_eq!(vote, keyhook::SuppressionVote::Allow);
}

#[test]
fn chord_fires_on_completion_and_suppresses_the_completing_key() {
    let (engine, backend) = engine_with(FakeBackend::with_default_mapping());
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();

    engine
        .add_hotkey(
            "ctrl+shift+a",
            Box::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
            true,
            keyhook::SuppressPolicy::WholeSequence,
            0.5,
            false,
        )
        .unwrap();

    backend.inject(Event::new(EventType::Down, 29, 0.0));
    backend.inject(Event::new(EventType::Down, 42, 0.01));
    let vote = backend.inject(Event::new(EventType::Down, 30, 0.02));
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(vote, keyhook::SuppressionVote::Suppress);

    // Release `a` and press it again while ctrl+shift are still held: the
    // chord is a single-step hotkey, so it is a one-shot per down edge and
    // re-fires on the next completing down.
    backend.inject(Event::new(EventType::Up, 30, 0.03));
    backend.inject(Event::new(EventType::Down, 30, 0.04));
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn multi_step_hotkey_fires_within_timeout_and_resets_after() {
    let (engine, backend) = engine_with(FakeBackend::with_default_mapping());
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();

    engine
        .add_hotkey(
            "ctrl+a, b",
            Box::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
            false,
            Default::default(),
            1.0,
            false,
        )
        .unwrap();

    backend.inject(Event::new(EventType::Down, 29, 0.0));
    backend.inject(Event::new(EventType::Down, 30, 0.0));
    backend.inject(Event::new(EventType::Down, 48, 0.5));
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Reset to first step, then let the first step's deadline lapse before b.
    backend.inject(Event::new(EventType::Up, 30, 0.6));
    backend.inject(Event::new(EventType::Up, 29, 0.6));
    backend.inject(Event::new(EventType::Down, 29, 1.0));
    backend.inject(Event::new(EventType::Down, 30, 1.0));
    backend.inject(Event::new(EventType::Down, 48, 2.5));
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(count.load(Ordering::SeqCst), 1, "late completion must not fire");
}

#[test]
fn abbreviation_erases_the_typed_word_and_writes_the_replacement() {
    let (engine, backend) = engine_with(FakeBackend::with_default_mapping());
    engine.add_abbreviation("tm", "™", &["space"], true);

    let mut t = down_named(20, "t");
    t.modifiers = Some(Default::default());
    let mut m = down_named(50, "m");
    m.modifiers = Some(Default::default());
    let mut space = down_named(57, "space");
    space.modifiers = Some(Default::default());

    backend.inject(t);
    backend.inject(m);
    backend.inject(space);
    std::thread::sleep(Duration::from_millis(20));

    let injections = backend.injections();
    let backspaces = injections.iter().filter(|i| matches!(i, Injection::Press(14))).count();
    assert_eq!(backspaces, 3, "\"tm\" plus the trigger key");
    assert!(injections.iter().any(|i| matches!(i, Injection::Unicode('™'))));
}

fn down_named(code: keyhook::ScanCode, name: &str) -> Event {
    let mut e = Event::new(EventType::Down, code, 0.0);
    e.name = Some(name.to_string());
    e
}

#[test]
fn write_restores_held_modifier_and_leaves_pressed_set_unchanged() {
    let (engine, backend) = engine_with(FakeBackend::with_default_mapping());
    backend.inject(Event::new(EventType::Down, 29, 0.0));
    assert!(engine.hub().pressed().is_pressed(29));

    engine.write("Hi", 0.0, true, false).unwrap();

    let injections = backend.injections();
    assert_eq!(injections.first(), Some(&Injection::Release(29)));
    assert_eq!(injections.last(), Some(&Injection::Press(29)));
    assert!(engine.hub().pressed().is_pressed(29));
}

#[test]
fn record_then_play_reproduces_the_injection_log_in_order() {
    let (engine, backend) = engine_with(FakeBackend::with_default_mapping());

    let recorder = std::thread::spawn({
        let matcher_events = backend.clone();
        move || {
            std::thread::sleep(Duration::from_millis(10));
            matcher_events.inject(Event::new(EventType::Down, 30, 0.1));
            matcher_events.inject(Event::new(EventType::Up, 30, 0.2));
            matcher_events.inject(Event::new(EventType::Down, 1, 0.3));
        }
    });

    let events = engine.record("esc").unwrap();
    recorder.join().unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].scan_code, 30);
    assert_eq!(events[1].event_type, EventType::Up);
    assert_eq!(events[2].scan_code, 1);

    // The stop hotkey's own down was recorded but never released; clear it
    // from the pressed set so `play`'s state stash below is a no-op.
    backend.inject(Event::new(EventType::Up, 1, 0.4));

    let before = backend.injections().len();
    engine.play(&events, 0.0).unwrap();
    let after = &backend.injections()[before..];

    assert_eq!(after, &[Injection::Press(30), Injection::Release(30), Injection::Press(1)]);
}
