//! Hotkey matcher: a state machine over the hub's event stream that
//! recognizes ordered sequences of simultaneous-key steps.
//!
//! One [`MatchState`] is tracked per registration: a cursor into the
//! registration's steps and an optional deadline. The matcher itself is
//! installed as a single suppressing hook on the hub; its dispatch is
//! synchronous, and only the user-facing callback is handed off to a worker
//! thread so a slow callback never stalls key delivery.

use super::parse::Hotkey;
use crate::event::{Event, EventType, ScanCode, SuppressionVote};
use crate::hub::{Hub, HookFilter, HookId, PressedSet};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Whether an incomplete, in-progress multi-step hotkey suppresses the keys
/// belonging to its current step even before that step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressPolicy {
    /// Only the final key of a completed hotkey is ever suppressed.
    LastStepOnly,
    /// Any key belonging to the step the matcher is mid-sequence on is
    /// suppressed, in addition to the final key. Matches a registration's
    /// `suppress=true` intent literally: don't leak partial chords either.
    WholeSequence,
}

impl Default for SuppressPolicy {
    fn default() -> Self {
        SuppressPolicy::WholeSequence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyId(pub u64);

struct Registration {
    combinations: Vec<Vec<Vec<ScanCode>>>,
    len: usize,
    callback: Arc<Mutex<Box<dyn FnMut() + Send>>>,
    suppress: bool,
    suppress_policy: SuppressPolicy,
    timeout: f64,
    trigger_on_release: bool,
}

#[derive(Default)]
struct MatchState {
    cursor: usize,
    deadline: Option<f64>,
    armed_release: Option<Vec<ScanCode>>,
}

struct Slot {
    registration: Registration,
    state: MatchState,
}

struct Table {
    entries: HashMap<u64, Slot>,
    order: Vec<u64>,
}

/// Owns every hotkey registration and the one hub hook that drives them.
pub struct Matcher {
    table: Arc<Mutex<Table>>,
    pressed: Arc<PressedSet>,
    next_id: AtomicU64,
    hub_hook: Mutex<Option<HookId>>,
}

impl Matcher {
    pub fn new(pressed: Arc<PressedSet>) -> Self {
        Matcher {
            table: Arc::new(Mutex::new(Table { entries: HashMap::new(), order: Vec::new() })),
            pressed,
            next_id: AtomicU64::new(1),
            hub_hook: Mutex::new(None),
        }
    }

    /// Register this matcher's dispatch as a hub hook. Idempotent.
    pub fn install(&self, hub: &Hub) -> Result<(), crate::error::BackendError> {
        let mut hub_hook = self.hub_hook.lock();
        if hub_hook.is_some() {
            return Ok(());
        }
        let table = self.table.clone();
        let pressed = self.pressed.clone();
        let id = hub.add_hook(
            HookFilter::any(),
            true,
            Box::new(move |event| on_event(&table, &pressed, event)),
        )?;
        *hub_hook = Some(id);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_hotkey(
        &self,
        hotkey: &Hotkey,
        callback: Box<dyn FnMut() + Send>,
        suppress: bool,
        suppress_policy: SuppressPolicy,
        timeout: f64,
        trigger_on_release: bool,
    ) -> HotkeyId {
        let combinations = hotkey.0.iter().map(|step| step.combinations()).collect();
        let registration = Registration {
            combinations,
            len: hotkey.len(),
            callback: Arc::new(Mutex::new(callback)),
            suppress,
            suppress_policy,
            timeout,
            trigger_on_release,
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut table = self.table.lock();
        table.order.push(id);
        table.entries.insert(
            id,
            Slot { registration, state: MatchState::default() },
        );
        HotkeyId(id)
    }

    /// O(1): removed immediately from the lookup map, guaranteeing no
    /// callback for this id fires after this call returns.
    pub fn remove_hotkey(&self, id: HotkeyId) -> bool {
        self.table.lock().entries.remove(&id.0).is_some()
    }
}

fn fire(registration: &Registration) {
    // Detached worker thread: the matcher's own dispatch stays synchronous
    // and non-blocking on the hub thread even if this callback is slow.
    let callback = registration.callback.clone();
    std::thread::spawn(move || {
        (callback.lock())();
    });
}

fn on_event(table: &Mutex<Table>, pressed: &PressedSet, event: &Event) -> SuppressionVote {
    let mut vote = SuppressionVote::Allow;
    let mut guard = table.lock();
    let order = guard.order.clone();
    let now = event.time;

    for id in &order {
        if let Some(slot) = guard.entries.get_mut(id) {
            if slot.state.cursor > 0 {
                if let Some(deadline) = slot.state.deadline {
                    if now > deadline {
                        slot.state = MatchState::default();
                    }
                }
            }
        }
    }

    if event.injected {
        return vote;
    }

    match event.event_type {
        EventType::Down => {
            for id in &order {
                let Some(slot) = guard.entries.get_mut(id) else { continue };
                let cursor = slot.state.cursor;

                if cursor > 0
                    && slot.registration.suppress
                    && slot.registration.suppress_policy == SuppressPolicy::WholeSequence
                {
                    let belongs = slot.registration.combinations[cursor]
                        .iter()
                        .any(|combo| combo.contains(&event.scan_code));
                    if belongs {
                        vote = vote.or(SuppressionVote::Suppress);
                    }
                }

                let combo = slot.registration.combinations[cursor]
                    .iter()
                    .find(|combo| {
                        combo.contains(&event.scan_code)
                            && combo.iter().all(|c| pressed.is_pressed(*c))
                    })
                    .cloned();
                let Some(combo) = combo else { continue };

                if cursor + 1 < slot.registration.len {
                    slot.state.cursor = cursor + 1;
                    slot.state.deadline = Some(now + slot.registration.timeout);
                    continue;
                }

                if slot.registration.suppress {
                    vote = vote.or(SuppressionVote::Suppress);
                }
                if slot.registration.trigger_on_release {
                    slot.state.armed_release = Some(combo);
                } else {
                    fire(&slot.registration);
                    slot.state = MatchState::default();
                }
            }
        }
        EventType::Up => {
            for id in &order {
                let Some(slot) = guard.entries.get_mut(id) else { continue };
                let fires = slot
                    .state
                    .armed_release
                    .as_ref()
                    .map(|combo| combo.contains(&event.scan_code))
                    .unwrap_or(false);
                if fires {
                    fire(&slot.registration);
                    slot.state = MatchState::default();
                }
            }
        }
    }

    vote
}
