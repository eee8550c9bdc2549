//! Recorder/player: capture an event stream into a thread-safe queue and
//! replay it later with optional time scaling.

use crate::error::Result;
use crate::event::{Event, EventType};
use crate::hotkey::{Hotkey, Matcher, SuppressPolicy};
use crate::hub::{Hub, HookFilter, HookId};
use crate::send;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

/// A recorder's append-only event queue, shared between the hub-thread hook
/// that appends to it and whatever later drains it into a `Vec`.
#[derive(Clone, Default)]
pub struct RecordQueue(Arc<Mutex<Vec<Event>>>);

impl RecordQueue {
    pub fn new() -> Self {
        RecordQueue::default()
    }

    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Install a recording hook; returns the queue it appends to and the hook id
/// needed to stop it with [`stop`].
pub fn start(hub: &Hub) -> Result<(RecordQueue, HookId)> {
    let queue = RecordQueue::new();
    let queue_clone = queue.clone();
    let id = hub.add_hook(
        HookFilter::any(),
        false,
        Box::new(move |event| {
            queue_clone.0.lock().push(event.clone());
            crate::event::SuppressionVote::Allow
        }),
    )?;
    Ok((queue, id))
}

pub fn stop(hub: &Hub, id: HookId) {
    hub.remove_hook(id);
}

/// Start a recorder, install a one-shot hotkey for `until`, block until it
/// fires, and return the drained queue.
pub fn record(hub: &Hub, matcher: &Matcher, until: &Hotkey) -> Result<Vec<Event>> {
    let (queue, hook_id) = start(hub)?;

    let pair = Arc::new((Mutex::new(false), Condvar::new()));
    let pair_clone = pair.clone();
    let hotkey_id = matcher.add_hotkey(
        until,
        Box::new(move || {
            let (done, cvar) = &*pair_clone;
            *done.lock() = true;
            cvar.notify_all();
        }),
        false,
        SuppressPolicy::default(),
        f64::INFINITY,
        false,
    );

    let (done, cvar) = &*pair;
    let mut guard = done.lock();
    while !*guard {
        cvar.wait(&mut guard);
    }
    drop(guard);

    matcher.remove_hotkey(hotkey_id);
    stop(hub, hook_id);
    Ok(queue.drain())
}

/// Replay a recorded event list, scaled by `1/speed_factor` (no sleeping at
/// all when `speed_factor <= 0`), then restore whatever state was stashed
/// before playback.
pub fn play(hub: &Hub, events: &[Event], speed_factor: f64) -> Result<()> {
    let stashed = send::stash_state(hub)?;

    let Some(first) = events.first() else {
        return send::restore_state(hub, &stashed);
    };
    let start = std::time::Instant::now();

    for event in events {
        if speed_factor > 0.0 {
            let target = (event.time - first.time) / speed_factor;
            let target = target.max(0.0);
            let elapsed = start.elapsed().as_secs_f64();
            if target > elapsed {
                sleep(Duration::from_secs_f64(target - elapsed));
            }
        }
        match event.event_type {
            EventType::Down => hub.press(event.scan_code)?,
            EventType::Up => hub.release(event.scan_code)?,
        }
    }

    send::restore_state(hub, &stashed)
}
