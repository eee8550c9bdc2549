//! `Engine`: the single owned struct that replaces the hub/matcher/word
//! listener/name table's otherwise-global state, plus the thin process-wide
//! singleton that backs the free-function API (`keyhook::hook`, `keyhook::
//! add_hotkey`, `keyhook::write`, ...).

use crate::backend::{default_backend, Backend};
use crate::error::{KeyhookError, Result};
use crate::event::{Event, ScanCode, SuppressionVote};
use crate::hotkey::{self, HotkeyId, Matcher, SuppressPolicy};
use crate::hub::{Hub, HookFilter, HookId};
use crate::record;
use crate::send;
use crate::word::{WordId, WordListener};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::Duration;

/// Owns the dispatch hub, the hotkey matcher, and the word listener; the
/// unit of lifecycle this crate exposes (construct one, `shutdown` it when
/// done).
pub struct Engine {
    hub: Arc<Hub>,
    matcher: Matcher,
    words: WordListener,
}

impl Engine {
    pub fn new(backend: Box<dyn Backend>) -> Result<Self> {
        let hub = Arc::new(Hub::new(backend)?);
        let matcher = Matcher::new(hub.pressed());
        matcher.install(&hub)?;
        let words = WordListener::new(hub.names());
        words.install(&hub)?;
        Ok(Engine { hub, matcher, words })
    }

    pub fn new_default() -> Result<Self> {
        Engine::new(default_backend()?)
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Every canonical key name currently known, for `keyhook names`.
    pub fn names_dump(&self) -> Vec<(String, Vec<ScanCode>)> {
        let table = self.hub.names();
        let table = table.read();
        let mut names: Vec<_> = table
            .canonical_names()
            .into_iter()
            .map(|n| (n.to_string(), table.lookup(n)))
            .collect();
        names.sort_by(|a, b| a.0.cmp(&b.0));
        names
    }

    pub fn reload_names(&self) {
        self.hub.reload_names();
    }

    pub fn hook(
        &self,
        filter: HookFilter,
        suppress: bool,
        callback: Box<dyn FnMut(&Event) -> SuppressionVote + Send>,
    ) -> Result<HookId> {
        Ok(self.hub.add_hook(filter, suppress, callback)?)
    }

    pub fn unhook(&self, id: HookId) -> bool {
        self.hub.remove_hook(id)
    }

    fn parse(&self, hotkey: &str) -> Result<hotkey::Hotkey> {
        let table = self.hub.names();
        let table = table.read();
        Ok(hotkey::parse_hotkey(&table, hotkey)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_hotkey(
        &self,
        hotkey: &str,
        callback: Box<dyn FnMut() + Send>,
        suppress: bool,
        suppress_policy: SuppressPolicy,
        timeout: f64,
        trigger_on_release: bool,
    ) -> Result<HotkeyId> {
        let parsed = self.parse(hotkey)?;
        Ok(self.matcher.add_hotkey(
            &parsed,
            callback,
            suppress,
            suppress_policy,
            timeout,
            trigger_on_release,
        ))
    }

    pub fn remove_hotkey(&self, id: HotkeyId) -> bool {
        self.matcher.remove_hotkey(id)
    }

    /// A blocking registration as a no-op `suppress=true` hotkey.
    pub fn block_key(&self, key: &str) -> Result<HotkeyId> {
        self.add_hotkey(key, Box::new(|| {}), true, SuppressPolicy::default(), 0.0, false)
    }

    /// A blocking registration on `src` whose callback synthesizes `dst`.
    pub fn remap(&self, src: &str, dst: &str) -> Result<HotkeyId> {
        let dst_parsed = self.parse(dst)?;
        let hub = self.hub.clone();
        self.add_hotkey(
            src,
            Box::new(move || {
                let _ = send::send(&hub, &dst_parsed);
            }),
            true,
            SuppressPolicy::default(),
            0.0,
            false,
        )
    }

    pub fn add_word(
        &self,
        word: &str,
        triggers: &[&str],
        match_suffix: bool,
        case_sensitive: bool,
        timeout: f64,
        callback: Box<dyn FnMut() + Send>,
    ) -> WordId {
        self.words.add_word(word, triggers, match_suffix, case_sensitive, timeout, callback)
    }

    pub fn add_abbreviation(
        &self,
        word: &str,
        replacement: &str,
        triggers: &[&str],
        case_sensitive: bool,
    ) -> WordId {
        self.words.add_abbreviation(self.hub.clone(), word, replacement, triggers, case_sensitive)
    }

    pub fn remove_word(&self, id: WordId) -> bool {
        self.words.remove(id)
    }

    pub fn press(&self, hotkey: &str) -> Result<()> {
        send::press(&self.hub, &self.parse(hotkey)?)
    }

    pub fn release(&self, hotkey: &str) -> Result<()> {
        send::release(&self.hub, &self.parse(hotkey)?)
    }

    pub fn send(&self, hotkey: &str) -> Result<()> {
        send::send(&self.hub, &self.parse(hotkey)?)
    }

    pub fn write(&self, text: &str, delay: f64, restore_state_after: bool, exact: bool) -> Result<()> {
        send::write(&self.hub, text, delay, restore_state_after, exact)
    }

    pub fn record(&self, until: &str) -> Result<Vec<Event>> {
        let parsed = self.parse(until)?;
        record::record(&self.hub, &self.matcher, &parsed)
    }

    pub fn play(&self, events: &[Event], speed_factor: f64) -> Result<()> {
        record::play(&self.hub, events, speed_factor)
    }

    /// Textual form a hotkey round-trips to; a left inverse of `parse` for
    /// single-step hotkeys modulo alias normalization.
    pub fn get_hotkey_name(&self, hotkey: &str) -> Result<String> {
        let parsed = self.parse(hotkey)?;
        let table = self.hub.names();
        let table = table.read();
        Ok(hotkey::serialize_hotkey(&table, &parsed))
    }

    /// Block until `hotkey` fires once, or until `timeout` elapses.
    /// Implemented as a transient registration that signals a condvar.
    pub fn wait_for_hotkey(&self, hotkey: &str, timeout: Option<Duration>) -> Result<bool> {
        let pair = Arc::new((Mutex::new(false), Condvar::new()));
        let pair_clone = pair.clone();
        let id = self.add_hotkey(
            hotkey,
            Box::new(move || {
                let (done, cvar) = &*pair_clone;
                *done.lock().unwrap() = true;
                cvar.notify_all();
            }),
            false,
            SuppressPolicy::default(),
            f64::INFINITY,
            false,
        )?;

        let (done, cvar) = &*pair;
        let mut guard = done.lock().unwrap();
        let fired = match timeout {
            Some(d) => {
                let (g, result) = cvar
                    .wait_timeout_while(guard, d, |done| !*done)
                    .map_err(|_| KeyhookError::Timeout(hotkey.to_string()))?;
                guard = g;
                !result.timed_out()
            }
            None => {
                while !*guard {
                    guard = cvar.wait(guard).map_err(|_| KeyhookError::Timeout(hotkey.to_string()))?;
                }
                true
            }
        };
        drop(guard);

        self.remove_hotkey(id);
        Ok(fired)
    }

    pub fn shutdown(&self) -> Result<()> {
        Ok(self.hub.shutdown()?)
    }
}

static ENGINE: OnceLock<Engine> = OnceLock::new();

/// Initialize the process-wide singleton with the platform's default
/// backend. Returns the existing engine if already initialized.
pub fn init_default() -> Result<&'static Engine> {
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }
    let engine = Engine::new_default()?;
    Ok(ENGINE.get_or_init(|| engine))
}

/// Initialize the process-wide singleton with a caller-supplied backend
/// (e.g. [`crate::backend::fake::FakeBackend`] in tests).
pub fn init_with_backend(backend: Box<dyn Backend>) -> Result<&'static Engine> {
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }
    let engine = Engine::new(backend)?;
    Ok(ENGINE.get_or_init(|| engine))
}

/// The process-wide engine, panicking if nothing has initialized it yet.
pub fn engine() -> &'static Engine {
    ENGINE.get().expect("keyhook engine not initialized; call init_default() or init_with_backend() first")
}
