//! The `Backend` trait: the one seam between the engine and an OS.
//!
//! Every other module in this crate (`names`, `keys`, `hotkey`, `hub`,
//! `send`, `record`, `word`, `reconstruct`, `engine`) depends only on this
//! trait object, never on a concrete platform. That is what makes the fake
//! backend in [`fake`] a faithful stand-in for tests.

pub mod fake;

#[cfg(target_os = "linux")]
pub mod evdev;

use crate::error::BackendError;
use crate::event::{Event, ScanCode};
use crate::names::MappingEntry;

/// A closure invoked with every event observed on the hub thread; returns
/// whether the OS should keep delivering the event to other applications.
pub type HookCallback = Box<dyn FnMut(Event) -> crate::event::SuppressionVote + Send>;

/// Opaque handle returned by [`Backend::install_hook`], passed back to
/// [`Backend::uninstall_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(pub u64);

/// The OS-facing capability set the core engine consumes.
///
/// A backend owns exactly one hook thread; `install_hook` is called once per
/// process lifetime by [`crate::hub::Hub`]. Everything else (`press`,
/// `release`, `type_unicode`) may be called from any thread.
pub trait Backend: Send + Sync {
    /// Acquire whatever OS resources the backend needs (device handles,
    /// synthetic-input devices, ...). Called once before the first hook is
    /// installed.
    fn init(&mut self) -> Result<(), BackendError>;

    /// Release OS resources. Called on engine shutdown; a backend that is
    /// never explicitly shut down is torn down on drop instead.
    fn shutdown(&mut self) -> Result<(), BackendError>;

    /// The scan-code/name/is_keypad triples that seed [`crate::names::NameTable`].
    fn mapping(&self) -> Vec<MappingEntry>;

    /// Install the single process-wide hook. `on_event` runs on the
    /// backend's own thread and must not block.
    fn install_hook(&mut self, on_event: HookCallback) -> Result<HookHandle, BackendError>;

    fn uninstall_hook(&mut self, handle: HookHandle) -> Result<(), BackendError>;

    /// Synthesize a single key-down.
    fn press(&self, scan_code: ScanCode) -> Result<(), BackendError>;

    /// Synthesize a single key-up.
    fn release(&self, scan_code: ScanCode) -> Result<(), BackendError>;

    /// Best-effort synthesis of a Unicode codepoint the active layout has no
    /// scan code for.
    fn type_unicode(&self, codepoint: char) -> Result<(), BackendError>;

    /// Whether events this backend injects via `press`/`release` are tagged
    /// so hooks can tell them apart from physical input.
    fn tag_injected(&self) -> bool;
}

/// Build the backend this platform ships by default. Used only by the CLI
/// binary (`main.rs`) and by [`crate::engine::Engine::new_default`); library
/// component code never calls this, it only ever holds a `Box<dyn Backend>`.
pub fn default_backend() -> Result<Box<dyn Backend>, BackendError> {
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(evdev::EvdevBackend::new()?))
    }
    #[cfg(not(target_os = "linux"))]
    {
        Err(BackendError::Unavailable(
            "no default backend is shipped for this platform; construct backend::fake::FakeBackend \
             or supply your own Backend implementation".to_string(),
        ))
    }
}
