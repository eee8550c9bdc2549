//! Linux backend: reads physical key events from `/dev/input/event*` via the
//! `evdev` crate, and synthesizes events by shelling out to `ydotool`
//! (uinput-backed, works under any Wayland compositor without a
//! compositor-specific protocol).
//!
//! Device enumeration and non-blocking event capture mirror the approach a
//! Linux push-to-talk daemon takes to find the keyboard without requiring a
//! window-manager-specific global-hotkey API; injection reuses the same
//! `ydotool key <code>:<0|1>` / `ydotool type` invocations such a daemon uses
//! for key-hold and Unicode text output, since both need the same uinput
//! device underneath.

use super::{Backend, HookCallback, HookHandle};
use crate::error::BackendError;
use crate::event::{Event, EventType, ScanCode};
use crate::names::MappingEntry;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// One opened input device kept open for the lifetime of the hook.
struct OpenDevice {
    device: evdev::Device,
    path: std::path::PathBuf,
}

fn monotonic_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Enumerate `/dev/input/event*` nodes that advertise at least one
/// alphabetic key, which is how a keyboard (as opposed to a mouse or a
/// lid-switch) is told apart.
fn find_keyboards() -> Result<Vec<OpenDevice>, BackendError> {
    let mut found = Vec::new();
    for (path, device) in evdev::enumerate() {
        let has_keys = device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::KEY_A))
            .unwrap_or(false);
        if has_keys {
            found.push(OpenDevice { device, path });
        }
    }
    if found.is_empty() {
        return Err(BackendError::NoKeyboard);
    }
    Ok(found)
}

fn mapping_from_device(device: &evdev::Device) -> Vec<MappingEntry> {
    let mut entries = Vec::new();
    if let Some(keys) = device.supported_keys() {
        for key in keys.iter() {
            let code = key.code() as ScanCode;
            let name = format!("{key:?}")
                .trim_start_matches("KEY_")
                .to_lowercase()
                .replace('_', " ");
            entries.push((code, name, is_keypad_key(key)));
        }
    }
    entries
}

fn is_keypad_key(key: evdev::Key) -> bool {
    matches!(format!("{key:?}").as_str(), k if k.starts_with("KEY_KP"))
}

/// A real Linux keyboard backend: evdev for capture, `ydotool` for synthesis.
pub struct EvdevBackend {
    devices: Vec<OpenDevice>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl EvdevBackend {
    pub fn new() -> Result<Self, BackendError> {
        Ok(EvdevBackend {
            devices: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }
}

impl Backend for EvdevBackend {
    fn init(&mut self) -> Result<(), BackendError> {
        self.devices = find_keyboards().map_err(|e| match e {
            BackendError::NoKeyboard => {
                BackendError::DeviceAccess("no readable /dev/input/event* keyboard node".into())
            }
            other => other,
        })?;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), BackendError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        Ok(())
    }

    fn mapping(&self) -> Vec<MappingEntry> {
        self.devices
            .iter()
            .flat_map(|d| mapping_from_device(&d.device))
            .collect()
    }

    fn install_hook(&mut self, mut on_event: HookCallback) -> Result<HookHandle, BackendError> {
        if self.devices.is_empty() {
            self.init()?;
        }

        let mut devices = std::mem::take(&mut self.devices);
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let start = Instant::now();

        let worker = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                for open in devices.iter_mut() {
                    let events = match open.device.fetch_events() {
                        Ok(events) => events,
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => continue,
                        Err(_) => continue,
                    };
                    for ev in events {
                        if ev.event_type() != evdev::EventType::KEY {
                            continue;
                        }
                        let event_type = match ev.value() {
                            1 => EventType::Down,
                            0 => EventType::Up,
                            _ => continue, // autorepeat (value 2) carries no new state
                        };
                        let mut out = Event::new(event_type, ev.code() as ScanCode, monotonic_seconds());
                        out.time = start.elapsed().as_secs_f64();
                        let _ = on_event(out);
                    }
                }
                std::thread::sleep(std::time::Duration::from_millis(2));
            }
        });
        self.worker = Some(worker);

        Ok(HookHandle(1))
    }

    fn uninstall_hook(&mut self, _handle: HookHandle) -> Result<(), BackendError> {
        self.shutdown()
    }

    fn press(&self, scan_code: ScanCode) -> Result<(), BackendError> {
        run_ydotool_key(scan_code, true)
    }

    fn release(&self, scan_code: ScanCode) -> Result<(), BackendError> {
        run_ydotool_key(scan_code, false)
    }

    fn type_unicode(&self, codepoint: char) -> Result<(), BackendError> {
        let mut buf = [0u8; 4];
        let text = codepoint.encode_utf8(&mut buf);
        let output = std::process::Command::new("ydotool")
            .arg("type")
            .arg("--")
            .arg(&*text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| BackendError::InjectionFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(BackendError::InjectionFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }

    fn tag_injected(&self) -> bool {
        // ydotool synthesizes through the same uinput device evdev reads
        // back from, so injected and physical key-down events are
        // indistinguishable on the wire; the hub must rely on its own
        // bookkeeping around `send`/`write` calls instead.
        false
    }
}

fn run_ydotool_key(scan_code: ScanCode, down: bool) -> Result<(), BackendError> {
    let arg = format!("{}:{}", scan_code, if down { 1 } else { 0 });
    let output = std::process::Command::new("ydotool")
        .arg("key")
        .arg(&arg)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| BackendError::InjectionFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(BackendError::InjectionFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }
    Ok(())
}
