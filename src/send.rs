//! Send/state manager: press/release/send synthesis, stash/restore of
//! physically-held keys around a synthetic `write`, and a small
//! shift-symbol table so `write` only falls back to Unicode injection for
//! characters the active layout genuinely can't produce with one modifier.

use crate::error::{KeyhookError, Result};
use crate::event::ScanCode;
use crate::hotkey::{Hotkey, Step};
use crate::hub::Hub;
use crate::keys::{self, KeyClass};
use crate::names::NameTable;
use std::thread::sleep;
use std::time::Duration;

fn step_codes(step: &Step) -> Vec<ScanCode> {
    step.0.iter().map(|class| class[0]).collect()
}

/// Press every step's keys in order, trailing key of each step last.
pub fn press(hub: &Hub, hotkey: &Hotkey) -> Result<()> {
    for step in &hotkey.0 {
        for code in step_codes(step) {
            hub.press(code)?;
        }
    }
    Ok(())
}

/// Release every step's keys in the same order `press` pressed them.
pub fn release(hub: &Hub, hotkey: &Hotkey) -> Result<()> {
    for step in &hotkey.0 {
        for code in step_codes(step) {
            hub.release(code)?;
        }
    }
    Ok(())
}

/// Press then release each step's keys, releasing in reverse of press order.
pub fn send(hub: &Hub, hotkey: &Hotkey) -> Result<()> {
    for step in &hotkey.0 {
        let codes = step_codes(step);
        for &code in &codes {
            hub.press(code)?;
        }
        for &code in codes.iter().rev() {
            hub.release(code)?;
        }
    }
    Ok(())
}

/// Snapshot currently-held keys, release them (modifiers first), and return
/// the release order so [`restore_state`] can reverse it.
pub fn stash_state(hub: &Hub) -> Result<Vec<ScanCode>> {
    let names = hub.names();
    let mut codes: Vec<ScanCode> = hub.pressed().snapshot().into_iter().collect();
    codes.sort_unstable();
    let names = names.read();
    codes.sort_by_key(|&c| !names.is_modifier(c));

    for &code in &codes {
        hub.release(code)?;
    }
    Ok(codes)
}

/// Re-press every scan code from [`stash_state`], in reverse order.
pub fn restore_state(hub: &Hub, stashed: &[ScanCode]) -> Result<()> {
    for &code in stashed.iter().rev() {
        hub.press(code)?;
    }
    Ok(())
}

/// Re-press only the modifier codes from a stash, skipping ordinary keys.
pub fn restore_modifiers(hub: &Hub, stashed: &[ScanCode]) -> Result<()> {
    let names = hub.names();
    let names = names.read();
    for &code in stashed.iter().rev() {
        if names.is_modifier(code) {
            hub.press(code)?;
        }
    }
    Ok(())
}

const SHIFT_SYMBOLS: &[(char, char)] = &[
    ('!', '1'), ('@', '2'), ('#', '3'), ('$', '4'), ('%', '5'),
    ('^', '6'), ('&', '7'), ('*', '8'), ('(', '9'), (')', '0'),
    ('_', '-'), ('+', '='), ('{', '['), ('}', ']'), ('|', '\\'),
    (':', ';'), ('"', '\''), ('<', ','), ('>', '.'), ('?', '/'),
    ('~', '`'),
];

/// A character the layout can produce with at most one modifier, or `None`
/// if it needs the backend's Unicode fallback.
fn resolve_char(names: &NameTable, ch: char) -> Option<(bool, KeyClass)> {
    if ch.is_ascii_uppercase() {
        let class = keys::resolve_token_best_effort(names, &ch.to_ascii_lowercase().to_string())?;
        return Some((true, class));
    }
    if let Some(&(_, base)) = SHIFT_SYMBOLS.iter().find(|(shifted, _)| *shifted == ch) {
        let class = keys::resolve_token_best_effort(names, &base.to_string())?;
        return Some((true, class));
    }
    let token: String = match ch {
        ' ' => "space".to_string(),
        '\t' => "tab".to_string(),
        '\n' => "enter".to_string(),
        other => other.to_string(),
    };
    let class = keys::resolve_token_best_effort(names, &token)?;
    Some((false, class))
}

/// Type arbitrary text, falling back to Unicode injection per character when
/// the layout has no one-modifier way to produce it (`exact=true` forces the
/// fallback for every character).
pub fn write(
    hub: &Hub,
    text: &str,
    delay: f64,
    restore_state_after: bool,
    exact: bool,
) -> Result<()> {
    let stashed = stash_state(hub)?;

    for ch in text.chars() {
        let produced = if exact {
            None
        } else {
            let names = hub.names();
            let names = names.read();
            resolve_char(&names, ch)
        };

        match produced {
            Some((needs_shift, class)) => {
                let code = class[0];
                if needs_shift {
                    let shift_code = *hub
                        .names()
                        .read()
                        .lookup("shift")
                        .first()
                        .ok_or_else(|| KeyhookError::Config("no shift key in name table".into()))?;
                    hub.press(shift_code)?;
                    hub.press(code)?;
                    hub.release(code)?;
                    hub.release(shift_code)?;
                } else {
                    hub.press(code)?;
                    hub.release(code)?;
                }
            }
            None => {
                hub.type_unicode(ch)?;
            }
        }

        if delay > 0.0 {
            sleep(Duration::from_secs_f64(delay));
        }
    }

    if restore_state_after {
        restore_state(hub, &stashed)?;
    }
    Ok(())
}
