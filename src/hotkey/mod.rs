//! Hotkey compilation (parser) and recognition (matcher).

pub mod matcher;
pub mod parse;

pub use matcher::{HotkeyId, Matcher, SuppressPolicy};
pub use parse::{parse_hotkey, serialize_hotkey, Hotkey, Step};
