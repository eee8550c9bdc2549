//! keyhook: a cross-platform global keyboard hook, hotkey, and
//! text-injection engine.
//!
//! # Architecture
//!
//! ```text
//!                              ┌──────────────┐
//!                              │    Engine    │
//!                              └──────────────┘
//!                                     │
//!                ┌────────────────────┼────────────────────┐
//!                │                    │                     │
//!                ▼                    ▼                     ▼
//!         ┌──────────────┐    ┌──────────────┐     ┌──────────────┐
//!         │     Hub      │    │    Matcher   │     │ WordListener │
//!         │ (dispatch)   │    │  (hotkeys)   │     │ (abbrevs)    │
//!         └──────────────┘    └──────────────┘     └──────────────┘
//!                │
//!                ▼
//!         ┌──────────────┐
//!         │   Backend    │  evdev (Linux) or a caller-supplied impl
//!         └──────────────┘
//! ```
//!
//! Everything above the `Backend` seam is pure Rust and platform-agnostic;
//! [`backend::fake::FakeBackend`] stands in for it in tests.

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod hotkey;
pub mod hub;
pub mod keys;
pub mod names;
pub mod record;
pub mod reconstruct;
pub mod send;
pub mod word;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use engine::Engine;
pub use error::{KeyhookError, Result};
pub use event::{Event, EventType, ScanCode, SuppressionVote};
pub use hotkey::{Hotkey, HotkeyId, Matcher, Step, SuppressPolicy};
pub use hub::{Hub, HookFilter, HookId};
