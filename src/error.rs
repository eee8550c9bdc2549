//! Error types for keyhook
//!
//! Uses thiserror for ergonomic error definitions, grouped by subsystem the
//! same way the source this crate grew out of groups its own errors.

use thiserror::Error;

/// Top-level error type for the keyhook engine and CLI.
#[derive(Error, Debug)]
pub enum KeyhookError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out waiting for {0}")]
    Timeout(String),
}

/// Errors from the key-identity resolver and name table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("unknown key name: '{0}'")]
    UnknownKey(String),
}

/// Errors from the hotkey parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty hotkey string")]
    Empty,

    #[error("empty step in hotkey (two consecutive ',' or leading/trailing ',')")]
    EmptyStep,

    #[error("empty key token in step (two consecutive '+' or leading/trailing '+')")]
    EmptyKey,

    #[error("unknown key '{0}' in hotkey")]
    UnknownKey(String),
}

/// Errors raised when an OS backend cannot be installed or used.
///
/// `Unavailable` is raised synchronously on the caller's thread on first
/// hook registration, never on the hub thread.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("no keyboard device found")]
    NoKeyboard,

    #[error("failed to synthesize event: {0}")]
    InjectionFailed(String),
}

/// Result type alias using [`KeyhookError`].
pub type Result<T> = std::result::Result<T, KeyhookError>;

#[cfg(target_os = "linux")]
impl From<evdev::Error> for BackendError {
    fn from(e: evdev::Error) -> Self {
        BackendError::Unavailable(e.to_string())
    }
}
