//! Command-line surface: `clap` derive definitions for the `keyhook` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "keyhook", version, about = "Cross-platform global keyboard hook, hotkey, and text-injection engine")]
pub struct Cli {
    /// Increase log verbosity; repeat for more (-v debug, -vv trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output below warn level.
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to config.toml, overriding the platform default location.
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the default backend's hook and stream every observed event as
    /// a line of JSON to stdout until interrupted.
    Listen {
        /// Input device path override, passed straight to the backend.
        #[arg(long)]
        device: Option<String>,
    },

    /// Record events until `until` fires, then write them as a JSON array.
    Record {
        /// Hotkey text that stops the recording, e.g. "esc".
        until: String,

        /// Write to this file instead of stdout.
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Replay a JSON array of events previously produced by `record`.
    Replay {
        /// Path to a file written by `keyhook record`.
        file: PathBuf,

        /// Playback speed multiplier; 0 disables all inter-event delay.
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },

    /// Register one hotkey that runs a shell command while `keyhook` keeps
    /// running, e.g. `keyhook hotkey "ctrl+alt+t" -- alacritty`.
    Hotkey {
        /// Hotkey text, e.g. "ctrl+shift+a" or "ctrl+k, c" for a sequence.
        spec: String,

        /// Suppress the hotkey from reaching other applications.
        #[arg(long)]
        suppress: bool,

        /// Command and arguments to run when the hotkey fires.
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Print every canonical key name the active backend reports, one per
    /// line, alongside the scan codes it resolves to.
    Names,

    /// Inspect or initialize the layered configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (defaults + file + environment) as TOML.
    Show,

    /// Write the built-in default configuration to the platform config path,
    /// without overwriting an existing file.
    Init,
}
