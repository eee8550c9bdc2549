//! Layered configuration: built-in defaults, then `~/.config/keyhook/
//! config.toml` (via [`directories::ProjectDirs`]), then `KEYHOOK_*`
//! environment overrides, then CLI flags — each layer only overriding what
//! the previous one set.

use crate::error::{KeyhookError, Result};
use crate::hotkey::SuppressPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The `config.toml` written by `keyhook config --init` and loaded on every
/// other invocation, if present.
pub const DEFAULT_CONFIG: &str = r#"# keyhook configuration

[hotkeys]
# Default behavior for every registration unless overridden per-hotkey.
suppress_policy = "whole-sequence"
timeout = 0.5
case_sensitive_words = false

[backend]
# Path to a user alias file layered on top of the built-in name table.
# alias_file = "/home/me/.config/keyhook/aliases.toml"

[log]
level = "info"
"#;

/// `SuppressPolicy::LastStepOnly` or `SuppressPolicy::WholeSequence`,
/// loaded from `hotkeys.suppress_policy`.
fn default_suppress_policy() -> SuppressPolicy {
    SuppressPolicy::WholeSequence
}

fn default_timeout() -> f64 {
    0.5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    #[serde(with = "suppress_policy_serde")]
    pub suppress_policy: SuppressPolicy,
    pub timeout: f64,
    pub case_sensitive_words: bool,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        HotkeyConfig {
            suppress_policy: default_suppress_policy(),
            timeout: default_timeout(),
            case_sensitive_words: false,
        }
    }
}

mod suppress_policy_serde {
    use crate::hotkey::SuppressPolicy;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(policy: &SuppressPolicy, s: S) -> Result<S::Ok, S::Error> {
        let text = match policy {
            SuppressPolicy::LastStepOnly => "last-step-only",
            SuppressPolicy::WholeSequence => "whole-sequence",
        };
        s.serialize_str(text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SuppressPolicy, D::Error> {
        let text = String::deserialize(d)?;
        match text.as_str() {
            "last-step-only" => Ok(SuppressPolicy::LastStepOnly),
            "whole-sequence" => Ok(SuppressPolicy::WholeSequence),
            other => Err(serde::de::Error::custom(format!(
                "unknown suppress_policy '{other}', expected 'last-step-only' or 'whole-sequence'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Overrides the JSON-stream device used when the evdev backend is asked
    /// to pick one non-interactively (see `keyhook listen --device`).
    pub device: Option<String>,
    /// Extra alias-file path layered on top of the built-in alias table;
    /// later entries win over the defaults, see [`crate::names::NameTable::build`].
    pub alias_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hotkeys: HotkeyConfig,
    pub backend: BackendConfig,
    pub log: LogConfig,
}

impl Config {
    /// `~/.config/keyhook` (or platform equivalent), via `directories`.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "keyhook")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load from `path` if given, else the default path if it exists, else
    /// built-in defaults; then apply `KEYHOOK_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut config = match resolved {
            Some(path) => {
                let text = std::fs::read_to_string(&path)?;
                toml::from_str(&text).map_err(|e| {
                    KeyhookError::Config(format!("{}: {e}", path.display()))
                })?
            }
            None => Config::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// `KEYHOOK_SUPPRESS_POLICY`, `KEYHOOK_TIMEOUT`, `KEYHOOK_LOG`,
    /// `KEYHOOK_ALIAS_FILE`, `KEYHOOK_DEVICE` — each wins over whatever the
    /// file or defaults set, and each is independently optional.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("KEYHOOK_SUPPRESS_POLICY") {
            if let Ok(policy) = parse_suppress_policy(&v) {
                self.hotkeys.suppress_policy = policy;
            }
        }
        if let Ok(v) = std::env::var("KEYHOOK_TIMEOUT") {
            if let Ok(t) = v.parse() {
                self.hotkeys.timeout = t;
            }
        }
        if let Ok(v) = std::env::var("KEYHOOK_LOG") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("KEYHOOK_ALIAS_FILE") {
            self.backend.alias_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("KEYHOOK_DEVICE") {
            self.backend.device = Some(v);
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| KeyhookError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// The extra alias entries to layer on the built-in table, read from
    /// `backend.alias_file` if set.
    pub fn extra_aliases(&self) -> Result<Vec<(String, String)>> {
        let Some(path) = &self.backend.alias_file else {
            return Ok(Vec::new());
        };
        let text = std::fs::read_to_string(path)?;
        #[derive(Deserialize)]
        struct AliasFile {
            aliases: std::collections::HashMap<String, String>,
        }
        let file: AliasFile = toml::from_str(&text)
            .map_err(|e| KeyhookError::Config(format!("{}: {e}", path.display())))?;
        Ok(file.aliases.into_iter().collect())
    }
}

fn parse_suppress_policy(text: &str) -> Result<SuppressPolicy> {
    match text {
        "last-step-only" => Ok(SuppressPolicy::LastStepOnly),
        "whole-sequence" => Ok(SuppressPolicy::WholeSequence),
        other => Err(KeyhookError::Config(format!(
            "unknown suppress policy '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_whole_sequence_suppression() {
        let config = Config::default();
        assert_eq!(config.hotkeys.suppress_policy, SuppressPolicy::WholeSequence);
        assert_eq!(config.hotkeys.timeout, 0.5);
        assert!(!config.hotkeys.case_sensitive_words);
    }

    #[test]
    fn parses_embedded_default_config_toml() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.hotkeys.suppress_policy, SuppressPolicy::WholeSequence);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn parses_last_step_only_policy() {
        let toml_str = r#"
            [hotkeys]
            suppress_policy = "last-step-only"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hotkeys.suppress_policy, SuppressPolicy::LastStepOnly);
    }

    #[test]
    fn rejects_unknown_suppress_policy() {
        let toml_str = r#"
            [hotkeys]
            suppress_policy = "sometimes"
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.hotkeys.timeout, 0.5);
        assert!(config.backend.alias_file.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.hotkeys.timeout = 1.25;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.hotkeys.timeout, 1.25);
    }

    #[test]
    fn env_override_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save(&path).unwrap();

        std::env::set_var("KEYHOOK_TIMEOUT", "2.0");
        let loaded = Config::load(Some(&path)).unwrap();
        std::env::remove_var("KEYHOOK_TIMEOUT");

        assert_eq!(loaded.hotkeys.timeout, 2.0);
    }

    #[test]
    fn extra_aliases_reads_the_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let alias_path = dir.path().join("aliases.toml");
        std::fs::write(&alias_path, "[aliases]\nfoo = \"a\"\n").unwrap();

        let mut config = Config::default();
        config.backend.alias_file = Some(alias_path);
        let aliases = config.extra_aliases().unwrap();
        assert_eq!(aliases, vec![("foo".to_string(), "a".to_string())]);
    }
}
