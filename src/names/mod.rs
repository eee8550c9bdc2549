//! Canonical name table: bidirectional alias/canonical-form
//! mapping for key identifiers, built once from a backend's mapping plus a
//! static alias file.

use crate::event::ScanCode;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static DEFAULT_ALIASES_TOML: &str = include_str!("default_aliases.toml");

#[derive(serde::Deserialize)]
struct AliasFile {
    aliases: HashMap<String, String>,
}

static DEFAULT_ALIASES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    toml::from_str::<AliasFile>(DEFAULT_ALIASES_TOML)
        .expect("default_aliases.toml is checked in and must parse")
        .aliases
});

/// One physical-key name as reported for a scan code, in first-observed order.
#[derive(Debug, Clone)]
struct NameEntry {
    name: String,
    is_keypad: bool,
}

/// Bidirectional name table: every key has a canonical name and any number
/// of aliases, and every name resolves to one or more scan codes.
///
/// Lifetime: process, rebuilt wholesale on [`NameTable::reload`].
pub struct NameTable {
    aliases: HashMap<String, String>,
    canonical_to_codes: HashMap<String, Vec<ScanCode>>,
    code_to_names: HashMap<ScanCode, Vec<NameEntry>>,
}

/// `(scan_code, canonical_name, is_keypad)`, as produced by
/// [`crate::backend::Backend::mapping`].
pub type MappingEntry = (ScanCode, String, bool);

fn is_sided(name: &str) -> bool {
    name.starts_with("left ") || name.starts_with("right ")
}

fn strip_side(name: &str) -> String {
    name.strip_prefix("left ")
        .or_else(|| name.strip_prefix("right "))
        .unwrap_or(name)
        .to_string()
}

/// Prefer the unsided name, then the shorter one, breaking remaining ties
/// alphabetically so the choice is deterministic.
fn pick_preferred_class_name<'a>(a: &'a str, b: &'a str) -> &'a str {
    match (is_sided(a), is_sided(b)) {
        (false, true) => a,
        (true, false) => b,
        _ => match a.len().cmp(&b.len()) {
            std::cmp::Ordering::Less => a,
            std::cmp::Ordering::Greater => b,
            std::cmp::Ordering::Equal => a.min(b),
        },
    }
}

/// Navigation names that should be preferred over their keypad-origin
/// namesakes when both map to the same scan code.
const PREFER_NAV_OVER_KEYPAD: &[&str] = &["home", "end", "page up", "page down"];

impl NameTable {
    /// Build from a backend's mapping plus the built-in alias file.
    ///
    /// `extra_aliases` lets a caller layer a user override file on top of the
    /// defaults; later entries win.
    pub fn build(
        mapping: impl IntoIterator<Item = MappingEntry>,
        extra_aliases: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut aliases = DEFAULT_ALIASES.clone();
        aliases.extend(extra_aliases);

        let mut canonical_to_codes: HashMap<String, Vec<ScanCode>> = HashMap::new();
        let mut code_to_names: HashMap<ScanCode, Vec<NameEntry>> = HashMap::new();

        for (code, raw_name, is_keypad) in mapping {
            let canonical = normalize(&raw_name, &aliases);

            canonical_to_codes
                .entry(canonical.clone())
                .or_default()
                .push(code);

            // A sided modifier also satisfies its bare form: "ctrl" resolves
            // to the union of "left ctrl" and "right ctrl" scan codes. The sided name itself stays a first-
            // class canonical entry for callers that want sidedness.
            if let Some(bare) = canonical
                .strip_prefix("left ")
                .or_else(|| canonical.strip_prefix("right "))
            {
                let entry = canonical_to_codes.entry(bare.to_string()).or_default();
                if !entry.contains(&code) {
                    entry.push(code);
                }
            }

            code_to_names
                .entry(code)
                .or_default()
                .push(NameEntry {
                    name: canonical,
                    is_keypad,
                });
        }

        NameTable {
            aliases,
            canonical_to_codes,
            code_to_names,
        }
    }

    /// Rebuild in place from a fresh mapping, keeping any alias overrides.
    pub fn reload(
        &mut self,
        mapping: impl IntoIterator<Item = MappingEntry>,
    ) {
        let rebuilt = NameTable::build(mapping, self.aliases.clone());
        *self = rebuilt;
    }

    /// Normalize a raw name the same way the table does internally. Exposed
    /// so the parser and resolver never have to duplicate the rule.
    pub fn normalize(&self, raw: &str) -> String {
        normalize(raw, &self.aliases)
    }

    /// Forward lookup: name → scan codes, in first-observed order.
    ///
    /// Unknown names return an empty list.
    pub fn lookup(&self, name: &str) -> Vec<ScanCode> {
        let canonical = self.normalize(name);
        self.canonical_to_codes
            .get(&canonical)
            .cloned()
            .unwrap_or_default()
    }

    /// Reverse lookup: scan code → preferred name.
    ///
    /// Prefers a non-sided name unless `prefer_sided` is set, and prefers a
    /// navigation name over a keypad-origin one for home/page up/page
    /// down/end. When `prefer_sided` is false and the code only has a sided
    /// name registered (e.g. 29 only ever reports as "left ctrl"), the side
    /// is stripped so the bare modifier name ("ctrl") is reported, matching
    /// how a bare modifier token is expected to round-trip.
    pub fn name_for(&self, code: ScanCode, prefer_sided: bool) -> Option<String> {
        let entries = self.code_to_names.get(&code)?;

        let candidates = |want_sided: bool| {
            entries
                .iter()
                .filter(move |e| is_sided(&e.name) == want_sided)
        };

        let pool: Vec<&NameEntry> = if prefer_sided {
            candidates(true).chain(candidates(false)).collect()
        } else {
            candidates(false).chain(candidates(true)).collect()
        };
        let pool = if pool.is_empty() {
            entries.iter().collect::<Vec<_>>()
        } else {
            pool
        };

        pool.iter()
            .find(|e| !e.is_keypad && PREFER_NAV_OVER_KEYPAD.contains(&e.name.as_str()))
            .or_else(|| pool.first().copied())
            .map(|e| {
                if !prefer_sided && is_sided(&e.name) {
                    strip_side(&e.name)
                } else {
                    e.name.clone()
                }
            })
    }

    /// Preferred name for a whole [`crate::keys::KeyClass`], e.g. the set
    /// `{left-ctrl-code, right-ctrl-code}` should round-trip as `"ctrl"`
    /// rather than as one scan code's reverse-lookup name.
    ///
    /// Used by [`crate::hotkey::serialize_hotkey`] so a sided-union class
    /// serializes back to the bare name it was parsed from.
    pub fn name_for_key_class(&self, codes: &[ScanCode]) -> Option<String> {
        let mut wanted: Vec<ScanCode> = codes.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let mut best: Option<&str> = None;
        for (name, list) in &self.canonical_to_codes {
            let mut candidate = list.clone();
            candidate.sort_unstable();
            candidate.dedup();
            if candidate != wanted {
                continue;
            }
            best = Some(match best {
                None => name.as_str(),
                Some(cur) => pick_preferred_class_name(cur, name),
            });
        }

        best.map(str::to_string)
            .or_else(|| wanted.first().and_then(|&c| self.name_for(c, false)))
    }

    /// Whether `code`'s preferred name denotes a modifier key (ctrl/alt/
    /// shift/windows, sided or not). Used by `send` to order the stash.
    pub fn is_modifier(&self, code: ScanCode) -> bool {
        match self.name_for(code, true) {
            Some(name) => {
                let bare = name.strip_prefix("left ").or(name.strip_prefix("right "));
                let bare = bare.unwrap_or(&name);
                matches!(bare, "ctrl" | "alt" | "shift" | "windows")
            }
            None => false,
        }
    }

    /// All canonical names currently known, for `keyhook names`.
    pub fn canonical_names(&self) -> Vec<&str> {
        self.canonical_to_codes.keys().map(|s| s.as_str()).collect()
    }
}

/// Normalization rule: lowercase; trim; collapse internal
/// whitespace to single spaces; strip trailing platform decorations such as
/// " (numeric pad)"; alias-replace.
fn normalize(raw: &str, aliases: &HashMap<String, String>) -> String {
    let lower = raw.to_lowercase();
    let trimmed = lower.trim();

    let mut collapsed = String::with_capacity(trimmed.len());
    let mut prev_space = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                collapsed.push(' ');
            }
            prev_space = true;
        } else {
            collapsed.push(ch);
            prev_space = false;
        }
    }

    const DECORATIONS: &[&str] = &[" (numeric pad)", " (keypad)"];
    let mut stripped = collapsed.as_str();
    for suffix in DECORATIONS {
        if let Some(s) = stripped.strip_suffix(suffix) {
            stripped = s;
        }
    }

    match aliases.get(stripped) {
        Some(canonical) => canonical.clone(),
        None => stripped.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> NameTable {
        NameTable::build(
            vec![
                (29, "left ctrl".to_string(), false),
                (97, "right ctrl".to_string(), false),
                (42, "left shift".to_string(), false),
                (30, "a".to_string(), false),
                (57, "space".to_string(), false),
                (102, "home".to_string(), false),
                (71, "home (numeric pad)".to_string(), true),
                (104, "page up".to_string(), false),
                (73, "page up (numeric pad)".to_string(), true),
            ],
            vec![],
        )
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        let table = sample_table();
        assert_eq!(table.normalize("  A  "), "a");
        assert_eq!(table.normalize("Left   Ctrl"), "left ctrl");
    }

    #[test]
    fn alias_replacement_is_driven_entirely_by_the_table() {
        let table = sample_table();
        assert_eq!(table.normalize("control"), "ctrl");
        assert_eq!(table.normalize("Escape"), "esc");
        assert_eq!(table.normalize("PGUP"), "page up");
    }

    #[test]
    fn bare_modifier_name_aggregates_both_sides() {
        let table = sample_table();
        let mut codes = table.lookup("ctrl");
        codes.sort_unstable();
        assert_eq!(codes, vec![29, 97]);
    }

    #[test]
    fn forward_lookup_roundtrips_with_reverse_lookup() {
        let table = sample_table();
        let codes = table.lookup("left ctrl");
        assert_eq!(codes, vec![29]);
        assert_eq!(table.name_for(29, true).as_deref(), Some("left ctrl"));
    }

    #[test]
    fn reverse_lookup_strips_side_when_only_a_sided_name_is_registered() {
        let table = sample_table();
        assert_eq!(table.name_for(29, false).as_deref(), Some("ctrl"));
        assert_eq!(table.name_for(42, false).as_deref(), Some("shift"));
    }

    #[test]
    fn unknown_name_returns_empty_list() {
        let table = sample_table();
        assert!(table.lookup("nonexistent key").is_empty());
    }

    #[test]
    fn home_prefers_navigation_name_over_keypad_origin() {
        let table = sample_table();
        assert_eq!(table.name_for(102, false).as_deref(), Some("home"));
        assert_eq!(table.name_for(104, false).as_deref(), Some("page up"));
    }

    #[test]
    fn dual_named_key_prefers_nav_name_when_a_keypad_name_is_also_registered() {
        // A backend reporting the same physical key under both its keypad
        // digit name and its navigation name (numlock off) must still report
        // the navigation name back, regardless of observation order.
        let table = NameTable::build(
            vec![
                (200, "num 9".to_string(), true),
                (200, "page up".to_string(), false),
            ],
            vec![],
        );
        assert_eq!(table.name_for(200, false).as_deref(), Some("page up"));
    }

    #[test]
    fn is_modifier_recognizes_sided_and_bare_forms() {
        let table = sample_table();
        assert!(table.is_modifier(29));
        assert!(!table.is_modifier(30));
    }

    #[test]
    fn reload_rebuilds_while_keeping_alias_overrides() {
        let mut table = NameTable::build(
            vec![(30, "a".to_string(), false)],
            vec![("foo".to_string(), "b".to_string())],
        );
        assert!(table.lookup("foo").is_empty());
        table.reload(vec![(31, "b".to_string(), false)]);
        assert_eq!(table.lookup("a"), Vec::<ScanCode>::new());
        assert_eq!(table.lookup("foo"), vec![31]);
    }
}
