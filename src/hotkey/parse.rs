//! Hotkey parser.
//!
//! ```text
//! HOTKEY := STEP ( "," STEP )*
//! STEP   := KEY  ( "+" KEY )*
//! KEY    := literal-name | literal-scan-code | escaped-special
//! ```
//!
//! Whitespace around `,` and `+` is insignificant. `plus`, `comma`, and
//! `space` are alias entries in [`crate::names`] for `+`, `,`, and ` `, so
//! they resolve through the ordinary key-token path rather than needing
//! special-casing here.

use crate::error::ParseError;
use crate::event::ScanCode;
use crate::keys::{self, KeyClass};
use crate::names::NameTable;

/// The unordered set of [`KeyClass`]es that must be simultaneously held for
/// one step to qualify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step(pub Vec<KeyClass>);

impl Step {
    /// Every combination is one concrete scan code per `KeyClass`, the
    /// Cartesian product of the step's key classes.
    pub fn combinations(&self) -> Vec<Vec<ScanCode>> {
        let mut combos: Vec<Vec<ScanCode>> = vec![vec![]];
        for class in &self.0 {
            let mut next = Vec::with_capacity(combos.len() * class.len());
            for combo in &combos {
                for &code in class {
                    let mut extended = combo.clone();
                    extended.push(code);
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos
    }
}

/// Ordered list of [`Step`]s: a hotkey completes when each fires in order
/// within `timeout` of the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey(pub Vec<Step>);

impl Hotkey {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A literal scan code, or a flat list of scan codes, is accepted as a
    /// one-step hotkey without going through the string grammar.
    pub fn from_scan_codes(codes: &[ScanCode]) -> Hotkey {
        Hotkey(vec![Step(codes.iter().map(|&c| vec![c]).collect())])
    }
}

/// Compile a hotkey string into a [`Hotkey`].
pub fn parse_hotkey(table: &NameTable, text: &str) -> Result<Hotkey, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut steps = Vec::new();
    for raw_step in text.split(',') {
        let raw_step = raw_step.trim();
        if raw_step.is_empty() {
            return Err(ParseError::EmptyStep);
        }

        let mut classes = Vec::new();
        for raw_key in raw_step.split('+') {
            let raw_key = raw_key.trim();
            if raw_key.is_empty() {
                return Err(ParseError::EmptyKey);
            }
            let class = keys::resolve_token(table, raw_key)
                .map_err(|_| ParseError::UnknownKey(raw_key.to_string()))?;
            classes.push(class);
        }
        steps.push(Step(classes));
    }

    Ok(Hotkey(steps))
}

/// Serialize a [`Hotkey`] back to its canonical textual form, used by
/// [`crate::engine::Engine::get_hotkey_name`] and by tests asserting that
/// `parse(serialize(parse(text))) == parse(text)`.
///
/// Each `KeyClass` is rendered using [`NameTable::name_for_key_class`], so a
/// sided-union class round-trips to the bare name it was parsed from.
pub fn serialize_hotkey(table: &NameTable, hotkey: &Hotkey) -> String {
    hotkey
        .0
        .iter()
        .map(|step| {
            step.0
                .iter()
                .map(|class| {
                    table
                        .name_for_key_class(class)
                        .unwrap_or_else(|| "?".to_string())
                })
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>()
        .join(", ")
}
