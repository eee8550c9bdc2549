//! Key-identity resolver: resolves one user-supplied token to
//! the set of scan codes that can satisfy it.

use crate::error::KeyError;
use crate::event::ScanCode;
use crate::names::NameTable;

/// The unordered set of scan codes any of which satisfies one key token.
pub type KeyClass = Vec<ScanCode>;

/// Resolve one token:
/// - a non-negative integer is a literal scan code,
/// - a single character is resolved via the name table after lowercasing,
/// - anything else is a canonical or alias name.
///
/// Fails if the token resolves to an empty set; use
/// [`resolve_token_best_effort`] when that should be tolerated instead.
pub fn resolve_token(table: &NameTable, token: &str) -> Result<KeyClass, KeyError> {
    resolve_token_best_effort(table, token).ok_or_else(|| KeyError::UnknownKey(token.to_string()))
}

/// Same resolution rule as [`resolve_token`], but returns `None` instead of
/// erroring on an empty result.
pub fn resolve_token_best_effort(table: &NameTable, token: &str) -> Option<KeyClass> {
    if let Ok(code) = token.parse::<ScanCode>() {
        return Some(vec![code]);
    }

    let lookup_key = if token.chars().count() == 1 {
        token.to_lowercase()
    } else {
        token.to_string()
    };

    let codes = table.lookup(&lookup_key);
    if codes.is_empty() {
        None
    } else {
        Some(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> NameTable {
        NameTable::build(
            vec![
                (29, "left ctrl".to_string(), false),
                (97, "right ctrl".to_string(), false),
                (30, "a".to_string(), false),
            ],
            vec![],
        )
    }

    #[test]
    fn integer_token_is_a_literal_scan_code() {
        let t = table();
        assert_eq!(resolve_token(&t, "999").unwrap(), vec![999]);
    }

    #[test]
    fn single_char_token_is_lowercased_before_lookup() {
        let t = table();
        assert_eq!(resolve_token(&t, "A").unwrap(), vec![30]);
        assert_eq!(resolve_token(&t, "a").unwrap(), vec![30]);
    }

    #[test]
    fn multi_char_alias_resolves_through_the_name_table() {
        let t = table();
        let mut codes = resolve_token(&t, "control").unwrap();
        codes.sort_unstable();
        assert_eq!(codes, vec![29, 97]);
    }

    #[test]
    fn unknown_token_fails_unless_best_effort() {
        let t = table();
        assert!(resolve_token(&t, "nonexistent").is_err());
        assert!(resolve_token_best_effort(&t, "nonexistent").is_none());
    }
}
