//! English singularization for array field names.

use std::sync::LazyLock;

use regex::Regex;

use crate::names::capitalize;

const IRREGULAR: &[(&str, &str)] = &[
    ("children", "child"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("men", "man"),
    ("women", "woman"),
    ("teeth", "tooth"),
    ("feet", "foot"),
    ("data", "datum"),
    ("people", "person"),
];

static IES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[Ii][Ee][Ss]$").unwrap());
static SIBILANT_ES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([Ss]|[Ss][Hh]|[Cc][Hh]|[Xx]|[Zz])[Ee][Ss]$").unwrap());
static GENERIC_ES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[Ee][Ss]$").unwrap());
static PLAIN_S: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^Ss][Ss]$").unwrap());

/// Singular, capitalized form of an English plural.
///
/// `tags` -> `Tag`, `categories` -> `Category`, `boxes` -> `Box`,
/// `people` -> `Person`. Words matching no rule are only capitalized.
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return capitalize(singular);
    }

    let singular = if IES.is_match(word) {
        format!("{}y", &word[..word.len() - 3])
    } else if SIBILANT_ES.is_match(word) || GENERIC_ES.is_match(word) {
        word[..word.len() - 2].to_string()
    } else if PLAIN_S.is_match(word) {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    };
    capitalize(&singular)
}

/// Field-name form of an array property: singular when enabled, else capitalized.
pub fn element_name(word: &str, singularize_enabled: bool) -> String {
    if singularize_enabled {
        singularize(word)
    } else {
        capitalize(word)
    }
}
