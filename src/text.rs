use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::parse::cell_text;

const INVISIBLES: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Canonical form for Arabic text cells: NFC, no zero-width characters,
/// trimmed, internal whitespace collapsed to one space.
///
/// Invisible characters are dropped before composition so a second pass
/// never finds a new base + mark pair to compose.
pub fn normalize_text(value: &str) -> String {
    let visible: String = value.chars().filter(|c| !INVISIBLES.contains(c)).collect();
    let composed: String = visible.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `normalize_text` over a raw cell of any JSON type.
pub fn normalize_cell(value: Option<&Value>) -> String {
    normalize_text(&cell_text(value))
}

/// Key used for locale-style ordering: normalized, lowercased, with Arabic
/// diacritics and tatweel removed.
pub fn fold_for_compare(value: &str) -> String {
    normalize_text(value)
        .chars()
        .filter(|c| !matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}'))
        .flat_map(char::to_lowercase)
        .collect()
}
