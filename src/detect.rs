//! Script and diacritic based source language guessing.
//!
//! Only consulted when the caller asks for `auto`. Scripts are checked before
//! Latin diacritics so that accented Latin text never shadows e.g. Cyrillic.

use crate::lang::DEFAULT_SOURCE;

type Rule = (&'static str, fn(char) -> bool);

const RULES: &[Rule] = &[
    ("ja", is_japanese),
    ("ko", is_hangul),
    ("ru", is_cyrillic),
    ("el", is_greek),
    ("he", is_hebrew),
    ("ar", is_arabic),
    ("hi", is_devanagari),
    ("es", is_spanish_mark),
    ("fr", is_french_mark),
    ("de", is_german_mark),
    ("pt", is_portuguese_mark),
    ("it", is_italian_mark),
];

fn is_japanese(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{4E00}'..='\u{9FAF}')
}

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}')
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, 'А'..='я' | 'Ё' | 'ё')
}

fn is_greek(c: char) -> bool {
    matches!(c, 'α'..='ω' | 'Α'..='Ω')
}

fn is_hebrew(c: char) -> bool {
    matches!(c, 'א'..='ת')
}

fn is_arabic(c: char) -> bool {
    matches!(c, 'ء'..='ي')
}

fn is_devanagari(c: char) -> bool {
    matches!(c, '\u{0900}'..='\u{097F}')
}

fn is_spanish_mark(c: char) -> bool {
    matches!(c, 'ñ' | '¡' | '¿')
}

fn is_french_mark(c: char) -> bool {
    matches!(
        c,
        'ç' | 'é' | 'è' | 'à' | 'ù' | 'â' | 'ê' | 'î' | 'ô' | 'û' | 'ë' | 'ï' | 'ü' | 'œ'
    )
}

fn is_german_mark(c: char) -> bool {
    matches!(c, 'ä' | 'ö' | 'ü' | 'ß')
}

fn is_portuguese_mark(c: char) -> bool {
    matches!(c, 'ã' | 'õ')
}

fn is_italian_mark(c: char) -> bool {
    matches!(c, 'ò' | 'à' | 'è' | 'ì' | 'ù')
}

/// Guess a two-letter language code for `sample`, defaulting to English.
pub fn detect_language(sample: &str) -> &'static str {
    // Latin rules are written against lowercase letters.
    let folded = sample.to_lowercase();
    RULES
        .iter()
        .find(|(_, test)| folded.chars().any(test))
        .map(|(code, _)| *code)
        .unwrap_or(DEFAULT_SOURCE)
}
