//! ISO language codes and the NLLB tags the primary provider expects.

/// Source code assumed when the caller asks for `auto`.
pub const DEFAULT_SOURCE: &str = "en";

/// Target code used when the caller leaves the target out.
pub const DEFAULT_TARGET: &str = "es";

pub const AUTO: &str = "auto";

/// Tag used for an unrecognised source language.
pub const DEFAULT_SOURCE_TAG: &str = "eng_Latn";

/// Tag used for an unrecognised target language.
pub const DEFAULT_TARGET_TAG: &str = "spa_Latn";

const NLLB_TAGS: &[(&str, &str)] = &[
    ("en", "eng_Latn"),
    ("es", "spa_Latn"),
    ("fr", "fra_Latn"),
    ("pt", "por_Latn"),
    ("it", "ita_Latn"),
    ("de", "deu_Latn"),
    ("ru", "rus_Cyrl"),
    ("ja", "jpn_Jpan"),
    ("ko", "kor_Hang"),
    ("zh", "zho_Hans"),
    ("zh-cn", "zho_Hans"),
    ("zh-tw", "zho_Hant"),
];

/// Look up the NLLB tag for a code, if it is one we know.
pub fn nllb_tag(code: &str) -> Option<&'static str> {
    let code = code.to_lowercase();
    NLLB_TAGS
        .iter()
        .find(|(iso, _)| *iso == code)
        .map(|(_, tag)| *tag)
}

/// Map a caller-supplied code to a primary provider tag.
///
/// `auto` resolves to [`DEFAULT_SOURCE`] before lookup. Unknown codes fall
/// back to `default` instead of failing the batch.
pub fn primary_tag(code: &str, default: &'static str) -> &'static str {
    let code = if is_auto(code) { DEFAULT_SOURCE } else { code };
    nllb_tag(code).unwrap_or(default)
}

pub fn is_auto(code: &str) -> bool {
    code.eq_ignore_ascii_case(AUTO)
}

/// Lowercase a code and drop any region suffix: `pt-BR` becomes `pt`.
pub fn to_iso2(code: &str) -> String {
    code.split('-').next().unwrap_or_default().trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(primary_tag("en", DEFAULT_SOURCE_TAG), "eng_Latn");
        assert_eq!(primary_tag("ru", DEFAULT_SOURCE_TAG), "rus_Cyrl");
        assert_eq!(primary_tag("zh-tw", DEFAULT_TARGET_TAG), "zho_Hant");
        assert_eq!(primary_tag("ZH-CN", DEFAULT_TARGET_TAG), "zho_Hans");
    }

    #[test]
    fn test_auto_resolves_to_english() {
        assert_eq!(primary_tag("auto", DEFAULT_SOURCE_TAG), "eng_Latn");
        assert_eq!(primary_tag("AUTO", DEFAULT_TARGET_TAG), "eng_Latn");
    }

    #[test]
    fn test_unknown_codes_use_default() {
        assert_eq!(primary_tag("tlh", DEFAULT_SOURCE_TAG), "eng_Latn");
        assert_eq!(primary_tag("xx", DEFAULT_TARGET_TAG), "spa_Latn");
        assert_eq!(primary_tag("", DEFAULT_TARGET_TAG), "spa_Latn");
        assert!(nllb_tag("tlh").is_none());
    }

    #[test]
    fn test_to_iso2() {
        assert_eq!(to_iso2("pt-BR"), "pt");
        assert_eq!(to_iso2("EN"), "en");
        assert_eq!(to_iso2("zh-tw"), "zh");
        assert_eq!(to_iso2(""), "");
    }
}
