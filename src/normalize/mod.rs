mod confusables;
mod script;

use unicode_normalization::UnicodeNormalization;

pub use script::{Language, LanguageHint, Script, detect_script, fold_native_digit};

pub(crate) const PAGE_BREAK: char = '\u{000C}';

// Removed regardless of script.
const INVISIBLE: [char; 4] = ['\u{FEFF}', '\u{00AD}', '\u{200B}', '\u{0000}'];
// Joiners carry meaning in Indic orthography and are noise elsewhere.
const JOINERS: [char; 2] = ['\u{200C}', '\u{200D}'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub language: Language,
    pub script: Script,
}

pub fn normalize(raw_text: &str, language: &str) -> NormalizedText {
    let language = match LanguageHint::parse(language) {
        LanguageHint::Known(language) => language,
        LanguageHint::Auto => Language::from_script(detect_script(raw_text)),
        LanguageHint::Unrecognized => Language::Unknown,
    };

    if language == Language::Unknown {
        return NormalizedText {
            text: raw_text.to_string(),
            language,
            script: Script::Unknown,
        };
    }

    let script = language.script();
    let keep_joiners = script.is_indic();

    let folded = raw_text
        .nfkc()
        .filter_map(|character| {
            if INVISIBLE.contains(&character) {
                return None;
            }
            if !keep_joiners && JOINERS.contains(&character) {
                return None;
            }
            Some(fold_native_digit(character).unwrap_or(character))
        })
        .collect::<String>();

    let text = folded
        .split(PAGE_BREAK)
        .map(normalize_page)
        .collect::<Vec<String>>()
        .join(&PAGE_BREAK.to_string());

    NormalizedText {
        text,
        language,
        script,
    }
}

fn normalize_page(page: &str) -> String {
    page.lines()
        .map(|line| line.split_whitespace().collect::<Vec<&str>>().join(" "))
        .filter(|line| !line.is_empty())
        .map(|line| confusables::repair_line(&line))
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_blank_lines() {
        let normalized = normalize("  Notice   under\t section\n\n\n  143(2)  \r\n", "eng");
        assert_eq!(normalized.text, "Notice under section\n143(2)");
        assert_eq!(normalized.language, Language::English);
        assert_eq!(normalized.script, Script::Latin);
    }

    #[test]
    fn normalize_preserves_page_breaks() {
        let normalized = normalize("page one\n\u{000C}page  two", "en");
        assert_eq!(normalized.text, "page one\u{000C}page two");
    }

    #[test]
    fn normalize_applies_compatibility_forms_and_native_digits() {
        let normalized = normalize("ﬁled on १५/०१/२०२३ Ｒｓ. ５０００", "hin");
        assert_eq!(normalized.text, "filed on 15/01/2023 Rs. 5000");
        assert_eq!(normalized.language, Language::Hindi);
    }

    #[test]
    fn normalize_keeps_joiners_only_for_indic_scripts() {
        let latin = normalize("tax\u{200D}payer\u{00AD}", "en");
        assert_eq!(latin.text, "taxpayer");

        let devanagari = normalize("क्\u{200D}ष", "hi");
        assert!(devanagari.text.contains('\u{200D}'));
    }

    #[test]
    fn normalize_returns_unrecognized_input_unchanged() {
        let raw = "  raw\ttext 1O  ";
        let normalized = normalize(raw, "xx-unknown");
        assert_eq!(normalized.text, raw);
        assert_eq!(normalized.language, Language::Unknown);
    }

    #[test]
    fn normalize_auto_detects_from_script() {
        let normalized = normalize("ఆదాయపు పన్ను శాఖ నోటీసు", "auto");
        assert_eq!(normalized.language, Language::Telugu);
    }

    #[test]
    fn normalize_does_not_touch_legal_wording() {
        let text = "The Assessing Officer, Ward 1(2), Hyderabad issued this Order";
        assert_eq!(normalize(text, "en").text, text);
    }
}
