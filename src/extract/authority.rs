use std::sync::Arc;

use regex::Regex;

use super::{Extractor, NormalizedPass, compile, term_alternation};
use crate::error::EngineError;
use crate::lexicon::Lexicon;
use crate::model::{FieldCandidate, FieldKind, FieldValue, Span};

const BASELINE: f64 = 0.55;
const LABEL_BONUS: f64 = 0.15;
const QUALIFIED_BONUS: f64 = 0.10;
const LABEL_WINDOW: usize = 40;

const LABELS: &str = concat!(
    r"(?i)(?:office\s+of\s+(?:the\s+)?|issuing\s+office\s*:\s*|",
    r"issued\s+by\s*:?\s*|from\s*:\s*|कार्यालय\s*)$",
);
// Capitalized words that start a new clause rather than name a place.
const STOP_WORDS: [&str; 16] = [
    "The", "To", "From", "Dated", "Date", "Sub", "Subject", "Ref", "Notice", "Sir", "Madam",
    "PAN", "GSTIN", "Section", "Under", "Please",
];

/// Office titles from the lexicon, extended by the jurisdiction and place
/// that follow them on the same line.
pub struct AuthorityExtractor {
    lexicon: Arc<Lexicon>,
    title: Regex,
    qualifier: Option<Regex>,
    place: Regex,
    label: Regex,
}

impl AuthorityExtractor {
    pub fn new(lexicon: Arc<Lexicon>) -> Result<Self, EngineError> {
        let title = compile(
            "office title",
            &format!("(?i)(?:{})", term_alternation(&lexicon.office_titles)),
        )?;
        let qualifier = if lexicon.jurisdiction_terms.is_empty() {
            None
        } else {
            Some(compile(
                "jurisdiction qualifier",
                &format!(
                    concat!(
                        r"(?i)^\s*[,\-]?\s*(?P<term>{})\s*[-:]?\s*",
                        r"(?P<id>(?-i:\d{{1,3}}[A-Z]?|[A-Z]{{1,3}})\b",
                        r"(?:\s*\(\s*[0-9A-Za-z]{{1,3}}\s*\))*)",
                    ),
                    term_alternation(&lexicon.jurisdiction_terms)
                ),
            )?)
        };

        Ok(Self {
            title,
            qualifier,
            place: compile(
                "authority place",
                r"^\s*[,\-]?\s*(?P<place>\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+){0,2})\b",
            )?,
            label: compile("authority label", LABELS)?,
            lexicon,
        })
    }

    /// Lexicon spelling of a matched title. Acronyms only count when printed
    /// in capitals and Latin titles only when capitalized, so running prose
    /// ("the commissioner may") is skipped.
    fn canonical_title(&self, matched: &str) -> Option<&str> {
        let key = squash(matched).to_lowercase();
        let title = self
            .lexicon
            .office_titles
            .iter()
            .find(|title| squash(title).to_lowercase() == key)?;

        let is_acronym = title.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
            && title.chars().any(|c| c.is_ascii_alphabetic());
        if is_acronym && squash(matched) != *title {
            return None;
        }
        if matched.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
            return None;
        }
        Some(title.as_str())
    }

    /// Qualifiers and place following the title; returns the normalized
    /// suffix and how many bytes of `rest` it covers.
    fn qualification(&self, rest: &str) -> (Vec<String>, usize) {
        let mut parts = Vec::new();
        let mut consumed = 0;

        if let Some(qualifier) = &self.qualifier {
            while let Some(found) = qualifier.captures(&rest[consumed..]) {
                let (Some(whole), Some(term), Some(id)) =
                    (found.get(0), found.name("term"), found.name("id"))
                else {
                    break;
                };
                parts.push(format!(
                    "{} {}",
                    capitalize(term.as_str()),
                    id.as_str().replace(char::is_whitespace, "").to_uppercase()
                ));
                consumed += whole.end();
            }
        }

        if let Some(found) = self.place.captures(&rest[consumed..]) {
            if let (Some(whole), Some(place)) = (found.get(0), found.name("place")) {
                let place = squash(place.as_str());
                let first = place.split(' ').next().unwrap_or_default();
                if !STOP_WORDS.contains(&first) {
                    parts.push(place);
                    consumed += whole.end();
                }
            }
        }

        (parts, consumed)
    }
}

impl Extractor for AuthorityExtractor {
    fn name(&self) -> &'static str {
        "authority"
    }

    fn produces(&self) -> &'static [FieldKind] {
        &[FieldKind::IssuingAuthority]
    }

    fn extract(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        for found in self.title.find_iter(&pass.text) {
            let Some(title) = self.canonical_title(found.as_str()) else {
                continue;
            };

            let rest = pass.rest_of_line(found.end());
            let (parts, consumed) = self.qualification(rest);

            let mut confidence = BASELINE;
            if self.label.is_match(pass.before(found.start(), LABEL_WINDOW)) {
                confidence += LABEL_BONUS;
            }
            if !parts.is_empty() {
                confidence += QUALIFIED_BONUS;
            }

            let value = std::iter::once(title.to_string())
                .chain(parts)
                .collect::<Vec<String>>()
                .join(", ");
            let span = Span::new(found.start(), found.end() + consumed);
            candidates.push(pass.candidate(
                FieldKind::IssuingAuthority,
                span,
                FieldValue::Authority(value),
                confidence,
            ));
        }
        candidates
    }
}

fn squash(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let lowered = word.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> AuthorityExtractor {
        let lexicon = Lexicon::builtin().prepared().expect("builtin lexicon");
        AuthorityExtractor::new(Arc::new(lexicon)).expect("patterns compile")
    }

    #[test]
    fn acronyms_require_capitals_and_titles_require_capitalization() {
        let extractor = extractor();
        assert_eq!(extractor.canonical_title("ITO"), Some("ITO"));
        assert_eq!(extractor.canonical_title("ito"), None);
        assert_eq!(
            extractor.canonical_title("INCOME TAX OFFICER"),
            Some("Income Tax Officer")
        );
        assert_eq!(extractor.canonical_title("commissioner"), None);
    }

    #[test]
    fn qualification_collects_jurisdiction_then_place() {
        let extractor = extractor();
        let rest = ", Ward 2 (1), Hyderabad, dated";
        let (parts, consumed) = extractor.qualification(rest);
        assert_eq!(parts, vec!["Ward 2(1)".to_string(), "Hyderabad".to_string()]);
        assert_eq!(&rest[..consumed], ", Ward 2 (1), Hyderabad");
    }

    #[test]
    fn qualification_ignores_clause_openers() {
        let extractor = extractor();
        let (parts, consumed) = extractor.qualification(" Dated 15/01/2023");
        assert!(parts.is_empty());
        assert_eq!(consumed, 0);
    }
}
