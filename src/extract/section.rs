use std::sync::Arc;

use regex::Regex;

use super::{Extractor, NormalizedPass, compile, term_alternation};
use crate::error::EngineError;
use crate::lexicon::Lexicon;
use crate::model::{FieldCandidate, FieldKind, FieldValue, Span, StatutoryCitation};

const WITH_ACT_BASELINE: f64 = 0.80;
const BARE_BASELINE: f64 = 0.50;

const LEAD: &str = r"(?:\bsections?\b\.?|\bsecs?\b\.?|\bu/s\b\.?|\bs\.|धारा|ధారా|సెక్షన్)";
const ITEM: &str = r"\d{1,4}[A-Za-z]{0,3}(?:\s*\(\s*[0-9A-Za-z]{1,5}\s*\))*";

/// Section citations, optionally followed by the Act they belong to.
/// "Sections 143(2) and 142(1)" yields one candidate per listed section.
pub struct SectionExtractor {
    lexicon: Arc<Lexicon>,
    citation: Regex,
    item: Regex,
    known_act: Option<Regex>,
    named_act: Regex,
}

impl SectionExtractor {
    pub fn new(lexicon: Arc<Lexicon>) -> Result<Self, EngineError> {
        let act_names = lexicon
            .acts
            .iter()
            .flat_map(|entry| std::iter::once(&entry.name).chain(entry.aliases.iter()))
            .map(String::as_str)
            .collect::<Vec<&str>>();
        let known_act = if act_names.is_empty() {
            None
        } else {
            Some(compile(
                "known act",
                &format!(
                    r"(?i)^\s*,?\s*(?:of|under)\s+(?:the\s+)?(?P<act>(?:{})(?:,?\s*\d{{4}})?)",
                    term_alternation(&act_names)
                ),
            )?)
        };

        Ok(Self {
            citation: compile(
                "section citation",
                &format!(r"(?i){LEAD}\s*(?P<list>{ITEM}(?:\s*(?:,|&|\band\b)\s*{ITEM})*)"),
            )?,
            item: compile(
                "section item",
                r"(?P<num>\d{1,4}[A-Za-z]{0,3})(?P<subs>(?:\s*\(\s*[0-9A-Za-z]{1,5}\s*\))*)",
            )?,
            known_act,
            named_act: compile(
                "named act",
                concat!(
                    r"^\s*,?\s*(?:of|under)\s+(?:the\s+)?",
                    r"(?P<act>(?:\p{Lu}[\w\-&().]*\s+){0,8}?Act\b(?:,?\s*\d{4})?)",
                ),
            )?,
            lexicon,
        })
    }

    /// Canonical Act name for the text right after a citation, when one is
    /// named there.
    fn act_after(&self, rest: &str) -> Option<String> {
        let known = self
            .known_act
            .as_ref()
            .and_then(|pattern| pattern.captures(rest))
            .and_then(|found| found.name("act"));
        let act = match known {
            Some(act) => act.as_str(),
            None => self.named_act.captures(rest)?.name("act")?.as_str(),
        };
        // "of the Act" refers back to an Act named elsewhere.
        if act == "Act" {
            return None;
        }
        Some(
            self.lexicon
                .resolve_act(act)
                .map(|entry| entry.name.clone())
                .unwrap_or_else(|| tidy(act)),
        )
    }
}

impl Extractor for SectionExtractor {
    fn name(&self) -> &'static str {
        "section"
    }

    fn produces(&self) -> &'static [FieldKind] {
        &[FieldKind::StatutorySection]
    }

    fn extract(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        for captures in self.citation.captures_iter(&pass.text) {
            let Some(list) = captures.name("list") else {
                continue;
            };
            let act = self.act_after(&pass.text[list.end()..]);
            let baseline = if act.is_some() {
                WITH_ACT_BASELINE
            } else {
                BARE_BASELINE
            };

            for item in self.item.captures_iter(list.as_str()) {
                let (Some(whole), Some(number)) = (item.get(0), item.name("num")) else {
                    continue;
                };
                let mut levels = item
                    .name("subs")
                    .map(|subs| subdivisions(subs.as_str()))
                    .unwrap_or_default()
                    .into_iter();
                let citation = StatutoryCitation {
                    act: act.clone(),
                    section: number.as_str().to_uppercase(),
                    subsection: levels.next(),
                    clause: levels.next(),
                };
                let span = Span::new(list.start() + whole.start(), list.start() + whole.end());
                candidates.push(pass.candidate(
                    FieldKind::StatutorySection,
                    span,
                    FieldValue::Section(citation),
                    baseline,
                ));
            }
        }
        candidates
    }
}

/// "(1) (a)" -> ["1", "a"]. Numeric levels keep their case; letter levels
/// are lowercased the way statutes print them.
fn subdivisions(subs: &str) -> Vec<String> {
    subs.split(['(', ')'])
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .map(|level| {
            if level.chars().all(|character| character.is_ascii_digit()) {
                level.to_string()
            } else if level.chars().next().is_some_and(|first| first.is_ascii_digit()) {
                level.to_uppercase()
            } else {
                level.to_lowercase()
            }
        })
        .collect()
}

fn tidy(act: &str) -> String {
    act.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdivisions_split_nested_levels() {
        assert_eq!(subdivisions("(1)(c)"), vec!["1", "c"]);
        assert_eq!(subdivisions(" ( 2 ) (iii) "), vec!["2", "iii"]);
        assert_eq!(subdivisions("(1A)"), vec!["1A"]);
        assert!(subdivisions("").is_empty());
    }
}
