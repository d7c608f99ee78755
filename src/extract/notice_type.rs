use std::sync::Arc;

use regex::Regex;

use super::{Extractor, NormalizedPass, compile, term_alternation};
use crate::error::EngineError;
use crate::lexicon::Lexicon;
use crate::model::{FieldCandidate, FieldKind, FieldValue, Span};

const PHRASE_BONUS: f64 = 0.25;

struct Rule {
    label: String,
    phrases: Vec<Regex>,
    keywords: Vec<Regex>,
}

/// Keyword-overlap classifier over the lexicon's notice-type rules. Every
/// label scoring at or above the threshold becomes a candidate.
pub struct NoticeTypeClassifier {
    rules: Vec<Rule>,
    min_score: f64,
}

impl NoticeTypeClassifier {
    pub fn new(lexicon: Arc<Lexicon>, min_score: f64) -> Result<Self, EngineError> {
        let term = |value: &String| {
            compile(
                "notice type keyword",
                &format!("(?i)(?:{})", term_alternation(std::slice::from_ref(value))),
            )
        };
        let rules = lexicon
            .notice_types
            .iter()
            .map(|rule| {
                Ok(Rule {
                    label: rule.label.clone(),
                    phrases: rule.phrases.iter().map(term).collect::<Result<_, _>>()?,
                    keywords: rule.keywords.iter().map(term).collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<Vec<Rule>, EngineError>>()?;
        Ok(Self { rules, min_score })
    }

    fn score(rule: &Rule, text: &str) -> Option<(f64, Span)> {
        let mut hits = Vec::new();
        let mut matched_keywords = 0usize;
        for keyword in &rule.keywords {
            let found = keyword.find_iter(text).collect::<Vec<_>>();
            if !found.is_empty() {
                matched_keywords += 1;
            }
            hits.extend(found.into_iter().map(|m| Span::new(m.start(), m.end())));
        }

        let mut phrase_matched = false;
        for phrase in &rule.phrases {
            if let Some(found) = phrase.find(text) {
                phrase_matched = true;
                hits.push(Span::new(found.start(), found.end()));
            }
        }

        let start = hits.iter().map(|span| span.start).min()?;
        let end = hits.iter().map(|span| span.end).max()?;

        let mut score = if rule.keywords.is_empty() {
            0.0
        } else {
            matched_keywords as f64 / rule.keywords.len() as f64
        };
        if phrase_matched {
            score += PHRASE_BONUS;
        }
        Some((score.min(1.0), Span::new(start, end)))
    }
}

impl Extractor for NoticeTypeClassifier {
    fn name(&self) -> &'static str {
        "notice_type"
    }

    fn produces(&self) -> &'static [FieldKind] {
        &[FieldKind::NoticeType]
    }

    fn extract(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let (score, span) = Self::score(rule, &pass.text)?;
                (score >= self.min_score).then(|| {
                    pass.candidate(
                        FieldKind::NoticeType,
                        span,
                        FieldValue::NoticeType(rule.label.clone()),
                        score,
                    )
                })
            })
            .collect()
    }
}
