//! Field-specific candidate extractors.
//!
//! Each extractor declares the field kinds it produces; [`ExtractorSet`]
//! wires them statically and discards anything an extractor emits outside
//! its declared kinds.

mod amount;
mod authority;
mod date;
mod identifier;
mod notice_type;
mod section;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use regex::Regex;
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::lexicon::Lexicon;
use crate::model::{FieldCandidate, FieldKind, FieldValue, Span, clamp_unit};
use crate::normalize::{Language, PAGE_BREAK, Script};

pub use amount::AmountExtractor;
pub use authority::AuthorityExtractor;
pub use date::DateExtractor;
pub use identifier::IdentifierExtractor;
pub use notice_type::NoticeTypeClassifier;
pub use section::SectionExtractor;

pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn produces(&self) -> &'static [FieldKind];

    fn extract(&self, pass: &NormalizedPass) -> Vec<FieldCandidate>;
}

/// The normalized, page-concatenated text of one recognition pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPass {
    pub pass_id: String,
    pub language: Language,
    pub script: Script,
    pub text: String,
    pub ocr_confidence: f64,
    pages: Vec<(u32, usize)>,
}

impl NormalizedPass {
    /// Joins page texts in the given order with a page-break marker and
    /// remembers where each page starts.
    pub fn from_pages(
        pass_id: impl Into<String>,
        language: Language,
        script: Script,
        ocr_confidence: f64,
        pages: Vec<(u32, String)>,
    ) -> Self {
        let mut text = String::new();
        let mut starts = Vec::with_capacity(pages.len());
        for (index, (page, page_text)) in pages.into_iter().enumerate() {
            if index > 0 {
                text.push(PAGE_BREAK);
            }
            starts.push((page, text.len()));
            text.push_str(&page_text);
        }

        Self {
            pass_id: pass_id.into(),
            language,
            script,
            text,
            ocr_confidence: clamp_unit(ocr_confidence),
            pages: starts,
        }
    }

    pub fn single_page(
        pass_id: impl Into<String>,
        text: impl Into<String>,
        ocr_confidence: f64,
    ) -> Self {
        Self::from_pages(
            pass_id,
            Language::English,
            Script::Latin,
            ocr_confidence,
            vec![(1, text.into())],
        )
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_at(&self, offset: usize) -> u32 {
        self.pages
            .iter()
            .take_while(|(_, start)| *start <= offset)
            .last()
            .map(|(page, _)| *page)
            .unwrap_or(1)
    }

    /// Low-confidence recognition discounts every candidate from the pass,
    /// but never below half of its extractor baseline.
    pub fn ocr_weight(&self) -> f64 {
        0.5 + 0.5 * self.ocr_confidence
    }

    pub fn candidate(
        &self,
        kind: FieldKind,
        span: Span,
        value: FieldValue,
        base_confidence: f64,
    ) -> FieldCandidate {
        FieldCandidate::new(
            kind,
            &self.text[span.start..span.end],
            value,
            span,
            self.pass_id.clone(),
            self.page_at(span.start),
            clamp_unit(base_confidence) * self.ocr_weight(),
        )
    }

    /// Up to `max_bytes` of text ending at `offset`, cut on a char boundary
    /// and never reaching back across a page break.
    pub fn before(&self, offset: usize, max_bytes: usize) -> &str {
        let mut start = offset.saturating_sub(max_bytes);
        while !self.text.is_char_boundary(start) {
            start += 1;
        }
        let window = &self.text[start..offset];
        match window.rfind(PAGE_BREAK) {
            Some(position) => &window[position + PAGE_BREAK.len_utf8()..],
            None => window,
        }
    }

    /// Text from `offset` to the end of its line.
    pub fn rest_of_line(&self, offset: usize) -> &str {
        let rest = &self.text[offset..];
        let end = rest
            .find(|character| character == '\n' || character == PAGE_BREAK)
            .unwrap_or(rest.len());
        &rest[..end]
    }
}

pub struct ExtractorSet {
    identifier: IdentifierExtractor,
    date: DateExtractor,
    amount: AmountExtractor,
    section: SectionExtractor,
    authority: AuthorityExtractor,
    notice_type: NoticeTypeClassifier,
}

impl ExtractorSet {
    pub fn new(lexicon: Arc<Lexicon>, config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            identifier: IdentifierExtractor::new()?,
            date: DateExtractor::new(Arc::clone(&lexicon))?,
            amount: AmountExtractor::new(config.default_currency.clone())?,
            section: SectionExtractor::new(Arc::clone(&lexicon))?,
            authority: AuthorityExtractor::new(Arc::clone(&lexicon))?,
            notice_type: NoticeTypeClassifier::new(lexicon, config.notice_type_min_score)?,
        })
    }

    pub fn extractors(&self) -> [&dyn Extractor; 6] {
        [
            &self.identifier,
            &self.date,
            &self.amount,
            &self.section,
            &self.authority,
            &self.notice_type,
        ]
    }

    pub fn extractor_for(&self, kind: FieldKind) -> &dyn Extractor {
        match kind {
            FieldKind::ClientIdentifier | FieldKind::TaxIdentifier => &self.identifier,
            FieldKind::NoticeDate => &self.date,
            FieldKind::MonetaryAmount => &self.amount,
            FieldKind::StatutorySection => &self.section,
            FieldKind::IssuingAuthority => &self.authority,
            FieldKind::NoticeType => &self.notice_type,
        }
    }

    pub fn extract_all(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        for extractor in self.extractors() {
            let produced = extractor.extract(pass);
            let before = produced.len();
            let mut kept = produced
                .into_iter()
                .filter(|candidate| {
                    extractor.produces().contains(&candidate.field_kind())
                        && candidate.span().lies_within(&pass.text)
                })
                .collect::<Vec<FieldCandidate>>();
            if kept.len() != before {
                warn!(
                    extractor = extractor.name(),
                    pass_id = %pass.pass_id,
                    discarded = before - kept.len(),
                    "discarded candidates outside the extractor's declared kinds or text bounds"
                );
            }
            candidates.append(&mut kept);
        }
        candidates
    }

    /// Deadline-phrased date readings of the pass. They feed the compliance
    /// deadline, never the notice date.
    pub fn extract_deadlines(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        self.date.deadlines(pass)
    }
}

pub(crate) fn compile(name: &'static str, pattern: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern).map_err(|source| EngineError::Pattern { name, source })
}

/// Alternation over literal terms, longest first so the most specific term
/// wins at a given position. ASCII-edged terms get word boundaries.
pub(crate) fn term_alternation<S: AsRef<str>>(terms: &[S]) -> String {
    let mut sorted = terms
        .iter()
        .map(|term| term.as_ref().trim())
        .filter(|term| !term.is_empty())
        .collect::<Vec<&str>>();
    sorted.sort_by(|left, right| right.len().cmp(&left.len()).then(left.cmp(right)));
    sorted.dedup();

    sorted
        .into_iter()
        .map(|term| {
            let escaped = regex::escape(term)
                .split_whitespace()
                .collect::<Vec<&str>>()
                .join(r"\s+");
            let lead = if starts_with_word_char(term) { r"\b" } else { "" };
            let tail = if ends_with_word_char(term) { r"\b" } else { "" };
            format!("{lead}{escaped}{tail}")
        })
        .collect::<Vec<String>>()
        .join("|")
}

fn starts_with_word_char(term: &str) -> bool {
    term.chars()
        .next()
        .map(|character| character.is_ascii_alphanumeric())
        .unwrap_or(false)
}

fn ends_with_word_char(term: &str) -> bool {
    term.chars()
        .last()
        .map(|character| character.is_ascii_alphanumeric())
        .unwrap_or(false)
}

/// Parses a grouped integer ("1,00,000", "12,000", "5000") with an optional
/// fractional part into minor units.
pub(crate) fn parse_minor_units(integer: &str, fraction: Option<&str>) -> Option<i64> {
    let digits = integer
        .chars()
        .filter(|character| *character != ',')
        .collect::<String>();
    let whole = digits.parse::<i64>().ok()?;
    let cents = match fraction {
        Some(fraction) if fraction.len() == 1 => fraction.parse::<i64>().ok()? * 10,
        Some(fraction) if fraction.len() == 2 => fraction.parse::<i64>().ok()?,
        Some(_) => return None,
        None => 0,
    };
    whole.checked_mul(100)?.checked_add(cents)
}
