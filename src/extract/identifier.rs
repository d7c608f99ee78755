use regex::Regex;

use super::{Extractor, NormalizedPass, compile, term_alternation};
use crate::error::EngineError;
use crate::model::{FieldCandidate, FieldKind, FieldValue, Span};
use crate::scheme::IdentifierScheme;

const PAN_BASELINE: f64 = 0.70;
const GSTIN_BASELINE: f64 = 0.75;
const EMBEDDED_PAN_BASELINE: f64 = 0.50;
const LABEL_BONUS: f64 = 0.15;
const LABEL_WINDOW: usize = 40;

// The PAN of the registered person occupies characters 3..=12 of a GSTIN.
const EMBEDDED_PAN: std::ops::Range<usize> = 2..12;

struct SchemeMatcher {
    scheme: IdentifierScheme,
    pattern: Regex,
    label: Regex,
}

/// Layout-driven recognizer for PAN and GSTIN identifiers.
pub struct IdentifierExtractor {
    matchers: Vec<SchemeMatcher>,
}

impl IdentifierExtractor {
    pub fn new() -> Result<Self, EngineError> {
        let matchers = IdentifierScheme::ALL
            .into_iter()
            .map(|scheme| {
                Ok(SchemeMatcher {
                    scheme,
                    pattern: compile("identifier", scheme.pattern())?,
                    label: compile(
                        "identifier label",
                        &format!("(?i)(?:{})", term_alternation(scheme.labels())),
                    )?,
                })
            })
            .collect::<Result<Vec<SchemeMatcher>, EngineError>>()?;
        Ok(Self { matchers })
    }

    fn baseline(scheme: IdentifierScheme) -> f64 {
        match scheme {
            IdentifierScheme::Pan => PAN_BASELINE,
            IdentifierScheme::Gstin => GSTIN_BASELINE,
        }
    }
}

impl Extractor for IdentifierExtractor {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn produces(&self) -> &'static [FieldKind] {
        &[FieldKind::ClientIdentifier, FieldKind::TaxIdentifier]
    }

    fn extract(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        for matcher in &self.matchers {
            for found in matcher.pattern.find_iter(&pass.text) {
                let labelled = matcher.label.is_match(pass.before(found.start(), LABEL_WINDOW));
                let mut confidence = Self::baseline(matcher.scheme);
                if labelled {
                    confidence += LABEL_BONUS;
                }
                let span = Span::new(found.start(), found.end());
                candidates.push(pass.candidate(
                    matcher.scheme.field_kind(),
                    span,
                    FieldValue::Identifier(found.as_str().to_string()),
                    confidence,
                ));

                if matcher.scheme == IdentifierScheme::Gstin {
                    let embedded = Span::new(
                        found.start() + EMBEDDED_PAN.start,
                        found.start() + EMBEDDED_PAN.end,
                    );
                    candidates.push(pass.candidate(
                        FieldKind::ClientIdentifier,
                        embedded,
                        FieldValue::Identifier(found.as_str()[EMBEDDED_PAN].to_string()),
                        EMBEDDED_PAN_BASELINE,
                    ));
                }
            }
        }
        candidates
    }
}
