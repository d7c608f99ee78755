//! Document analysis: normalize each pass, extract and validate candidates,
//! then resolve every field kind across all passes at once.


use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::aggregate::{CandidatesByPass, aggregate, collect_multi};
use crate::assemble::{FieldOutcomes, assemble};
use crate::config::EngineConfig;
use crate::error::{AnalysisError, EngineError, MalformedInput};
use crate::extract::{ExtractorSet, NormalizedPass};
use crate::lexicon::Lexicon;
use crate::model::{
    Cardinality, DocumentAnalysisResult, DroppedPass, FieldKind, PassSummary, RecognizedText,
};
use crate::normalize::{Language, Script, normalize};
use crate::validate::Validator;

/// A configured analyzer. Holds compiled patterns and the lexicon; holds no
/// per-document state, so one engine can serve many threads.
pub struct Engine {
    config: EngineConfig,
    lexicon: Arc<Lexicon>,
    extractors: ExtractorSet,
    validator: Validator,
}

impl Engine {
    pub fn new(config: EngineConfig, lexicon: Lexicon) -> Result<Self, EngineError> {
        config.check()?;
        let lexicon = Arc::new(lexicon.prepared()?);
        let extractors = ExtractorSet::new(Arc::clone(&lexicon), &config)?;
        let validator = Validator::new(config.clone(), Arc::clone(&lexicon));
        Ok(Self {
            config,
            lexicon,
            extractors,
            validator,
        })
    }

    /// Default configuration without a reference date: dates are only
    /// checked against the earliest plausible date, never as "too far in the
    /// future". Use [`EngineConfig::with_reference_date`] with [`Engine::new`]
    /// for the full window.
    pub fn with_defaults() -> Result<Self, EngineError> {
        Self::new(EngineConfig::default(), Lexicon::builtin())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn analyze(
        &self,
        document_id: &str,
        recognized: &[RecognizedText],
    ) -> Result<DocumentAnalysisResult, AnalysisError> {
        if recognized.is_empty() {
            return Err(AnalysisError::NoPasses);
        }

        let mut grouped: BTreeMap<&str, Vec<&RecognizedText>> = BTreeMap::new();
        for page in recognized {
            grouped.entry(page.pass_id.as_str()).or_default().push(page);
        }
        if recognized.iter().all(|page| page.text.trim().is_empty()) {
            return Err(AnalysisError::EmptyText {
                pass_count: grouped.len(),
            });
        }

        info!(document_id = %document_id, passes = grouped.len(), "analyzing document");

        let mut dropped_passes = Vec::new();
        let mut passes = Vec::new();
        for (pass_id, pages) in grouped {
            match check_pass(pass_id, &pages) {
                Ok(()) => passes.push(normalize_pass(pass_id, pages)),
                Err(reason) => {
                    warn!(
                        document_id = %document_id,
                        pass_id = %pass_id,
                        %reason,
                        "dropping malformed pass"
                    );
                    dropped_passes.push(DroppedPass {
                        pass_id: pass_id.to_string(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        let mut candidates_by_pass = CandidatesByPass::new();
        let mut deadlines_by_pass = CandidatesByPass::new();
        let mut summaries = Vec::with_capacity(passes.len());
        for pass in &passes {
            let candidates = self
                .extractors
                .extract_all(pass)
                .into_iter()
                .map(|candidate| self.validator.validate(candidate))
                .collect::<Vec<_>>();
            debug!(
                document_id = %document_id,
                pass_id = %pass.pass_id,
                language = pass.language.as_str(),
                candidates = candidates.len(),
                "extracted candidates"
            );
            summaries.push(PassSummary {
                pass_id: pass.pass_id.clone(),
                language: pass.language,
                script: pass.script,
                page_count: pass.page_count(),
                char_count: pass.text.chars().count(),
                ocr_confidence: pass.ocr_confidence,
                candidate_count: candidates.len(),
            });
            candidates_by_pass.insert(pass.pass_id.clone(), candidates);

            let deadlines = self
                .extractors
                .extract_deadlines(pass)
                .into_iter()
                .map(|candidate| self.validator.validate(candidate))
                .collect::<Vec<_>>();
            deadlines_by_pass.insert(pass.pass_id.clone(), deadlines);
        }

        let mut outcomes = FieldOutcomes {
            compliance_deadline: Some(aggregate(FieldKind::NoticeDate, &deadlines_by_pass)),
            ..FieldOutcomes::default()
        };
        for kind in FieldKind::ALL {
            match kind.cardinality() {
                Cardinality::Single => {
                    outcomes
                        .single
                        .insert(kind, aggregate(kind, &candidates_by_pass));
                }
                Cardinality::Multi => {
                    let tolerance = match kind {
                        FieldKind::MonetaryAmount => self.config.amount_merge_tolerance_minor,
                        _ => 0,
                    };
                    outcomes
                        .multi
                        .insert(kind, collect_multi(kind, &candidates_by_pass, tolerance));
                }
            }
        }

        let result = assemble(document_id, outcomes, summaries, dropped_passes, &self.config);
        info!(
            document_id = %document_id,
            overall_confidence = result.overall_confidence,
            unresolved = result.unresolved_fields.len(),
            compliance_deadline = ?result.compliance_deadline_date(),
            dropped = result.dropped_passes.len(),
            "document analyzed"
        );
        Ok(result)
    }
}

fn check_pass(pass_id: &str, pages: &[&RecognizedText]) -> Result<(), MalformedInput> {
    if pass_id.trim().is_empty() {
        return Err(MalformedInput::EmptyPassId);
    }

    let mut seen = BTreeSet::new();
    for page in pages {
        if page.page == 0 {
            return Err(MalformedInput::ZeroPage {
                pass_id: pass_id.to_string(),
            });
        }
        if !seen.insert(page.page) {
            return Err(MalformedInput::DuplicatePage {
                pass_id: pass_id.to_string(),
                page: page.page,
            });
        }
        if !(0.0..=1.0).contains(&page.ocr_confidence) {
            return Err(MalformedInput::ConfidenceOutOfRange {
                pass_id: pass_id.to_string(),
                page: page.page,
                value: page.ocr_confidence,
            });
        }
        let replaced = page.text.matches(char::REPLACEMENT_CHARACTER).count();
        if replaced > 0 {
            return Err(MalformedInput::InvalidEncoding {
                pass_id: pass_id.to_string(),
                page: page.page,
                count: replaced,
            });
        }
    }
    Ok(())
}

fn normalize_pass(pass_id: &str, mut pages: Vec<&RecognizedText>) -> NormalizedPass {
    pages.sort_by_key(|page| page.page);

    let normalized = pages
        .iter()
        .map(|page| (page.page, normalize(&page.text, &page.language)))
        .collect::<Vec<_>>();
    let (language, script) = normalized
        .first()
        .map(|(_, text)| (text.language, text.script))
        .unwrap_or((Language::Unknown, Script::Unknown));

    // Pages with more text say more about the pass as a whole.
    let weights = normalized
        .iter()
        .map(|(_, text)| text.text.chars().filter(|c| !c.is_whitespace()).count() as f64)
        .collect::<Vec<f64>>();
    let total: f64 = weights.iter().sum();
    let ocr_confidence = if total > 0.0 {
        pages
            .iter()
            .zip(&weights)
            .map(|(page, weight)| page.ocr_confidence * weight)
            .sum::<f64>()
            / total
    } else {
        pages.iter().map(|page| page.ocr_confidence).sum::<f64>() / pages.len().max(1) as f64
    };

    NormalizedPass::from_pages(
        pass_id,
        language,
        script,
        ocr_confidence,
        normalized
            .into_iter()
            .map(|(page, text)| (page, text.text))
            .collect(),
    )
}
