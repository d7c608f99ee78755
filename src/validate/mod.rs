//! Per-kind rule checks applied to each candidate before aggregation.

pub mod checksum;

use std::sync::Arc;

use tracing::trace;

use crate::config::EngineConfig;
use crate::lexicon::Lexicon;
use crate::model::{FieldCandidate, FieldKind, FieldValue, ValidationStatus};
use checksum::PanCheck;

const PAN_KNOWN_ENTITY_BONUS: f64 = 0.10;
const PAN_UNKNOWN_ENTITY_FACTOR: f64 = 0.9;
const GSTIN_BONUS: f64 = 0.15;
const KNOWN_ACT_BONUS: f64 = 0.10;

pub struct Validator {
    config: EngineConfig,
    lexicon: Arc<Lexicon>,
}

impl Validator {
    pub fn new(config: EngineConfig, lexicon: Arc<Lexicon>) -> Self {
        Self { config, lexicon }
    }

    /// Returns the candidate with its validation status set and confidence
    /// adjusted. Invalid candidates keep their provenance at confidence 0.
    pub fn validate(&self, candidate: FieldCandidate) -> FieldCandidate {
        let confidence = candidate.extractor_confidence();
        let (status, confidence) = match (candidate.field_kind(), candidate.normalized_value()) {
            (FieldKind::ClientIdentifier, FieldValue::Identifier(value)) => {
                match checksum::check_pan(value) {
                    PanCheck::Known => {
                        (ValidationStatus::Valid, confidence + PAN_KNOWN_ENTITY_BONUS)
                    }
                    PanCheck::UnknownEntity => {
                        (ValidationStatus::Unchecked, confidence * PAN_UNKNOWN_ENTITY_FACTOR)
                    }
                    PanCheck::Broken => (ValidationStatus::Invalid, 0.0),
                }
            }
            (FieldKind::TaxIdentifier, FieldValue::Identifier(value)) => {
                if checksum::check_gstin(value) {
                    (ValidationStatus::Valid, confidence + GSTIN_BONUS)
                } else {
                    (ValidationStatus::Invalid, 0.0)
                }
            }
            (FieldKind::NoticeDate, FieldValue::Date(date)) => {
                if self.config.date_is_plausible(*date) {
                    (ValidationStatus::Valid, confidence)
                } else {
                    (
                        ValidationStatus::Valid,
                        confidence * self.config.out_of_window_penalty,
                    )
                }
            }
            (FieldKind::MonetaryAmount, FieldValue::Amount(money)) => {
                if (0..=self.config.amount_ceiling_minor).contains(&money.minor_units) {
                    (ValidationStatus::Valid, confidence)
                } else {
                    (ValidationStatus::Invalid, 0.0)
                }
            }
            (FieldKind::StatutorySection, FieldValue::Section(citation)) => {
                let known = citation
                    .act
                    .as_deref()
                    .and_then(|act| self.lexicon.resolve_act(act))
                    .is_some();
                if known {
                    (ValidationStatus::Valid, confidence + KNOWN_ACT_BONUS)
                } else {
                    (ValidationStatus::Unchecked, confidence)
                }
            }
            (FieldKind::IssuingAuthority, FieldValue::Authority(_))
            | (FieldKind::NoticeType, FieldValue::NoticeType(_)) => {
                (ValidationStatus::Unchecked, confidence)
            }
            // A value of the wrong shape for its kind can never be committed.
            _ => (ValidationStatus::Invalid, 0.0),
        };

        trace!(
            kind = %candidate.field_kind(),
            value = %candidate.normalized_value(),
            ?status,
            confidence,
            "validated candidate"
        );
        candidate.validated(status, confidence)
    }
}
