use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::model::{
    AggregatedField, Cardinality, DocumentAnalysisResult, DroppedPass, FieldKind,
    MultiValuedField, PassSummary, Resolution,
};

/// Per-document outputs of aggregation, before scoring.
#[derive(Debug, Default)]
pub struct FieldOutcomes {
    pub single: BTreeMap<FieldKind, AggregatedField>,
    pub multi: BTreeMap<FieldKind, MultiValuedField>,
    pub compliance_deadline: Option<AggregatedField>,
}

/// Composes the final result. Every field kind appears exactly once, in the
/// single- or multi-valued map according to its cardinality. The compliance
/// deadline is carried through unscored.
pub fn assemble(
    document_id: &str,
    outcomes: FieldOutcomes,
    passes: Vec<PassSummary>,
    dropped_passes: Vec<DroppedPass>,
    config: &EngineConfig,
) -> DocumentAnalysisResult {
    let FieldOutcomes {
        mut single,
        mut multi,
        compliance_deadline,
    } = outcomes;

    let mut aggregated_fields = BTreeMap::new();
    let mut multi_valued_fields = BTreeMap::new();
    let mut unresolved_fields = BTreeSet::new();
    let mut low_confidence_fields = BTreeSet::new();
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for kind in FieldKind::ALL {
        let resolved_confidence = match kind.cardinality() {
            Cardinality::Single => {
                let field = single.remove(&kind).unwrap_or_else(|| empty_single(kind));
                let confidence = field.is_resolved().then_some(field.confidence);
                aggregated_fields.insert(kind, field);
                confidence
            }
            Cardinality::Multi => {
                let field = multi.remove(&kind).unwrap_or_else(|| MultiValuedField {
                    field_kind: kind,
                    entries: Vec::new(),
                    rejected: Vec::new(),
                });
                let confidence = field.top_confidence();
                multi_valued_fields.insert(kind, field);
                confidence
            }
        };

        match resolved_confidence {
            Some(confidence) => {
                let weight = config.criticality.weight(kind);
                weighted += weight * confidence;
                total_weight += weight;
                if confidence < config.low_confidence_threshold {
                    low_confidence_fields.insert(kind);
                }
            }
            None => {
                unresolved_fields.insert(kind);
            }
        }
    }

    let overall_confidence = if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    };

    DocumentAnalysisResult {
        document_id: document_id.to_string(),
        aggregated_fields,
        multi_valued_fields,
        unresolved_fields,
        low_confidence_fields,
        overall_confidence,
        compliance_deadline: compliance_deadline
            .unwrap_or_else(|| empty_single(FieldKind::NoticeDate)),
        passes,
        dropped_passes,
    }
}

fn empty_single(field_kind: FieldKind) -> AggregatedField {
    AggregatedField {
        field_kind,
        chosen_value: None,
        confidence: 0.0,
        resolution: Resolution::Unresolved,
        support: 0,
        pass_count: 0,
        contributing_candidates: Vec::new(),
        alternatives: Vec::new(),
    }
}
