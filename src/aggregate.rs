//! Cross-pass resolution of candidates into committed values.
//!
//! Inputs are keyed by pass id and every ordering below is total, so the
//! outcome does not depend on the order passes or candidates arrived in.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::{
    AggregatedField, FieldCandidate, FieldKind, FieldValue, MultiValueEntry, MultiValuedField,
    Resolution,
};

pub type CandidatesByPass = BTreeMap<String, Vec<FieldCandidate>>;

/// Resolves a single-valued kind to one canonical value.
pub fn aggregate(field_kind: FieldKind, candidates_by_pass: &CandidatesByPass) -> AggregatedField {
    let mut viable: Vec<&FieldCandidate> = Vec::new();
    let mut rejected: Vec<&FieldCandidate> = Vec::new();
    let mut tops: Vec<&FieldCandidate> = Vec::new();

    for candidates in candidates_by_pass.values() {
        let mut pass_top: Option<&FieldCandidate> = None;
        for candidate in candidates.iter().filter(|c| c.field_kind() == field_kind) {
            if !candidate.is_viable() {
                rejected.push(candidate);
                continue;
            }
            viable.push(candidate);
            pass_top = match pass_top {
                Some(current) if rank(current, candidate) != Ordering::Greater => Some(current),
                _ => Some(candidate),
            };
        }
        tops.extend(pass_top);
    }

    let pass_count = tops.len();
    let mut groups: BTreeMap<&FieldValue, Vec<&FieldCandidate>> = BTreeMap::new();
    for candidate in viable.iter().copied() {
        groups
            .entry(candidate.normalized_value())
            .or_default()
            .push(candidate);
    }

    let mut support: BTreeMap<&FieldValue, usize> = BTreeMap::new();
    for top in tops.iter().copied() {
        *support.entry(top.normalized_value()).or_default() += 1;
    }

    let scored = groups
        .iter()
        .map(|(&value, members)| GroupScore {
            value,
            support: support.get(value).copied().unwrap_or(0),
            best_confidence: members
                .iter()
                .map(|c| c.extractor_confidence())
                .fold(0.0, f64::max),
            longest_span: members.iter().map(|c| c.span().len()).max().unwrap_or(0),
        })
        .collect::<Vec<GroupScore<'_>>>();

    let Some(winner) = scored.iter().min_by(|left, right| left.precedence(right)) else {
        return unresolved(field_kind, rejected);
    };

    let resolution = if scored.len() == 1 {
        Resolution::Unanimous
    } else if scored
        .iter()
        .all(|other| other.value == winner.value || other.support < winner.support)
    {
        Resolution::Majority
    } else {
        Resolution::HighestConfidence
    };

    let confidence = match resolution {
        Resolution::Unanimous => winner.best_confidence,
        _ => {
            winner.best_confidence
                * (0.5 + 0.5 * winner.support as f64 / pass_count.max(1) as f64)
        }
    };

    let chosen = (*winner.value).clone();
    let (contributing, others): (Vec<&FieldCandidate>, Vec<&FieldCandidate>) = viable
        .into_iter()
        .partition(|candidate| *candidate.normalized_value() == chosen);
    let mut alternatives = others;
    alternatives.extend(rejected);

    AggregatedField {
        field_kind,
        chosen_value: Some(chosen),
        confidence,
        resolution,
        support: winner.support,
        pass_count,
        contributing_candidates: sorted_owned(contributing),
        alternatives: sorted_owned(alternatives),
    }
}

fn unresolved(field_kind: FieldKind, rejected: Vec<&FieldCandidate>) -> AggregatedField {
    AggregatedField {
        field_kind,
        chosen_value: None,
        confidence: 0.0,
        resolution: Resolution::Unresolved,
        support: 0,
        pass_count: 0,
        contributing_candidates: Vec::new(),
        alternatives: sorted_owned(rejected),
    }
}

struct GroupScore<'a> {
    value: &'a FieldValue,
    support: usize,
    best_confidence: f64,
    longest_span: usize,
}

impl GroupScore<'_> {
    /// `Less` means `self` is preferred.
    fn precedence(&self, other: &Self) -> Ordering {
        other
            .support
            .cmp(&self.support)
            .then_with(|| other.best_confidence.total_cmp(&self.best_confidence))
            .then_with(|| other.longest_span.cmp(&self.longest_span))
            .then_with(|| self.value.cmp(other.value))
    }
}

/// Preference between two candidates of the same pass. `Less` means
/// `left` is preferred.
fn rank(left: &FieldCandidate, right: &FieldCandidate) -> Ordering {
    right
        .extractor_confidence()
        .total_cmp(&left.extractor_confidence())
        .then_with(|| right.span().len().cmp(&left.span().len()))
        .then_with(|| left.span().start.cmp(&right.span().start))
        .then_with(|| left.normalized_value().cmp(right.normalized_value()))
}

/// Provenance order used wherever candidates are listed.
fn provenance_order(left: &FieldCandidate, right: &FieldCandidate) -> Ordering {
    left.source_pass_id()
        .cmp(right.source_pass_id())
        .then_with(|| left.span().cmp(&right.span()))
        .then_with(|| left.normalized_value().cmp(right.normalized_value()))
        .then_with(|| right.extractor_confidence().total_cmp(&left.extractor_confidence()))
        .then_with(|| left.raw_value().cmp(right.raw_value()))
}

fn sorted_owned(mut candidates: Vec<&FieldCandidate>) -> Vec<FieldCandidate> {
    candidates.sort_by(|left, right| provenance_order(left, right));
    candidates.into_iter().cloned().collect()
}

/// Collects a multi-valued kind into an ordered, de-duplicated sequence.
/// Amounts of the same currency within `merge_tolerance_minor` of a
/// higher-confidence entry fold into it; zero disables merging.
pub fn collect_multi(
    field_kind: FieldKind,
    candidates_by_pass: &CandidatesByPass,
    merge_tolerance_minor: i64,
) -> MultiValuedField {
    let mut groups: BTreeMap<&FieldValue, Vec<&FieldCandidate>> = BTreeMap::new();
    let mut rejected = Vec::new();
    for candidate in candidates_by_pass
        .values()
        .flatten()
        .filter(|c| c.field_kind() == field_kind)
    {
        if candidate.is_viable() {
            groups
                .entry(candidate.normalized_value())
                .or_default()
                .push(candidate);
        } else {
            rejected.push(candidate);
        }
    }

    let mut entries = groups
        .into_iter()
        .map(|(value, members)| MultiValueEntry {
            value: value.clone(),
            confidence: members
                .iter()
                .map(|c| c.extractor_confidence())
                .fold(0.0, f64::max),
            first_offset: members.iter().map(|c| c.span().start).min().unwrap_or(0),
            candidates: sorted_owned(members),
        })
        .collect::<Vec<MultiValueEntry>>();
    entries.sort_by(entry_order);

    if merge_tolerance_minor > 0 {
        entries = merge_near_amounts(entries, merge_tolerance_minor);
        entries.sort_by(entry_order);
    }

    MultiValuedField {
        field_kind,
        entries,
        rejected: sorted_owned(rejected),
    }
}

fn entry_order(left: &MultiValueEntry, right: &MultiValueEntry) -> Ordering {
    right
        .confidence
        .total_cmp(&left.confidence)
        .then_with(|| left.first_offset.cmp(&right.first_offset))
        .then_with(|| first_pass(left).cmp(first_pass(right)))
        .then_with(|| left.value.cmp(&right.value))
}

fn first_pass(entry: &MultiValueEntry) -> &str {
    entry
        .candidates
        .iter()
        .map(FieldCandidate::source_pass_id)
        .min()
        .unwrap_or_default()
}

fn merge_near_amounts(entries: Vec<MultiValueEntry>, tolerance: i64) -> Vec<MultiValueEntry> {
    let mut kept: Vec<MultiValueEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        let target = match &entry.value {
            FieldValue::Amount(money) => kept.iter().position(|existing| match &existing.value {
                FieldValue::Amount(other) => {
                    other.currency == money.currency
                        && other.minor_units.abs_diff(money.minor_units) <= tolerance.unsigned_abs()
                }
                _ => false,
            }),
            _ => None,
        };
        match target {
            Some(index) => {
                let existing = &mut kept[index];
                existing.first_offset = existing.first_offset.min(entry.first_offset);
                existing.candidates.extend(entry.candidates);
                existing.candidates.sort_by(provenance_order);
            }
            None => kept.push(entry),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::model::{Money, Span, ValidationStatus};

    fn candidate(
        pass: &str,
        kind: FieldKind,
        value: FieldValue,
        start: usize,
        confidence: f64,
    ) -> FieldCandidate {
        FieldCandidate::new(
            kind,
            value.to_string(),
            value,
            Span::new(start, start + 10),
            pass,
            1,
            confidence,
        )
    }

    fn by_pass(candidates: Vec<FieldCandidate>) -> CandidatesByPass {
        let mut grouped = CandidatesByPass::new();
        for candidate in candidates {
            grouped
                .entry(candidate.source_pass_id().to_string())
                .or_default()
                .push(candidate);
        }
        grouped
    }

    fn pan(value: &str) -> FieldValue {
        FieldValue::Identifier(value.to_string())
    }

    fn date(day: u32) -> FieldValue {
        FieldValue::Date(NaiveDate::from_ymd_opt(2023, 1, day).expect("date"))
    }

    fn inr(minor: i64) -> FieldValue {
        FieldValue::Amount(Money::new(minor, "INR"))
    }

    #[test]
    fn identical_values_across_passes_are_unanimous() {
        let input = by_pass(vec![
            candidate("a", FieldKind::ClientIdentifier, pan("ABCDE1234F"), 0, 0.7),
            candidate("b", FieldKind::ClientIdentifier, pan("ABCDE1234F"), 4, 0.8),
            candidate("c", FieldKind::ClientIdentifier, pan("ABCDE1234F"), 2, 0.6),
        ]);
        let field = aggregate(FieldKind::ClientIdentifier, &input);

        assert_eq!(field.resolution, Resolution::Unanimous);
        assert_eq!(field.chosen_value, Some(pan("ABCDE1234F")));
        assert_eq!(field.confidence, 0.8);
        assert_eq!(field.support, 3);
        assert_eq!(field.pass_count, 3);
        assert_eq!(field.contributing_candidates.len(), 3);
        assert!(field.alternatives.is_empty());
    }

    #[test]
    fn most_supported_value_wins_by_majority() {
        let input = by_pass(vec![
            candidate("a", FieldKind::NoticeDate, date(15), 0, 0.7),
            candidate("b", FieldKind::NoticeDate, date(15), 0, 0.6),
            candidate("c", FieldKind::NoticeDate, date(16), 0, 0.9),
        ]);
        let field = aggregate(FieldKind::NoticeDate, &input);

        assert_eq!(field.resolution, Resolution::Majority);
        assert_eq!(field.chosen_value, Some(date(15)));
        assert_eq!(field.support, 2);
        assert!((field.confidence - 0.7 * (0.5 + 0.5 * 2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(field.alternatives.len(), 1);
        assert_eq!(field.alternatives[0].normalized_value(), &date(16));
    }

    #[test]
    fn support_tie_falls_back_to_highest_confidence() {
        let input = by_pass(vec![
            candidate("a", FieldKind::NoticeDate, date(15), 0, 0.6),
            candidate("b", FieldKind::NoticeDate, date(16), 0, 0.9),
        ]);
        let field = aggregate(FieldKind::NoticeDate, &input);

        assert_eq!(field.resolution, Resolution::HighestConfidence);
        assert_eq!(field.chosen_value, Some(date(16)));
        assert!((field.confidence - 0.9 * 0.75).abs() < 1e-9);
    }

    #[test]
    fn only_each_pass_top_candidate_counts_as_support() {
        let input = by_pass(vec![
            candidate("a", FieldKind::NoticeDate, date(15), 0, 0.9),
            candidate("a", FieldKind::NoticeDate, date(30), 40, 0.4),
            candidate("b", FieldKind::NoticeDate, date(15), 0, 0.8),
            candidate("b", FieldKind::NoticeDate, date(30), 40, 0.3),
        ]);
        let field = aggregate(FieldKind::NoticeDate, &input);

        assert_eq!(field.chosen_value, Some(date(15)));
        assert_eq!(field.resolution, Resolution::Majority);
        assert_eq!(field.support, 2);
        assert_eq!(field.pass_count, 2);
    }

    #[test]
    fn no_viable_candidates_leaves_the_field_unresolved() {
        let invalid = candidate("a", FieldKind::TaxIdentifier, pan("27AAPFU0939F1ZX"), 0, 0.9)
            .validated(ValidationStatus::Invalid, 0.9);
        let field = aggregate(FieldKind::TaxIdentifier, &by_pass(vec![invalid]));

        assert_eq!(field.resolution, Resolution::Unresolved);
        assert_eq!(field.chosen_value, None);
        assert_eq!(field.confidence, 0.0);
        assert_eq!(field.alternatives.len(), 1);

        let silent = aggregate(FieldKind::IssuingAuthority, &CandidatesByPass::new());
        assert!(!silent.is_resolved());
    }

    #[test]
    fn multi_valued_amounts_order_by_confidence_then_offset() {
        let input = by_pass(vec![
            candidate("a", FieldKind::MonetaryAmount, inr(1_200_000), 10, 0.6),
            candidate("a", FieldKind::MonetaryAmount, inr(500_000), 80, 0.9),
            candidate("b", FieldKind::MonetaryAmount, inr(1_200_000), 12, 0.5),
            candidate("b", FieldKind::MonetaryAmount, inr(300_000), 5, 0.6),
        ]);
        let field = collect_multi(FieldKind::MonetaryAmount, &input, 0);

        assert_eq!(
            field.values().cloned().collect::<Vec<FieldValue>>(),
            vec![inr(500_000), inr(300_000), inr(1_200_000)]
        );
        assert_eq!(field.entries[2].candidates.len(), 2);
        assert_eq!(field.entries[2].first_offset, 10);
        assert_eq!(field.top_confidence(), Some(0.9));
    }

    #[test]
    fn near_amounts_merge_into_the_stronger_entry_when_enabled() {
        let input = by_pass(vec![
            candidate("a", FieldKind::MonetaryAmount, inr(1_200_000), 10, 0.8),
            candidate("b", FieldKind::MonetaryAmount, inr(1_200_050), 3, 0.5),
            candidate(
                "b",
                FieldKind::MonetaryAmount,
                FieldValue::Amount(Money::new(1_200_050, "USD")),
                30,
                0.4,
            ),
        ]);

        let separate = collect_multi(FieldKind::MonetaryAmount, &input, 0);
        assert_eq!(separate.entries.len(), 3);

        let merged = collect_multi(FieldKind::MonetaryAmount, &input, 100);
        assert_eq!(merged.entries.len(), 2);
        assert_eq!(merged.entries[0].value, inr(1_200_000));
        assert_eq!(merged.entries[0].first_offset, 3);
        assert_eq!(merged.entries[0].candidates.len(), 2);
    }

    fn arbitrary_candidate() -> impl Strategy<Value = FieldCandidate> {
        (
            prop::sample::select(vec!["p1", "p2", "p3", "p4"]),
            10u32..=14,
            0usize..50,
            0.0f64..=1.0,
        )
            .prop_map(|(pass, day, start, confidence)| {
                candidate(pass, FieldKind::NoticeDate, date(day), start, confidence)
            })
    }

    proptest! {
        #[test]
        fn aggregation_ignores_arrival_order(
            candidates in prop::collection::vec(arbitrary_candidate(), 0..12),
        ) {
            let forward = by_pass(candidates.clone());
            let backward = by_pass(candidates.into_iter().rev().collect());

            prop_assert_eq!(
                aggregate(FieldKind::NoticeDate, &forward),
                aggregate(FieldKind::NoticeDate, &backward)
            );
            prop_assert_eq!(
                collect_multi(FieldKind::NoticeDate, &forward, 0),
                collect_multi(FieldKind::NoticeDate, &backward, 0)
            );
        }
    }
}
