use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use super::*;
use crate::model::{Money, StatutoryCitation};

fn extractors() -> ExtractorSet {
    let lexicon = Lexicon::builtin().prepared().expect("builtin lexicon");
    ExtractorSet::new(Arc::new(lexicon), &EngineConfig::default()).expect("extractors build")
}

fn of_kind(candidates: &[FieldCandidate], kind: FieldKind) -> Vec<(FieldValue, f64)> {
    candidates
        .iter()
        .filter(|candidate| candidate.field_kind() == kind)
        .map(|candidate| {
            (
                candidate.normalized_value().clone(),
                candidate.extractor_confidence(),
            )
        })
        .collect()
}

fn close(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

#[test]
fn identifiers_are_labelled_and_gstin_yields_embedded_pan() {
    let pass = NormalizedPass::single_page("p1", "PAN: ABCDE1234F\nGSTIN: 27AAPFU0939F1ZV", 1.0);
    let candidates = extractors().extract_all(&pass);

    let clients = of_kind(&candidates, FieldKind::ClientIdentifier);
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].0, FieldValue::Identifier("ABCDE1234F".to_string()));
    assert!(close(clients[0].1, 0.85));
    assert_eq!(clients[1].0, FieldValue::Identifier("AAPFU0939F".to_string()));
    assert!(close(clients[1].1, 0.50));

    let tax = of_kind(&candidates, FieldKind::TaxIdentifier);
    assert_eq!(tax.len(), 1);
    assert_eq!(tax[0].0, FieldValue::Identifier("27AAPFU0939F1ZV".to_string()));
    assert!(close(tax[0].1, 0.90));
}

#[test]
fn identifier_label_must_be_a_whole_word() {
    let pass = NormalizedPass::single_page("p1", "Company ref ABCDE1234F", 1.0);
    let clients = of_kind(&extractors().extract_all(&pass), FieldKind::ClientIdentifier);
    assert_eq!(clients.len(), 1);
    assert!(close(clients[0].1, 0.70));
}

#[test]
fn ocr_confidence_discounts_candidates() {
    let pass = NormalizedPass::single_page("p1", "ABCDE1234F", 0.0);
    let clients = of_kind(&extractors().extract_all(&pass), FieldKind::ClientIdentifier);
    assert!(close(clients[0].1, 0.35));
}

#[test]
fn dates_use_labels_and_deadline_context() {
    let text = "Dated: 15/01/2023\nPlease reply on or before 30 January 2023.";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let dates = of_kind(&extractors().extract_all(&pass), FieldKind::NoticeDate);

    let issued = NaiveDate::from_ymd_opt(2023, 1, 15).expect("date");
    let deadline = NaiveDate::from_ymd_opt(2023, 1, 30).expect("date");
    assert_eq!(dates.len(), 2);
    assert_eq!(dates[0].0, FieldValue::Date(issued));
    assert!(close(dates[0].1, 0.80));
    assert_eq!(dates[1].0, FieldValue::Date(deadline));
    assert!(close(dates[1].1, 0.45));
}

#[test]
fn deadline_readings_come_only_from_deadline_phrases() {
    let text = "Dated: 15/01/2023\n\
                Please reply on or before 30 January 2023.\n\
                Due date: 05/02/2023";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let deadlines = extractors().extract_deadlines(&pass);

    let values = of_kind(&deadlines, FieldKind::NoticeDate);
    assert_eq!(values.len(), deadlines.len());
    assert_eq!(
        values.iter().map(|(value, _)| value.clone()).collect::<Vec<_>>(),
        vec![
            FieldValue::Date(NaiveDate::from_ymd_opt(2023, 2, 5).expect("date")),
            FieldValue::Date(NaiveDate::from_ymd_opt(2023, 1, 30).expect("date")),
        ]
    );
    assert!(close(values[0].1, 0.80));
    assert!(close(values[1].1, 0.90));
}

#[test]
fn dates_accept_iso_month_first_and_reject_impossible_days() {
    let text = "issued 2023-03-05, hearing March 7, 2023, void 31/02/2023, mixed 01/02-2023";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let dates = of_kind(&extractors().extract_all(&pass), FieldKind::NoticeDate)
        .into_iter()
        .map(|(value, _)| value)
        .collect::<Vec<FieldValue>>();

    assert_eq!(
        dates,
        vec![
            FieldValue::Date(NaiveDate::from_ymd_opt(2023, 3, 5).expect("date")),
            FieldValue::Date(NaiveDate::from_ymd_opt(2023, 3, 7).expect("date")),
        ]
    );
}

#[test]
fn dates_in_hindi_month_names() {
    let pass = NormalizedPass::from_pages(
        "hin",
        Language::Hindi,
        Script::Devanagari,
        1.0,
        vec![(1, "दिनांक 15 जनवरी 2023".to_string())],
    );
    let dates = of_kind(&extractors().extract_all(&pass), FieldKind::NoticeDate);
    assert_eq!(dates.len(), 1);
    assert_eq!(
        dates[0].0,
        FieldValue::Date(NaiveDate::from_ymd_opt(2023, 1, 15).expect("date"))
    );
    assert!(close(dates[0].1, 0.90));
}

#[test]
fn amounts_from_prefix_suffix_and_keywords() {
    let text = "Demand of Rs. 1,50,000 is raised.\nPenalty: 5,000.\nInterest ₹ 2,345.50\nFee 750/-";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let amounts = of_kind(&extractors().extract_all(&pass), FieldKind::MonetaryAmount);

    let inr = |minor| FieldValue::Amount(Money::new(minor, "INR"));
    assert_eq!(
        amounts.iter().map(|(value, _)| value.clone()).collect::<Vec<_>>(),
        vec![
            inr(15_000_000),
            inr(234_550),
            inr(75_000),
            inr(15_000_000),
            inr(500_000),
        ]
    );
    assert!(close(amounts[0].1, 0.80));
    assert!(close(amounts[2].1, 0.70));
    assert!(close(amounts[3].1, 0.45));
    assert!(close(amounts[4].1, 0.45));
}

#[test]
fn overlapping_amount_readings_are_all_kept() {
    let text = "Penalty of Rs. 5,000 imposed. Late fee Rs. 750/-";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let candidates = extractors().extract_all(&pass);
    let spans = candidates
        .iter()
        .filter(|candidate| candidate.field_kind() == FieldKind::MonetaryAmount)
        .map(|candidate| (candidate.raw_value().to_string(), candidate.extractor_confidence()))
        .collect::<Vec<_>>();

    assert_eq!(
        spans.iter().map(|(raw, _)| raw.as_str()).collect::<Vec<&str>>(),
        vec!["Rs. 5,000", "Rs. 750", "750/-", "5,000"]
    );
    assert!(close(spans[3].1, 0.45));
}

#[test]
fn keyword_led_amount_takes_the_overlapping_currency() {
    let pass = NormalizedPass::single_page("p1", "Penalty USD 500 levied", 1.0);
    let amounts = of_kind(&extractors().extract_all(&pass), FieldKind::MonetaryAmount);
    let usd = FieldValue::Amount(Money::new(50_000, "USD"));
    assert_eq!(
        amounts.iter().map(|(value, _)| value.clone()).collect::<Vec<_>>(),
        vec![usd.clone(), usd]
    );
}

#[test]
fn keyword_led_numbers_skip_section_and_year_references() {
    let text = "penalty u/s 271(1)(c) for assessment year 2023";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let amounts = of_kind(&extractors().extract_all(&pass), FieldKind::MonetaryAmount);
    assert!(amounts.is_empty());
}

#[test]
fn sections_resolve_acts_and_subdivisions() {
    let text = "notice under section 143(2) of the Income Tax Act, 1961 and u/s 271(1)(c)";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let sections = of_kind(&extractors().extract_all(&pass), FieldKind::StatutorySection);

    assert_eq!(
        sections[0].0,
        FieldValue::Section(StatutoryCitation {
            act: Some("Income-tax Act, 1961".to_string()),
            section: "143".to_string(),
            subsection: Some("2".to_string()),
            clause: None,
        })
    );
    assert!(close(sections[0].1, 0.80));
    assert_eq!(
        sections[1].0,
        FieldValue::Section(StatutoryCitation {
            act: None,
            section: "271".to_string(),
            subsection: Some("1".to_string()),
            clause: Some("c".to_string()),
        })
    );
    assert!(close(sections[1].1, 0.50));
    assert_eq!(sections.len(), 2);
}

#[test]
fn section_lists_share_the_trailing_act() {
    let text = "Sections 143(3) and 144B of the CGST Act";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let sections = of_kind(&extractors().extract_all(&pass), FieldKind::StatutorySection);

    let numbers = sections
        .iter()
        .map(|(value, _)| match value {
            FieldValue::Section(citation) => (citation.section.clone(), citation.act.clone()),
            other => panic!("unexpected value {other:?}"),
        })
        .collect::<Vec<_>>();
    let act = Some("Central Goods and Services Tax Act, 2017".to_string());
    assert_eq!(
        numbers,
        vec![("143".to_string(), act.clone()), ("144B".to_string(), act)]
    );
}

#[test]
fn authority_extends_title_with_jurisdiction_and_place() {
    let text = "Office of the Income Tax Officer, Ward 2(1), Hyderabad\nTo the assessee";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let authorities = of_kind(&extractors().extract_all(&pass), FieldKind::IssuingAuthority);

    assert_eq!(authorities.len(), 1);
    assert_eq!(
        authorities[0].0,
        FieldValue::Authority("Income Tax Officer, Ward 2(1), Hyderabad".to_string())
    );
    assert!(close(authorities[0].1, 0.80));
}

#[test]
fn notice_type_scores_keyword_overlap_and_phrases() {
    let text = "Notice under section 143(2): your return has been selected for scrutiny.";
    let pass = NormalizedPass::single_page("p1", text, 1.0);
    let types = of_kind(&extractors().extract_all(&pass), FieldKind::NoticeType);

    assert_eq!(types.len(), 1);
    assert_eq!(types[0].0, FieldValue::NoticeType("Scrutiny Notice".to_string()));
    assert!(close(types[0].1, 0.85));
}

#[test]
fn candidates_carry_their_page() {
    let pass = NormalizedPass::from_pages(
        "p1",
        Language::English,
        Script::Latin,
        1.0,
        vec![
            (1, "first page".to_string()),
            (2, "PAN ABCDE1234F".to_string()),
        ],
    );
    let candidates = extractors().extract_all(&pass);
    let pan = candidates
        .iter()
        .find(|candidate| candidate.field_kind() == FieldKind::ClientIdentifier)
        .expect("pan candidate");
    assert_eq!(pan.page(), 2);
    assert_eq!(pan.raw_value(), "ABCDE1234F");
    assert_eq!(&pass.text[pan.span().start..pan.span().end], "ABCDE1234F");
}

#[test]
fn every_kind_has_a_declaring_extractor() {
    let set = extractors();
    for kind in FieldKind::ALL {
        assert!(set.extractor_for(kind).produces().contains(&kind));
    }
}

#[test]
fn parse_minor_units_handles_grouping_and_fractions() {
    assert_eq!(parse_minor_units("1,00,000", None), Some(10_000_000));
    assert_eq!(parse_minor_units("12,000", Some("5")), Some(1_200_050));
    assert_eq!(parse_minor_units("99999999999999999999", None), None);
}

#[test]
fn term_alternation_puts_longest_terms_first() {
    let pattern = term_alternation(&["Ward", "Ward Office", "143(2)"]);
    assert_eq!(pattern, r"\bWard\s+Office\b|\b143\(2\)|\bWard\b");
}
