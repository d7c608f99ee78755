use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::{Language, Script};

/// One recognition pass over one page, as handed over by the OCR or
/// translation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub pass_id: String,
    pub language: String,
    #[serde(default = "first_page")]
    pub page: u32,
    pub text: String,
    pub ocr_confidence: f64,
}

fn first_page() -> u32 {
    1
}

impl RecognizedText {
    pub fn new(
        pass_id: impl Into<String>,
        language: impl Into<String>,
        text: impl Into<String>,
        ocr_confidence: f64,
    ) -> Self {
        Self {
            pass_id: pass_id.into(),
            language: language.into(),
            page: 1,
            text: text.into(),
            ocr_confidence,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    ClientIdentifier,
    TaxIdentifier,
    NoticeType,
    NoticeDate,
    MonetaryAmount,
    StatutorySection,
    IssuingAuthority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multi,
}

impl FieldKind {
    pub const ALL: [FieldKind; 7] = [
        FieldKind::ClientIdentifier,
        FieldKind::TaxIdentifier,
        FieldKind::NoticeType,
        FieldKind::NoticeDate,
        FieldKind::MonetaryAmount,
        FieldKind::StatutorySection,
        FieldKind::IssuingAuthority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::ClientIdentifier => "client_identifier",
            FieldKind::TaxIdentifier => "tax_identifier",
            FieldKind::NoticeType => "notice_type",
            FieldKind::NoticeDate => "notice_date",
            FieldKind::MonetaryAmount => "monetary_amount",
            FieldKind::StatutorySection => "statutory_section",
            FieldKind::IssuingAuthority => "issuing_authority",
        }
    }

    pub fn cardinality(self) -> Cardinality {
        match self {
            FieldKind::ClientIdentifier
            | FieldKind::TaxIdentifier
            | FieldKind::NoticeType
            | FieldKind::NoticeDate
            | FieldKind::IssuingAuthority => Cardinality::Single,
            FieldKind::MonetaryAmount | FieldKind::StatutorySection => Cardinality::Multi,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Unchecked,
}

/// Byte range into the normalized text of a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn lies_within(self, text: &str) -> bool {
        self.start <= self.end
            && self.end <= text.len()
            && text.is_char_boundary(self.start)
            && text.is_char_boundary(self.end)
    }
}

/// Fixed-point amount with two decimal places.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    pub minor_units: i64,
    pub currency: String,
}

impl Money {
    pub fn new(minor_units: i64, currency: impl Into<String>) -> Self {
        Self {
            minor_units,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let magnitude = self.minor_units.unsigned_abs();
        write!(
            f,
            "{} {}{}.{:02}",
            self.currency,
            sign,
            magnitude / 100,
            magnitude % 100
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatutoryCitation {
    pub act: Option<String>,
    pub section: String,
    pub subsection: Option<String>,
    pub clause: Option<String>,
}

impl fmt::Display for StatutoryCitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Section {}", self.section)?;
        if let Some(subsection) = &self.subsection {
            write!(f, "({subsection})")?;
        }
        if let Some(clause) = &self.clause {
            write!(f, "({clause})")?;
        }
        if let Some(act) = &self.act {
            write!(f, " of the {act}")?;
        }
        Ok(())
    }
}

/// Normalized value of a candidate. Ordering is total so grouping and
/// tie-breaks never depend on iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Identifier(String),
    Date(NaiveDate),
    Amount(Money),
    Section(StatutoryCitation),
    Authority(String),
    NoticeType(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Identifier(value)
            | FieldValue::Authority(value)
            | FieldValue::NoticeType(value) => f.write_str(value),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            FieldValue::Amount(money) => money.fmt(f),
            FieldValue::Section(citation) => citation.fmt(f),
        }
    }
}

/// An unconfirmed extracted value. Fields are private: a candidate is never
/// edited in place, validation produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    field_kind: FieldKind,
    raw_value: String,
    normalized_value: FieldValue,
    span: Span,
    source_pass_id: String,
    page: u32,
    extractor_confidence: f64,
    validation_status: ValidationStatus,
}

impl FieldCandidate {
    pub fn new(
        field_kind: FieldKind,
        raw_value: impl Into<String>,
        normalized_value: FieldValue,
        span: Span,
        source_pass_id: impl Into<String>,
        page: u32,
        extractor_confidence: f64,
    ) -> Self {
        Self {
            field_kind,
            raw_value: raw_value.into(),
            normalized_value,
            span,
            source_pass_id: source_pass_id.into(),
            page,
            extractor_confidence: clamp_unit(extractor_confidence),
            validation_status: ValidationStatus::Unchecked,
        }
    }

    pub fn field_kind(&self) -> FieldKind {
        self.field_kind
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn normalized_value(&self) -> &FieldValue {
        &self.normalized_value
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn source_pass_id(&self) -> &str {
        &self.source_pass_id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn extractor_confidence(&self) -> f64 {
        self.extractor_confidence
    }

    pub fn validation_status(&self) -> ValidationStatus {
        self.validation_status
    }

    /// Non-zero confidence is what makes a candidate eligible for resolution.
    pub fn is_viable(&self) -> bool {
        self.validation_status != ValidationStatus::Invalid && self.extractor_confidence > 0.0
    }

    pub fn validated(self, status: ValidationStatus, confidence: f64) -> Self {
        let confidence = if status == ValidationStatus::Invalid {
            0.0
        } else {
            clamp_unit(confidence)
        };
        Self {
            validation_status: status,
            extractor_confidence: confidence,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Unanimous,
    Majority,
    HighestConfidence,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedField {
    pub field_kind: FieldKind,
    pub chosen_value: Option<FieldValue>,
    pub confidence: f64,
    pub resolution: Resolution,
    /// Passes whose top candidate carries the chosen value.
    pub support: usize,
    /// Passes that produced at least one viable candidate of this kind.
    pub pass_count: usize,
    pub contributing_candidates: Vec<FieldCandidate>,
    pub alternatives: Vec<FieldCandidate>,
}

impl AggregatedField {
    pub fn is_resolved(&self) -> bool {
        self.resolution != Resolution::Unresolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiValueEntry {
    pub value: FieldValue,
    pub confidence: f64,
    pub first_offset: usize,
    pub candidates: Vec<FieldCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiValuedField {
    pub field_kind: FieldKind,
    pub entries: Vec<MultiValueEntry>,
    pub rejected: Vec<FieldCandidate>,
}

impl MultiValuedField {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.entries.iter().map(|entry| &entry.value)
    }

    pub fn top_confidence(&self) -> Option<f64> {
        self.entries.first().map(|entry| entry.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub pass_id: String,
    pub language: Language,
    pub script: Script,
    pub page_count: usize,
    pub char_count: usize,
    pub ocr_confidence: f64,
    pub candidate_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedPass {
    pub pass_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysisResult {
    pub document_id: String,
    pub aggregated_fields: BTreeMap<FieldKind, AggregatedField>,
    pub multi_valued_fields: BTreeMap<FieldKind, MultiValuedField>,
    pub unresolved_fields: BTreeSet<FieldKind>,
    pub low_confidence_fields: BTreeSet<FieldKind>,
    pub overall_confidence: f64,
    /// The date the notice must be answered by, resolved from deadline-phrased
    /// dates alone. Its kind is `notice_date`; it is not weighted into
    /// `overall_confidence` and is not listed as unresolved when absent.
    pub compliance_deadline: AggregatedField,
    pub passes: Vec<PassSummary>,
    pub dropped_passes: Vec<DroppedPass>,
}

impl DocumentAnalysisResult {
    pub fn field(&self, kind: FieldKind) -> Option<&AggregatedField> {
        self.aggregated_fields.get(&kind)
    }

    pub fn value(&self, kind: FieldKind) -> Option<&FieldValue> {
        self.field(kind).and_then(|field| field.chosen_value.as_ref())
    }

    pub fn compliance_deadline_date(&self) -> Option<NaiveDate> {
        match &self.compliance_deadline.chosen_value {
            Some(FieldValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    pub fn values(&self, kind: FieldKind) -> Vec<&FieldValue> {
        self.multi_valued_fields
            .get(&kind)
            .map(|field| field.values().collect())
            .unwrap_or_default()
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
