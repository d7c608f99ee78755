use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::FieldKind;

pub const DEFAULT_CURRENCY: &str = "INR";
/// Upper bound for `max_future_days`: one century.
pub const MAX_FUTURE_DAYS_LIMIT: i64 = 36_525;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Anchor for the "not in the far future" check. Without it only the
    /// lower bound of the plausible-date window applies.
    pub reference_date: Option<NaiveDate>,
    pub earliest_plausible_date: NaiveDate,
    pub max_future_days: i64,
    pub out_of_window_penalty: f64,
    pub amount_ceiling_minor: i64,
    /// Amounts in the same currency closer than this are merged. Zero keeps
    /// every distinct value.
    pub amount_merge_tolerance_minor: i64,
    pub default_currency: String,
    pub notice_type_min_score: f64,
    pub low_confidence_threshold: f64,
    pub criticality: CriticalityWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_date: None,
            earliest_plausible_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            max_future_days: 366,
            out_of_window_penalty: 0.5,
            // One thousand crore rupees, in paise.
            amount_ceiling_minor: 10_000_000_000 * 100,
            amount_merge_tolerance_minor: 0,
            default_currency: DEFAULT_CURRENCY.to_string(),
            notice_type_min_score: 0.25,
            low_confidence_threshold: 0.5,
            criticality: CriticalityWeights::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.check()?;
        Ok(config)
    }

    pub fn with_reference_date(mut self, reference_date: NaiveDate) -> Self {
        self.reference_date = Some(reference_date);
        self
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.out_of_window_penalty) {
            return Err(ConfigError::Invalid(format!(
                "out_of_window_penalty must lie in [0, 1], got {}",
                self.out_of_window_penalty
            )));
        }
        if !(0.0..=1.0).contains(&self.notice_type_min_score) {
            return Err(ConfigError::Invalid(format!(
                "notice_type_min_score must lie in [0, 1], got {}",
                self.notice_type_min_score
            )));
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "low_confidence_threshold must lie in [0, 1], got {}",
                self.low_confidence_threshold
            )));
        }
        if self.amount_ceiling_minor <= 0 {
            return Err(ConfigError::Invalid(
                "amount_ceiling_minor must be positive".to_string(),
            ));
        }
        if self.amount_merge_tolerance_minor < 0 {
            return Err(ConfigError::Invalid(
                "amount_merge_tolerance_minor must not be negative".to_string(),
            ));
        }
        if !(0..=MAX_FUTURE_DAYS_LIMIT).contains(&self.max_future_days) {
            return Err(ConfigError::Invalid(format!(
                "max_future_days must lie in [0, {MAX_FUTURE_DAYS_LIMIT}], got {}",
                self.max_future_days
            )));
        }
        if self.default_currency.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_currency must not be empty".to_string(),
            ));
        }
        self.criticality.check()
    }

    /// `None` without a reference date, or when the window reaches past the
    /// last representable date; either way there is no upper bound.
    pub fn latest_plausible_date(&self) -> Option<NaiveDate> {
        let days = u64::try_from(self.max_future_days).ok()?;
        self.reference_date
            .and_then(|date| date.checked_add_days(Days::new(days)))
    }

    pub fn date_is_plausible(&self, date: NaiveDate) -> bool {
        if date < self.earliest_plausible_date {
            return false;
        }
        match self.latest_plausible_date() {
            Some(latest) => date <= latest,
            None => true,
        }
    }
}

/// Importance of each field kind in the overall document confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalityWeights {
    pub client_identifier: f64,
    pub tax_identifier: f64,
    pub notice_type: f64,
    pub notice_date: f64,
    pub monetary_amount: f64,
    pub statutory_section: f64,
    pub issuing_authority: f64,
}

impl Default for CriticalityWeights {
    fn default() -> Self {
        Self {
            client_identifier: 3.0,
            tax_identifier: 3.0,
            notice_type: 2.0,
            notice_date: 2.0,
            monetary_amount: 2.0,
            statutory_section: 1.0,
            issuing_authority: 1.0,
        }
    }
}

impl CriticalityWeights {
    pub fn weight(&self, kind: FieldKind) -> f64 {
        match kind {
            FieldKind::ClientIdentifier => self.client_identifier,
            FieldKind::TaxIdentifier => self.tax_identifier,
            FieldKind::NoticeType => self.notice_type,
            FieldKind::NoticeDate => self.notice_date,
            FieldKind::MonetaryAmount => self.monetary_amount,
            FieldKind::StatutorySection => self.statutory_section,
            FieldKind::IssuingAuthority => self.issuing_authority,
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        for kind in FieldKind::ALL {
            let weight = self.weight(kind);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "criticality weight for {kind} must be a non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }
}
