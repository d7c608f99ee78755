use std::sync::Arc;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::{Extractor, NormalizedPass, compile, term_alternation};
use crate::error::EngineError;
use crate::lexicon::Lexicon;
use crate::model::{FieldCandidate, FieldKind, FieldValue, Span};

const NUMERIC_BASELINE: f64 = 0.60;
const ISO_BASELINE: f64 = 0.65;
const SPELLED_BASELINE: f64 = 0.70;
const LABEL_BONUS: f64 = 0.20;
const DEADLINE_PENALTY: f64 = 0.25;
const DEADLINE_BONUS: f64 = 0.20;
const CONTEXT_WINDOW: usize = 32;
// Two-digit years up to this value belong to the 2000s.
const CENTURY_PIVOT: i32 = 68;

const LABELS: &str = r"(?i)(?:\bdated\b|\bdate\b|\bdt\b\.?|\bon\b|दिनांक|తేదీ)\s*[:\-]?\s*$";
const DEADLINE: &str =
    r"(?i)(?:on or before|due date|last date|not later than|\bwithin\b|\bbefore\b|अंतिम तिथि)";

#[derive(Debug, Clone, Copy)]
enum Order {
    DayMonthYear,
    YearMonthDay,
}

/// Numeric and spelled-month date recognizer. Values are normalized to
/// calendar dates; plausibility is left to validation.
pub struct DateExtractor {
    lexicon: Arc<Lexicon>,
    numeric: Regex,
    iso: Regex,
    spelled_day_first: Regex,
    spelled_month_first: Regex,
    label: Regex,
    deadline: Regex,
}

impl DateExtractor {
    pub fn new(lexicon: Arc<Lexicon>) -> Result<Self, EngineError> {
        let months = lexicon
            .months
            .iter()
            .map(|month| month.name.as_str())
            .collect::<Vec<&str>>();
        let months = term_alternation(&months);

        Ok(Self {
            numeric: compile(
                "numeric date",
                r"\b(\d{1,2})([/.\-])(\d{1,2})([/.\-])(\d{2}|\d{4})\b",
            )?,
            iso: compile("iso date", r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b")?,
            spelled_day_first: compile(
                "spelled date",
                &format!(
                    concat!(
                        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?(?:\s+of)?[\s\-/]+",
                        r"({months})\.?,?[\s\-/]+(\d{{4}})\b",
                    ),
                    months = months,
                ),
            )?,
            spelled_month_first: compile(
                "spelled date",
                &format!(r"(?i)({months})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"),
            )?,
            label: compile("date label", LABELS)?,
            deadline: compile("deadline phrase", DEADLINE)?,
            lexicon,
        })
    }

    fn context_adjustment(&self, pass: &NormalizedPass, start: usize) -> f64 {
        let line = line_before(pass, start);
        let mut adjustment = 0.0;
        if self.label.is_match(line) {
            adjustment += LABEL_BONUS;
        }
        if self.deadline.is_match(line) {
            adjustment -= DEADLINE_PENALTY;
        }
        adjustment
    }

    /// Dates introduced by a deadline phrase on their own line ("on or
    /// before", "due date", ...). These are the notice date kind with the
    /// deadline phrase counted for them rather than against them.
    pub fn deadlines(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        self.found(pass)
            .into_iter()
            .filter(|(span, _, _)| self.deadline.is_match(line_before(pass, span.start)))
            .map(|(span, date, baseline)| {
                let confidence = baseline + DEADLINE_BONUS;
                pass.candidate(FieldKind::NoticeDate, span, FieldValue::Date(date), confidence)
            })
            .collect()
    }

    fn found(&self, pass: &NormalizedPass) -> Vec<(Span, NaiveDate, f64)> {
        let mut found = Vec::new();
        self.numeric_dates(pass, &mut found);
        self.spelled_dates(pass, &mut found);
        found
    }

    fn numeric_dates(&self, pass: &NormalizedPass, out: &mut Vec<(Span, NaiveDate, f64)>) {
        for captures in self.numeric.captures_iter(&pass.text) {
            if captures[2] != captures[4] {
                continue;
            }
            let Some(date) = numeric_date(&captures, Order::DayMonthYear) else {
                continue;
            };
            if let Some(span) = whole_span(&captures) {
                out.push((span, date, NUMERIC_BASELINE));
            }
        }
        for captures in self.iso.captures_iter(&pass.text) {
            let Some(date) = numeric_date(&captures, Order::YearMonthDay) else {
                continue;
            };
            if let Some(span) = whole_span(&captures) {
                out.push((span, date, ISO_BASELINE));
            }
        }
    }

    fn spelled_dates(&self, pass: &NormalizedPass, out: &mut Vec<(Span, NaiveDate, f64)>) {
        for captures in self.spelled_day_first.captures_iter(&pass.text) {
            let date = self
                .lexicon
                .month_number(&captures[2])
                .and_then(|month| calendar_date(&captures[3], month, &captures[1]));
            if let (Some(date), Some(span)) = (date, whole_span(&captures)) {
                out.push((span, date, SPELLED_BASELINE));
            }
        }
        for captures in self.spelled_month_first.captures_iter(&pass.text) {
            let date = self
                .lexicon
                .month_number(&captures[1])
                .and_then(|month| calendar_date(&captures[3], month, &captures[2]));
            if let (Some(date), Some(span)) = (date, whole_span(&captures)) {
                out.push((span, date, SPELLED_BASELINE));
            }
        }
    }
}

impl Extractor for DateExtractor {
    fn name(&self) -> &'static str {
        "date"
    }

    fn produces(&self) -> &'static [FieldKind] {
        &[FieldKind::NoticeDate]
    }

    fn extract(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        self.found(pass)
            .into_iter()
            .map(|(span, date, baseline)| {
                let confidence = baseline + self.context_adjustment(pass, span.start);
                pass.candidate(FieldKind::NoticeDate, span, FieldValue::Date(date), confidence)
            })
            .collect()
    }
}

fn line_before(pass: &NormalizedPass, start: usize) -> &str {
    let window = pass.before(start, CONTEXT_WINDOW);
    window.rsplit('\n').next().unwrap_or(window)
}

fn whole_span(captures: &Captures<'_>) -> Option<Span> {
    captures
        .get(0)
        .map(|whole| Span::new(whole.start(), whole.end()))
}

fn numeric_date(captures: &Captures<'_>, order: Order) -> Option<NaiveDate> {
    match order {
        Order::DayMonthYear => {
            let month = captures[3].parse::<u32>().ok()?;
            calendar_date(&captures[5], month, &captures[1])
        }
        Order::YearMonthDay => {
            let month = captures[2].parse::<u32>().ok()?;
            calendar_date(&captures[1], month, &captures[3])
        }
    }
}

fn calendar_date(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    let day = day.parse::<u32>().ok()?;
    let mut year = year.parse::<i32>().ok()?;
    if year < 100 {
        year += if year <= CENTURY_PIVOT { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_digit_years_pivot_into_the_right_century() {
        assert_eq!(
            calendar_date("23", 1, "15"),
            NaiveDate::from_ymd_opt(2023, 1, 15)
        );
        assert_eq!(
            calendar_date("98", 12, "01"),
            NaiveDate::from_ymd_opt(1998, 12, 1)
        );
        assert_eq!(calendar_date("2023", 2, "30"), None);
    }
}
