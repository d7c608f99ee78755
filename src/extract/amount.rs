use regex::{Captures, Regex};

use super::{Extractor, NormalizedPass, compile, parse_minor_units};
use crate::error::EngineError;
use crate::model::{FieldCandidate, FieldKind, FieldValue, Money, Span};

const PREFIXED_BASELINE: f64 = 0.80;
const SUFFIXED_BASELINE: f64 = 0.70;
const KEYWORD_BASELINE: f64 = 0.45;

// Western (12,000) and Indian (1,00,000) grouping, or ungrouped digits.
const NUMBER: &str =
    r"(?P<int>\d{1,3}(?:,\d{3})+|\d{1,3}(?:,\d{2})+,\d{3}|\d+)(?:\.(?P<frac>\d{1,2}))?\b";
const PREFIX_CURRENCY: &str = r"(?P<cur>\b(?:rs\.?|inr|rupees|usd|us\$|eur)|\$|₹|€)";
const SUFFIX_CURRENCY: &str = r"(?P<cur>/-|\brupees\b|\binr\b|\brs\b\.?)";
const KEYWORDS: &str = r"\b(?:penalty|demand|tax payable|amount|sum of|total)\b";
// A keyword-led number belongs to something else when the gap mentions
// one of these.
const FOREIGN_CONTEXT: &str =
    r"(?i)\b(?:section|sec|u/s|rule|year|dated|date|no|number|ward|circle)\b";

/// Currency-marked and keyword-led monetary amounts.
pub struct AmountExtractor {
    default_currency: String,
    prefixed: Regex,
    suffixed: Regex,
    keyword_led: Regex,
    foreign: Regex,
}

impl AmountExtractor {
    pub fn new(default_currency: String) -> Result<Self, EngineError> {
        Ok(Self {
            default_currency,
            prefixed: compile("prefixed amount", &format!(r"(?i){PREFIX_CURRENCY}\s*{NUMBER}"))?,
            suffixed: compile("suffixed amount", &format!(r"(?i)\b{NUMBER}\s*{SUFFIX_CURRENCY}"))?,
            keyword_led: compile(
                "keyword amount",
                &format!(r"(?i){KEYWORDS}(?P<gap>[^0-9\n₹$€]{{0,40}}?)\b{NUMBER}"),
            )?,
            foreign: compile("amount context", FOREIGN_CONTEXT)?,
        })
    }

    fn money(&self, captures: &Captures<'_>, currency: &str) -> Option<Money> {
        let minor = parse_minor_units(
            captures.name("int")?.as_str(),
            captures.name("frac").map(|fraction| fraction.as_str()),
        )?;
        Some(Money::new(minor, currency))
    }

    /// Keyword-led readings are kept even where a currency-marked reading
    /// covers the same digits; they take that reading's currency.
    fn keyword_led(
        &self,
        pass: &NormalizedPass,
        marked: &[(Span, &'static str)],
    ) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        for captures in self.keyword_led.captures_iter(&pass.text) {
            let (Some(gap), Some(number)) = (captures.name("gap"), captures.name("int")) else {
                continue;
            };
            if self.foreign.is_match(gap.as_str()) {
                continue;
            }
            let end = captures
                .name("frac")
                .map(|fraction| fraction.end())
                .unwrap_or(number.end());
            if follows_as_reference(&pass.text[end..]) {
                continue;
            }
            let span = Span::new(number.start(), end);
            let currency: &str = match marked.iter().find(|(other, _)| overlaps(*other, span)) {
                Some((_, currency)) => *currency,
                None => &self.default_currency,
            };
            if let Some(money) = self.money(&captures, currency) {
                candidates.push(pass.candidate(
                    FieldKind::MonetaryAmount,
                    span,
                    FieldValue::Amount(money),
                    KEYWORD_BASELINE,
                ));
            }
        }
        candidates
    }
}

impl Extractor for AmountExtractor {
    fn name(&self) -> &'static str {
        "amount"
    }

    fn produces(&self) -> &'static [FieldKind] {
        &[FieldKind::MonetaryAmount]
    }

    fn extract(&self, pass: &NormalizedPass) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        let mut marked = Vec::new();

        for (pattern, baseline) in [
            (&self.prefixed, PREFIXED_BASELINE),
            (&self.suffixed, SUFFIXED_BASELINE),
        ] {
            for captures in pattern.captures_iter(&pass.text) {
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                let currency = captures
                    .name("cur")
                    .map(|marker| currency_code(marker.as_str()))
                    .unwrap_or("INR");
                let Some(money) = self.money(&captures, currency) else {
                    continue;
                };
                let span = Span::new(whole.start(), whole.end());
                marked.push((span, currency));
                candidates.push(pass.candidate(
                    FieldKind::MonetaryAmount,
                    span,
                    FieldValue::Amount(money),
                    baseline,
                ));
            }
        }

        candidates.extend(self.keyword_led(pass, &marked));
        candidates
    }
}

fn currency_code(marker: &str) -> &'static str {
    match marker.to_lowercase().trim_end_matches('.') {
        "usd" | "us$" | "$" => "USD",
        "eur" | "€" => "EUR",
        _ => "INR",
    }
}

/// Section numbers and dates also follow keywords: "penalty u/s 271(1)",
/// "demand dated 15/01/2023".
fn follows_as_reference(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some('(') => true,
        Some('/' | '-' | '.') => chars.next().is_some_and(|next| next.is_ascii_digit()),
        _ => false,
    }
}

fn overlaps(left: Span, right: Span) -> bool {
    left.start < right.end && right.start < left.end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_markers_map_to_codes() {
        assert_eq!(currency_code("Rs."), "INR");
        assert_eq!(currency_code("₹"), "INR");
        assert_eq!(currency_code("/-"), "INR");
        assert_eq!(currency_code("US$"), "USD");
        assert_eq!(currency_code("€"), "EUR");
    }

    #[test]
    fn references_after_keywords_are_recognized() {
        assert!(follows_as_reference("(1)(c) of the Act"));
        assert!(follows_as_reference("/01/2023"));
        assert!(!follows_as_reference(" is payable"));
        assert!(!follows_as_reference("./-"));
    }
}
