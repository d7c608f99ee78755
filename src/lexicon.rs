use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{ConfigError, EngineError};

/// Vocabulary the lexicon-driven extractors and the validator read from.
/// Built once, then shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub office_titles: Vec<String>,
    pub jurisdiction_terms: Vec<String>,
    pub acts: Vec<ActEntry>,
    pub notice_types: Vec<NoticeTypeRule>,
    pub months: Vec<MonthName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeTypeRule {
    pub label: String,
    #[serde(default)]
    pub phrases: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthName {
    pub name: String,
    pub month: u32,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn act(name: &str, aliases: &[&str]) -> ActEntry {
    ActEntry {
        name: name.to_string(),
        aliases: strings(aliases),
    }
}

fn notice_type(label: &str, phrases: &[&str], keywords: &[&str]) -> NoticeTypeRule {
    NoticeTypeRule {
        label: label.to_string(),
        phrases: strings(phrases),
        keywords: strings(keywords),
    }
}

const ENGLISH_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const HINDI_MONTHS: [(&str, u32); 16] = [
    ("जनवरी", 1),
    ("फ़रवरी", 2),
    ("फरवरी", 2),
    ("मार्च", 3),
    ("अप्रैल", 4),
    ("मई", 5),
    ("जून", 6),
    ("जुलाई", 7),
    ("अगस्त", 8),
    ("सितंबर", 9),
    ("सितम्बर", 9),
    ("अक्टूबर", 10),
    ("नवंबर", 11),
    ("नवम्बर", 11),
    ("दिसंबर", 12),
    ("दिसम्बर", 12),
];

const TELUGU_MONTHS: [(&str, u32); 12] = [
    ("జనవరి", 1),
    ("ఫిబ్రవరి", 2),
    ("మార్చి", 3),
    ("ఏప్రిల్", 4),
    ("మే", 5),
    ("జూన్", 6),
    ("జూలై", 7),
    ("ఆగస్టు", 8),
    ("సెప్టెంబర్", 9),
    ("అక్టోబర్", 10),
    ("నవంబర్", 11),
    ("డిసెంబర్", 12),
];

impl Lexicon {
    pub fn builtin() -> Self {
        let mut months = Vec::new();
        for (index, name) in ENGLISH_MONTHS.iter().enumerate() {
            let month = index as u32 + 1;
            months.push(MonthName {
                name: name.to_string(),
                month,
            });
            if name.len() > 3 {
                months.push(MonthName {
                    name: name[..3].to_string(),
                    month,
                });
            }
        }
        months.push(MonthName {
            name: "sept".to_string(),
            month: 9,
        });
        for (name, month) in HINDI_MONTHS.iter().chain(TELUGU_MONTHS.iter()) {
            months.push(MonthName {
                name: name.to_string(),
                month: *month,
            });
        }

        Self {
            office_titles: strings(&[
                "Principal Chief Commissioner of Income Tax",
                "Chief Commissioner of Income Tax",
                "Principal Commissioner of Income Tax",
                "Commissioner of Income Tax",
                "Additional Commissioner of Income Tax",
                "Joint Commissioner of Income Tax",
                "Deputy Commissioner of Income Tax",
                "Assistant Commissioner of Income Tax",
                "Income Tax Officer",
                "Assessing Officer",
                "Tax Recovery Officer",
                "Deputy Commissioner of State Tax",
                "Assistant Commissioner of State Tax",
                "State Tax Officer",
                "Superintendent of Central Tax",
                "Deputy Commissioner",
                "Assistant Commissioner",
                "Joint Commissioner",
                "Commissioner",
                "Superintendent",
                "National Faceless Assessment Centre",
                "Centralized Processing Centre",
                "PCIT",
                "DCIT",
                "ACIT",
                "JCIT",
                "ITO",
                "आयकर अधिकारी",
                "सहायक आयुक्त",
                "उप आयुक्त",
                "आयकर आयुक्त",
                "ఆదాయపు పన్ను అధికారి",
            ]),
            jurisdiction_terms: strings(&[
                "Ward", "Circle", "Range", "Zone", "Division", "Unit", "Charge",
            ]),
            acts: vec![
                act(
                    "Income-tax Act, 1961",
                    &["Income Tax Act", "IT Act", "I.T. Act", "आयकर अधिनियम"],
                ),
                act(
                    "Central Goods and Services Tax Act, 2017",
                    &["CGST Act", "Central GST Act", "GST Act"],
                ),
                act(
                    "Integrated Goods and Services Tax Act, 2017",
                    &["IGST Act"],
                ),
                act(
                    "Telangana Goods and Services Tax Act, 2017",
                    &["TGST Act", "Telangana GST Act"],
                ),
                act(
                    "Wealth-tax Act, 1957",
                    &["Wealth Tax Act"],
                ),
                act(
                    concat!(
                        "Black Money (Undisclosed Foreign Income and Assets) ",
                        "and Imposition of Tax Act, 2015",
                    ),
                    &["Black Money Act"],
                ),
                act(
                    "Prohibition of Benami Property Transactions Act, 1988",
                    &["Benami Act", "Benami Transactions (Prohibition) Act"],
                ),
                act("Customs Act, 1962", &[]),
                act("Central Excise Act, 1944", &[]),
            ],
            notice_types: vec![
                notice_type(
                    "Scrutiny Notice",
                    &["scrutiny notice", "notice under section 143(2)"],
                    &["scrutiny", "examination", "verification", "143(2)", "selected for"],
                ),
                notice_type(
                    "Demand Notice",
                    &["demand notice", "notice of demand"],
                    &["demand", "payable", "outstanding", "156", "arrears", "मांग"],
                ),
                notice_type(
                    "Penalty Notice",
                    &["penalty notice"],
                    &["penalty", "fine", "punishment", "271", "levy", "जुर्माना", "జరిమానా"],
                ),
                notice_type(
                    "Intimation",
                    &["intimation"],
                    &["intimation", "information", "communication", "143(1)", "processed"],
                ),
                notice_type(
                    "Show Cause Notice",
                    &["show cause notice", "show-cause notice"],
                    &["show cause", "should not", "explain", "reply", "hearing"],
                ),
                notice_type(
                    "Assessment Order",
                    &["assessment order"],
                    &[
                        "assessment order",
                        "assessed",
                        "total income",
                        "order under section",
                        "computation",
                    ],
                ),
            ],
            months,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Brings every entry into the same Unicode form the normalizer emits, so
    /// lexicon lookups see what extractors see.
    pub fn prepared(self) -> Result<Self, EngineError> {
        if self.office_titles.is_empty() {
            return Err(EngineError::EmptyLexicon("office titles"));
        }
        if self.notice_types.is_empty() {
            return Err(EngineError::EmptyLexicon("notice types"));
        }
        if self.months.is_empty() {
            return Err(EngineError::EmptyLexicon("month names"));
        }

        let fold = |value: &String| value.nfkc().collect::<String>().trim().to_string();
        let fold_all = |values: &[String]| {
            values
                .iter()
                .map(fold)
                .filter(|value| !value.is_empty())
                .collect::<Vec<String>>()
        };

        Ok(Self {
            office_titles: fold_all(&self.office_titles),
            jurisdiction_terms: fold_all(&self.jurisdiction_terms),
            acts: self
                .acts
                .iter()
                .map(|entry| ActEntry {
                    name: fold(&entry.name),
                    aliases: fold_all(&entry.aliases),
                })
                .collect(),
            notice_types: self
                .notice_types
                .iter()
                .map(|rule| NoticeTypeRule {
                    label: fold(&rule.label),
                    phrases: fold_all(&rule.phrases),
                    keywords: fold_all(&rule.keywords),
                })
                .collect(),
            months: self
                .months
                .iter()
                .filter(|month| (1..=12).contains(&month.month))
                .map(|month| MonthName {
                    name: fold(&month.name),
                    month: month.month,
                })
                .collect(),
        })
    }

    /// Resolves a cited Act name to its canonical entry. A trailing year is
    /// optional on either side.
    pub fn resolve_act(&self, cited: &str) -> Option<&ActEntry> {
        let key = act_key(cited);
        if key.is_empty() {
            return None;
        }
        let key_without_year = strip_year(&key);

        self.acts.iter().find(|entry| {
            std::iter::once(&entry.name)
                .chain(entry.aliases.iter())
                .map(|name| act_key(name))
                .any(|candidate| {
                    candidate == key
                        || strip_year(&candidate) == key
                        || strip_year(&candidate) == key_without_year
                })
        })
    }

    pub fn month_number(&self, name: &str) -> Option<u32> {
        let lowered = name.nfkc().collect::<String>().to_lowercase();
        let trimmed = lowered.trim_end_matches('.');
        self.months
            .iter()
            .find(|month| month.name.to_lowercase() == trimmed)
            .map(|month| month.month)
    }
}

fn act_key(name: &str) -> String {
    name.chars()
        .filter(|character| character.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn strip_year(key: &str) -> &str {
    let trimmed = key.trim_end_matches(|character: char| character.is_ascii_digit());
    if key.len() - trimmed.len() == 4 {
        trimmed
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::builtin().prepared().expect("builtin lexicon is complete")
    }

    #[test]
    fn resolve_act_matches_aliases_with_or_without_year() {
        let lexicon = lexicon();
        let expected = Some("Income-tax Act, 1961");

        assert_eq!(lexicon.resolve_act("Income Tax Act, 1961").map(|a| a.name.as_str()), expected);
        assert_eq!(lexicon.resolve_act("Income-tax Act").map(|a| a.name.as_str()), expected);
        assert_eq!(lexicon.resolve_act("I.T. Act").map(|a| a.name.as_str()), expected);
        assert_eq!(
            lexicon.resolve_act("CGST Act, 2017").map(|a| a.name.as_str()),
            Some("Central Goods and Services Tax Act, 2017")
        );
        assert!(lexicon.resolve_act("Motor Vehicles Act, 1988").is_none());
        assert!(lexicon.resolve_act("").is_none());
    }

    #[test]
    fn month_number_covers_supported_scripts() {
        let lexicon = lexicon();
        assert_eq!(lexicon.month_number("January"), Some(1));
        assert_eq!(lexicon.month_number("Sept."), Some(9));
        assert_eq!(lexicon.month_number("फ़रवरी"), Some(2));
        assert_eq!(lexicon.month_number("అక్టోబర్"), Some(10));
        assert_eq!(lexicon.month_number("Smarch"), None);
    }

    #[test]
    fn prepared_rejects_empty_vocabularies() {
        let empty = Lexicon {
            office_titles: Vec::new(),
            ..Lexicon::builtin()
        };
        assert!(matches!(
            empty.prepared(),
            Err(EngineError::EmptyLexicon("office titles"))
        ));
    }

    #[test]
    fn partial_json_lexicon_keeps_builtin_sections() {
        let lexicon: Lexicon =
            serde_json::from_str(r#"{"acts": [{"name": "Finance Act, 1994"}]}"#).expect("parses");
        assert_eq!(lexicon.acts.len(), 1);
        assert!(!lexicon.office_titles.is_empty());
    }
}
