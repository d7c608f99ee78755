use serde::{Deserialize, Serialize};

use crate::model::FieldKind;

/// Government identifier schemes recognized on notices.
///
/// Layout characters: `L` uppercase letter, `D` digit, `A` letter or digit,
/// any other character is a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierScheme {
    Pan,
    Gstin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClass {
    Letter,
    Digit,
    Alphanumeric,
    Literal(char),
}

impl IdentifierScheme {
    pub const ALL: [IdentifierScheme; 2] = [IdentifierScheme::Pan, IdentifierScheme::Gstin];

    pub fn layout(self) -> &'static str {
        match self {
            IdentifierScheme::Pan => "LLLLLDDDDL",
            IdentifierScheme::Gstin => "DDLLLLLDDDDLAZA",
        }
    }

    pub fn field_kind(self) -> FieldKind {
        match self {
            IdentifierScheme::Pan => FieldKind::ClientIdentifier,
            IdentifierScheme::Gstin => FieldKind::TaxIdentifier,
        }
    }

    pub fn pattern(self) -> &'static str {
        match self {
            IdentifierScheme::Pan => r"\b[A-Z]{5}[0-9]{4}[A-Z]\b",
            IdentifierScheme::Gstin => r"\b[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]\b",
        }
    }

    pub fn labels(self) -> &'static [&'static str] {
        match self {
            IdentifierScheme::Pan => &[
                "pan",
                "permanent account number",
                "स्थायी खाता संख्या",
                "पैन",
            ],
            IdentifierScheme::Gstin => &[
                "gstin",
                "gst no",
                "gst number",
                "gstin/uin",
                "जीएसटीआईएन",
            ],
        }
    }

    pub fn len(self) -> usize {
        self.layout().len()
    }

    pub fn slots(self) -> impl Iterator<Item = SlotClass> {
        self.layout().chars().map(|slot| match slot {
            'L' => SlotClass::Letter,
            'D' => SlotClass::Digit,
            'A' => SlotClass::Alphanumeric,
            literal => SlotClass::Literal(literal),
        })
    }

    pub fn matches_layout(self, value: &str) -> bool {
        value.chars().count() == self.len()
            && value.chars().zip(self.slots()).all(|(character, slot)| match slot {
                SlotClass::Letter => character.is_ascii_uppercase(),
                SlotClass::Digit => character.is_ascii_digit(),
                SlotClass::Alphanumeric => {
                    character.is_ascii_uppercase() || character.is_ascii_digit()
                }
                SlotClass::Literal(expected) => character == expected,
            })
    }

    pub fn by_len(len: usize) -> Option<IdentifierScheme> {
        Self::ALL.into_iter().find(|scheme| scheme.len() == len)
    }
}
