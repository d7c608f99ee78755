use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Latin,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Unknown,
}

const INDIC_BLOCKS: [(Script, u32, u32); 8] = [
    (Script::Devanagari, 0x0900, 0x097F),
    (Script::Bengali, 0x0980, 0x09FF),
    (Script::Gurmukhi, 0x0A00, 0x0A7F),
    (Script::Gujarati, 0x0A80, 0x0AFF),
    (Script::Tamil, 0x0B80, 0x0BFF),
    (Script::Telugu, 0x0C00, 0x0C7F),
    (Script::Kannada, 0x0C80, 0x0CFF),
    (Script::Malayalam, 0x0D00, 0x0D7F),
];

// Offset of the native digit zero inside each Indic block.
const NATIVE_DIGIT_ZERO_OFFSET: u32 = 0x66;

impl Script {
    pub fn of(character: char) -> Option<Script> {
        let code = u32::from(character);
        if character.is_ascii_alphabetic() || (0x00C0..=0x024F).contains(&code) {
            return Some(Script::Latin);
        }

        INDIC_BLOCKS
            .iter()
            .find(|(_, start, end)| (*start..=*end).contains(&code))
            .map(|(script, _, _)| *script)
    }

    pub fn is_indic(self) -> bool {
        !matches!(self, Script::Latin | Script::Unknown)
    }
}

/// Maps a native Indic digit to its ASCII counterpart.
pub fn fold_native_digit(character: char) -> Option<char> {
    let code = u32::from(character);
    INDIC_BLOCKS.iter().find_map(|(_, start, _)| {
        let zero = start + NATIVE_DIGIT_ZERO_OFFSET;
        if (zero..zero + 10).contains(&code) {
            char::from_digit(code - zero, 10)
        } else {
            None
        }
    })
}

/// Dominant script by letter count; digits and punctuation do not vote.
pub fn detect_script(text: &str) -> Script {
    let mut counts = [0usize; 9];
    let order = [
        Script::Latin,
        Script::Devanagari,
        Script::Bengali,
        Script::Gurmukhi,
        Script::Gujarati,
        Script::Tamil,
        Script::Telugu,
        Script::Kannada,
        Script::Malayalam,
    ];

    for character in text.chars() {
        if fold_native_digit(character).is_some() {
            continue;
        }
        if let Some(script) = Script::of(character) {
            if let Some(index) = order.iter().position(|candidate| *candidate == script) {
                counts[index] += 1;
            }
        }
    }

    // Indic text routinely embeds Latin identifiers and amounts, so any
    // meaningful Indic share outweighs the Latin count.
    let indic_best = (1..order.len())
        .filter(|index| counts[*index] > 0)
        .max_by(|left, right| counts[*left].cmp(&counts[*right]).then(right.cmp(left)));
    if let Some(index) = indic_best {
        let total = counts.iter().sum::<usize>();
        if counts[index] * 5 >= total {
            return order[index];
        }
    }

    if counts[0] > 0 {
        Script::Latin
    } else {
        Script::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Hindi,
    Marathi,
    Bengali,
    Punjabi,
    Gujarati,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Unknown,
}

impl Language {
    pub fn script(self) -> Script {
        match self {
            Language::English => Script::Latin,
            Language::Hindi | Language::Marathi => Script::Devanagari,
            Language::Bengali => Script::Bengali,
            Language::Punjabi => Script::Gurmukhi,
            Language::Gujarati => Script::Gujarati,
            Language::Tamil => Script::Tamil,
            Language::Telugu => Script::Telugu,
            Language::Kannada => Script::Kannada,
            Language::Malayalam => Script::Malayalam,
            Language::Unknown => Script::Unknown,
        }
    }

    pub fn from_script(script: Script) -> Language {
        match script {
            Script::Latin => Language::English,
            Script::Devanagari => Language::Hindi,
            Script::Bengali => Language::Bengali,
            Script::Gurmukhi => Language::Punjabi,
            Script::Gujarati => Language::Gujarati,
            Script::Tamil => Language::Tamil,
            Script::Telugu => Language::Telugu,
            Script::Kannada => Language::Kannada,
            Script::Malayalam => Language::Malayalam,
            Script::Unknown => Language::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Marathi => "mr",
            Language::Bengali => "bn",
            Language::Punjabi => "pa",
            Language::Gujarati => "gu",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::Kannada => "kn",
            Language::Malayalam => "ml",
            Language::Unknown => "unknown",
        }
    }

    fn from_code(code: &str) -> Option<Language> {
        let language = match code {
            "en" | "eng" | "english" => Language::English,
            "hi" | "hin" | "hindi" => Language::Hindi,
            "mr" | "mar" | "marathi" => Language::Marathi,
            "bn" | "ben" | "bengali" => Language::Bengali,
            "pa" | "pan" | "punjabi" => Language::Punjabi,
            "gu" | "guj" | "gujarati" => Language::Gujarati,
            "ta" | "tam" | "tamil" => Language::Tamil,
            "te" | "tel" | "telugu" => Language::Telugu,
            "kn" | "kan" | "kannada" => Language::Kannada,
            "ml" | "mal" | "malayalam" => Language::Malayalam,
            _ => return None,
        };
        Some(language)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageHint {
    Known(Language),
    Auto,
    Unrecognized,
}

impl LanguageHint {
    /// Accepts ISO 639-1 codes, Tesseract codes and `+`-joined Tesseract
    /// specs, where the first listed language is the primary one.
    pub fn parse(tag: &str) -> LanguageHint {
        let lowered = tag.trim().to_ascii_lowercase();
        if lowered.is_empty() || lowered == "auto" {
            return LanguageHint::Auto;
        }

        let primary = lowered
            .split('+')
            .next()
            .unwrap_or("")
            .split(['-', '_'])
            .next()
            .unwrap_or("");

        match Language::from_code(primary) {
            Some(language) => LanguageHint::Known(language),
            None => LanguageHint::Unrecognized,
        }
    }
}
