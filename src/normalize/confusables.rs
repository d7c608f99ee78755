use crate::scheme::{IdentifierScheme, SlotClass};

// Letter look-alikes read where a digit belongs.
const DIGIT_LOOKALIKES: [(char, char); 8] = [
    ('O', '0'),
    ('o', '0'),
    ('I', '1'),
    ('l', '1'),
    ('|', '1'),
    ('Z', '2'),
    ('S', '5'),
    ('B', '8'),
];

// Digit look-alikes read where an uppercase letter belongs.
const LETTER_LOOKALIKES: [(char, char); 5] = [
    ('0', 'O'),
    ('1', 'I'),
    ('2', 'Z'),
    ('5', 'S'),
    ('8', 'B'),
];

const NUMERIC_SEPARATORS: [char; 4] = [',', '.', '/', '-'];

fn as_digit(character: char) -> Option<char> {
    DIGIT_LOOKALIKES
        .iter()
        .find(|(from, _)| *from == character)
        .map(|(_, to)| *to)
}

fn as_letter(character: char) -> Option<char> {
    LETTER_LOOKALIKES
        .iter()
        .find(|(from, _)| *from == character)
        .map(|(_, to)| *to)
}

fn in_numeric_run(character: char) -> bool {
    character.is_ascii_digit()
        || as_digit(character).is_some()
        || NUMERIC_SEPARATORS.contains(&character)
}

/// Repairs look-alike characters inside windows where digits are expected.
/// Every substitution is ASCII for ASCII, so byte offsets are preserved.
pub(crate) fn repair_line(line: &str) -> String {
    let mut characters = line.chars().collect::<Vec<char>>();
    repair_identifier_windows(&mut characters);
    repair_numeric_windows(&mut characters);
    characters.into_iter().collect()
}

fn is_boundary(characters: &[char], index: Option<usize>) -> bool {
    match index {
        Some(index) => characters
            .get(index)
            .map(|character| !character.is_alphanumeric() && *character != '|')
            .unwrap_or(true),
        None => true,
    }
}

fn repair_numeric_windows(characters: &mut [char]) {
    let mut index = 0usize;
    while index < characters.len() {
        if !in_numeric_run(characters[index]) {
            index += 1;
            continue;
        }

        let run_start = index;
        while index < characters.len() && in_numeric_run(characters[index]) {
            index += 1;
        }
        let mut start = run_start;
        let mut end = index;
        while start < end && NUMERIC_SEPARATORS.contains(&characters[start]) {
            start += 1;
        }
        while end > start && NUMERIC_SEPARATORS.contains(&characters[end - 1]) {
            end -= 1;
        }
        if start == end {
            continue;
        }

        if !is_boundary(characters, start.checked_sub(1)) || !is_boundary(characters, Some(end)) {
            continue;
        }

        if numeric_window_is_repairable(&characters[start..end]) {
            for character in &mut characters[start..end] {
                if let Some(digit) = as_digit(*character) {
                    *character = digit;
                }
            }
        }
    }
}

fn numeric_window_is_repairable(window: &[char]) -> bool {
    let digits = window
        .iter()
        .filter(|character| character.is_ascii_digit())
        .count();
    let lookalikes = window
        .iter()
        .filter(|character| as_digit(**character).is_some())
        .count();
    if lookalikes == 0 || digits < 2 || lookalikes > digits {
        return false;
    }

    // A look-alike only counts as a misread digit when it touches a digit or a
    // separator; "SO12" is more likely a word glued to a number.
    window.iter().enumerate().all(|(position, character)| {
        if as_digit(*character).is_none() {
            return true;
        }
        let left = position.checked_sub(1).and_then(|left| window.get(left));
        let right = window.get(position + 1);
        [left, right].into_iter().flatten().any(|neighbour| {
            neighbour.is_ascii_digit() || NUMERIC_SEPARATORS.contains(neighbour)
        })
    })
}

fn repair_identifier_windows(characters: &mut [char]) {
    let mut index = 0usize;
    while index < characters.len() {
        if !characters[index].is_ascii_alphanumeric() && characters[index] != '|' {
            index += 1;
            continue;
        }

        let start = index;
        while index < characters.len()
            && (characters[index].is_ascii_alphanumeric() || characters[index] == '|')
        {
            index += 1;
        }
        let end = index;

        if !is_boundary(characters, start.checked_sub(1)) || !is_boundary(characters, Some(end)) {
            continue;
        }

        let Some(scheme) = IdentifierScheme::by_len(end - start) else {
            continue;
        };
        if let Some(repaired) = coerce_to_layout(&characters[start..end], scheme) {
            characters[start..end].copy_from_slice(&repaired);
        }
    }
}

/// Coerces a token onto an identifier layout, or returns `None` when the
/// token already matches, cannot match, or carries too little digit evidence.
pub(crate) fn coerce_to_layout(token: &[char], scheme: IdentifierScheme) -> Option<Vec<char>> {
    let mut repaired = Vec::with_capacity(token.len());
    let mut real_digits = 0usize;
    let mut changed = false;

    for (character, slot) in token.iter().copied().zip(scheme.slots()) {
        let fixed = match slot {
            SlotClass::Digit => {
                if character.is_ascii_digit() {
                    real_digits += 1;
                    character
                } else {
                    as_digit(character)?
                }
            }
            SlotClass::Letter => {
                if character.is_ascii_uppercase() {
                    character
                } else {
                    as_letter(character)?
                }
            }
            SlotClass::Alphanumeric => {
                if character.is_ascii_uppercase() || character.is_ascii_digit() {
                    character
                } else {
                    return None;
                }
            }
            SlotClass::Literal(expected) => {
                if character == expected {
                    character
                } else if as_letter(character) == Some(expected)
                    || as_digit(character) == Some(expected)
                {
                    expected
                } else {
                    return None;
                }
            }
        };
        changed |= fixed != character;
        repaired.push(fixed);
    }

    if !changed || real_digits < 2 {
        return None;
    }
    Some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_window_repairs_misread_zero() {
        assert_eq!(repair_line("Rs. 12,00O/-"), "Rs. 12,000/-");
        assert_eq!(repair_line("dated 1O/O3/2O23"), "dated 10/03/2023");
        assert_eq!(repair_line("amount l5,000"), "amount 15,000");
    }

    #[test]
    fn numeric_window_leaves_words_and_glued_tokens_alone() {
        assert_eq!(repair_line("SOLD OIL BOSS"), "SOLD OIL BOSS");
        assert_eq!(repair_line("SO12 remains"), "SO12 remains");
        assert_eq!(repair_line("Form 26AS"), "Form 26AS");
        assert_eq!(repair_line("Rs5O0"), "Rs5O0");
    }

    #[test]
    fn identifier_window_coerces_pan_digit_slots() {
        assert_eq!(repair_line("PAN: ABCDE12S4F"), "PAN: ABCDE1254F");
        assert_eq!(repair_line("PAN: ABCDEl234F"), "PAN: ABCDE1234F");
        assert_eq!(repair_line("PAN: A8CDE1234F"), "PAN: ABCDE1234F");
    }

    #[test]
    fn identifier_window_requires_digit_evidence() {
        assert_eq!(repair_line("COMMISSION"), "COMMISSION");
        assert_eq!(repair_line("ASSESSMENT"), "ASSESSMENT");
    }

    #[test]
    fn identifier_window_coerces_gstin_literal_slot() {
        assert_eq!(repair_line("27AAPFU0939F12V"), "27AAPFU0939F1ZV");
    }
}
