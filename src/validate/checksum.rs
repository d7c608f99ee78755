//! Structural checks for government identifiers.

use crate::scheme::IdentifierScheme;

const GSTIN_CHARSET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
// Fourth PAN letter: holder type (person, company, HUF, firm, AOP, trust,
// BOI, local authority, artificial juridical person, government).
const PAN_ENTITY_CODES: &[u8] = b"PCHFATBLJG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanCheck {
    /// Layout holds and the entity code is one the issuer uses.
    Known,
    /// Layout holds but the entity code is unfamiliar.
    UnknownEntity,
    Broken,
}

pub fn check_pan(value: &str) -> PanCheck {
    if !IdentifierScheme::Pan.matches_layout(value) || &value[5..9] == "0000" {
        return PanCheck::Broken;
    }
    if PAN_ENTITY_CODES.contains(&value.as_bytes()[3]) {
        PanCheck::Known
    } else {
        PanCheck::UnknownEntity
    }
}

/// Check character for the first fourteen GSTIN characters (Luhn mod 36).
pub fn gstin_check_character(body: &str) -> Option<char> {
    let mut sum = 0u32;
    for (index, byte) in body.bytes().enumerate() {
        let value = GSTIN_CHARSET.iter().position(|c| *c == byte)? as u32;
        let product = value * if index % 2 == 0 { 1 } else { 2 };
        sum += product / 36 + product % 36;
    }
    let check = (36 - sum % 36) % 36;
    Some(GSTIN_CHARSET[check as usize] as char)
}

pub fn gstin_state_code_known(code: u32) -> bool {
    (1..=38).contains(&code) || code == 97 || code == 99
}

pub fn check_gstin(value: &str) -> bool {
    if !IdentifierScheme::Gstin.matches_layout(value) {
        return false;
    }
    let state = value[..2].parse::<u32>().unwrap_or(0);
    if !gstin_state_code_known(state) {
        return false;
    }
    if check_pan(&value[2..12]) == PanCheck::Broken {
        return false;
    }
    gstin_check_character(&value[..14]) == value[14..].chars().next()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn known_gstins_validate() {
        assert!(check_gstin("27AAPFU0939F1ZV"));
        assert!(check_gstin("29AAGCB7383J1Z4"));
        assert!(!check_gstin("27AAPFU0939F1ZX"));
        assert!(!check_gstin("00AAPFU0939F1ZV"));
        assert!(!check_gstin("27aapfu0939f1zv"));
    }

    #[test]
    fn pan_checks_layout_serial_and_entity() {
        assert_eq!(check_pan("AAPFU0939F"), PanCheck::Known);
        assert_eq!(check_pan("ABCDE1234F"), PanCheck::UnknownEntity);
        assert_eq!(check_pan("ABCPE0000F"), PanCheck::Broken);
        assert_eq!(check_pan("ABCPE123F"), PanCheck::Broken);
        assert_eq!(check_pan("ABCP51234F"), PanCheck::Broken);
    }

    fn charset_char() -> impl Strategy<Value = char> {
        (0usize..36).prop_map(|index| GSTIN_CHARSET[index] as char)
    }

    fn valid_gstin() -> impl Strategy<Value = String> {
        (
            1u32..=38,
            "[A-Z]{3}",
            prop::sample::select(PAN_ENTITY_CODES.to_vec()),
            "[A-Z]",
            1u32..=9999,
            "[A-Z]",
            "[1-9A-Z]",
        )
            .prop_map(|(state, head, entity, initial, serial, last, unit)| {
                let body = format!(
                    "{state:02}{head}{}{initial}{serial:04}{last}{unit}Z",
                    entity as char
                );
                let check = gstin_check_character(&body).unwrap_or('0');
                format!("{body}{check}")
            })
    }

    proptest! {
        #[test]
        fn generated_gstins_validate(gstin in valid_gstin()) {
            prop_assert!(check_gstin(&gstin));
        }

        #[test]
        fn single_character_mutations_break_gstins(
            gstin in valid_gstin(),
            position in 0usize..15,
            replacement in charset_char(),
        ) {
            let original = gstin.as_bytes()[position] as char;
            prop_assume!(original != replacement);
            let mut mutated = gstin.clone();
            mutated.replace_range(position..position + 1, &replacement.to_string());
            prop_assert!(!check_gstin(&mutated));
        }

        // PAN has no published check character, so a substitution that keeps
        // the letter/digit layout (ABCDE1234F -> ABCDF1234F) is undetectable.
        // Only layout-breaking mutations are asserted here.
        #[test]
        fn layout_breaking_pan_mutations_are_rejected(
            pan in "[A-Z]{3}[PCHFATBLJG][A-Z][0-9]{3}[1-9][A-Z]",
            position in 0usize..10,
        ) {
            let mut mutated = pan.clone();
            let replacement = if position >= 5 && position < 9 { "X" } else { "7" };
            mutated.replace_range(position..position + 1, replacement);
            prop_assert_eq!(check_pan(&mutated), PanCheck::Broken);
        }
    }
}
