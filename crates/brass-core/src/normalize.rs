//! Canonical comparison keys for command names.
//!
//! Every command token typed by a user, and every name or alias declared by a
//! command, is folded into a *canonical key* before it touches the registry:
//!
//! 1. ASCII digits `1..=9` are transliterated to the letter at that position
//!    of [`EXTENDED_ALPHABET`] (so `p1ng` reads as `pang`);
//! 2. the text is lower-cased;
//! 3. everything outside `[a-z0-9]` is dropped.
//!
//! ```rust
//! use brass_core::normalize::normalize;
//!
//! assert_eq!(normalize("P1NG!"), "pang");
//! assert_eq!(normalize("Help-Me"), "helpme");
//! ```
//!
//! Digits `4` and `9` map to `ç` and `ğ`, which step 3 removes again. Names
//! intended for end users should not depend on those letters.

/// The 29-letter extended Latin alphabet used for digit transliteration.
pub const EXTENDED_ALPHABET: [char; 29] = [
    'a', 'b', 'c', 'ç', 'd', 'e', 'f', 'g', 'ğ', 'h', 'ı', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'ö',
    'p', 'r', 's', 'ş', 't', 'u', 'ü', 'v', 'y', 'z',
];

/// Maps a single ASCII digit to its alphabet letter; other characters pass through.
///
/// `0` has no position in the alphabet and is returned unchanged.
pub fn transliterate_digit(ch: char) -> char {
    match ch.to_digit(10) {
        Some(position @ 1..) => EXTENDED_ALPHABET
            .get(position as usize - 1)
            .copied()
            .unwrap_or(ch),
        _ => ch,
    }
}

/// Applies [`transliterate_digit`] to every character of `text`.
pub fn transliterate_digits(text: &str) -> String {
    text.chars().map(transliterate_digit).collect()
}

/// Lower-cases `text` and keeps only `[a-z0-9]`.
pub fn retain_ascii_alnum(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Converts raw text into its canonical key.
///
/// Empty input yields an empty key.
pub fn normalize(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    for ch in text.chars().map(transliterate_digit) {
        key.extend(
            ch.to_lowercase()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
        );
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_maps_to_alphabet_position() {
        assert_eq!(transliterate_digit('1'), 'a');
        assert_eq!(transliterate_digit('3'), 'c');
        assert_eq!(transliterate_digit('4'), 'ç');
        assert_eq!(transliterate_digit('6'), 'e');
        assert_eq!(transliterate_digit('9'), 'ğ');
        assert_eq!(transliterate_digit('0'), '0');
        assert_eq!(transliterate_digit('x'), 'x');
    }

    #[test]
    fn test_leetspeak_collapses_to_letters() {
        assert_eq!(normalize("p1ng"), normalize("pang"));
        assert_eq!(normalize("h6lp"), "help");
    }

    #[test]
    fn test_non_ascii_targets_are_stripped() {
        assert_eq!(normalize("b4t"), "bt");
        assert_eq!(normalize("9"), "");
        assert_eq!(normalize("çğış"), "");
    }

    #[test]
    fn test_zero_passes_through() {
        assert_eq!(normalize("v0te"), "v0te");
    }

    #[test]
    fn test_case_and_symbols() {
        assert_eq!(normalize("  Ping!! "), "ping");
        assert_eq!(normalize("Set_Prefix"), "setprefix");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_output_alphabet() {
        let inputs = ["Héllo Wörld 123", "!!!", "ÇAĞRI-9", "A1B2C3", "\u{130}stanbul"];
        for input in inputs {
            let key = normalize(input);
            assert!(
                key.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
                "{input:?} produced {key:?}"
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let inputs = ["p1ng", "PING", "0x10", "Héllo-123", "", "9999", "a0b0"];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn test_helpers_compose_to_normalize() {
        for input in ["P1ng", "h3llo w0rld", "Ölçü"] {
            assert_eq!(
                retain_ascii_alnum(&transliterate_digits(input)),
                normalize(input)
            );
        }
    }
}
