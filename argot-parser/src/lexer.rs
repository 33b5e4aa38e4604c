//! Classification of raw command-line tokens.

/// The token that forces every later token into positional classification.
pub const DELIMITER: &str = "--";

/// Evaluate if the token string represents a number, i.e. an optionally
/// negative integer or real, with an optional exponent.
pub fn is_number(input: &str) -> bool {
    let mut position_of_e = None;
    let mut have_seen_dot = false;

    // Remove the front sign if any.
    let input = input.trim_start_matches('-');

    for (i, c) in input.bytes().enumerate() {
        match c {
            // Digits, OK.
            b'0'..=b'9' => {}

            // Exponent, OK if not the first character.
            b'e' | b'E' if position_of_e.is_none() && i > 0 => {
                position_of_e = Some(i);
            }

            // A sign is valid right after the exponent.
            b'+' | b'-' if position_of_e.is_some_and(|pos| pos + 1 == i) => {}

            // Dot is valid if unique, not the first character and before any
            // exponent.
            b'.' if !have_seen_dot && position_of_e.is_none() && i > 0 => {
                have_seen_dot = true;
            }

            _ => return false,
        }
    }

    if position_of_e.is_some() {
        // The exponent needs at least one digit after it.
        input.bytes().last().is_some_and(|c| c.is_ascii_digit())
    } else {
        true
    }
}

/// Evaluate if a token classifies as flag-form.
///
/// `digit_shorts` widens the classification: once any registered short option
/// is a digit, negative numbers must be read as flags rather than values.
pub fn looks_like_flag(input: &str, digit_shorts: bool) -> bool {
    if input == DELIMITER || input.len() < 2 || !input.starts_with('-') {
        return false;
    }

    if !digit_shorts && is_number(input) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[test]
    fn it_should_match_numbers() {
        for token in ["2", "-2", "2.", "-2.", "2.e1", "-2.e1", "2e1", "1e-5", "-1.5e+10"] {
            assert_that!(is_number(token), eq(true));
        }
    }

    #[test]
    fn it_should_reject_non_numbers() {
        for token in ["x", "2x", "e5", "2e", "2e-", ".5", "2.5.1", "1e2e3"] {
            assert_that!(is_number(token), eq(false));
        }
    }

    #[test]
    fn it_should_classify_options() {
        assert_that!(looks_like_flag("-f", false), eq(true));
        assert_that!(looks_like_flag("--flag", false), eq(true));
        assert_that!(looks_like_flag("-fvvv", false), eq(true));
    }

    #[test]
    fn it_should_classify_values() {
        assert_that!(looks_like_flag("plain", false), eq(false));
        assert_that!(looks_like_flag("-", false), eq(false));
        assert_that!(looks_like_flag("--", false), eq(false));
        assert_that!(looks_like_flag("-42", false), eq(false));
        assert_that!(looks_like_flag("-52.2", false), eq(false));
    }

    #[test]
    fn it_should_read_negative_numbers_as_options_with_digit_shorts() {
        assert_that!(looks_like_flag("-42", true), eq(true));
    }
}
