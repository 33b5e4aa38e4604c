//! Pluggable conversion from raw tokens to typed values.

/// Defines a conversion capability from one raw command-line token to a typed
/// value.
///
/// The associated [`TYPE_NAME`](Value::TYPE_NAME) shows up in conversion
/// diagnostics ("invalid value '42x' for option '--num' (integer)"); leave it
/// empty to drop the hint. Implement this for your own types to bind them
/// directly to flags and positionals.
pub trait Value: Sized {
    /// Human-readable type name used in error messages.
    const TYPE_NAME: &'static str;

    /// Convert a raw token. `None` is reported to the user as a type
    /// mismatch.
    fn parse(raw: &str) -> Option<Self>;
}

impl Value for String {
    const TYPE_NAME: &'static str = "";

    fn parse(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

impl Value for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl Value for f64 {
    const TYPE_NAME: &'static str = "real number";

    fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[test]
    fn it_should_pass_text_through() {
        assert_that!(<String as Value>::parse("anything"), eq(Some("anything".to_string())));
        assert_that!(<String as Value>::parse(""), eq(Some(String::new())));
    }

    #[test]
    fn it_should_convert_integers() {
        assert_that!(<i64 as Value>::parse("42"), eq(Some(42)));
        assert_that!(<i64 as Value>::parse("-42"), eq(Some(-42)));
        assert_that!(<i64 as Value>::parse("42x"), eq(None));
        assert_that!(<i64 as Value>::parse(""), eq(None));
    }

    #[test]
    fn it_should_convert_reals() {
        assert_that!(<f64 as Value>::parse("42.542"), eq(Some(42.542)));
        assert_that!(<f64 as Value>::parse("-42.542"), eq(Some(-42.542)));
        assert_that!(<f64 as Value>::parse("foo"), eq(None));
    }
}
