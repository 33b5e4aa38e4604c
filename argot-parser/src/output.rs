//! Injectable output sinks, so the engine never writes to the console
//! directly.

use std::io::Write;

/// Where the parser writes help, version and error text.
pub trait Output {
    /// Write normal output.
    fn out(&mut self, text: &str);

    /// Write error output.
    fn err(&mut self, text: &str);
}

/// The default sink: standard output and standard error. Write errors are
/// ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

impl Output for Console {
    fn out(&mut self, text: &str) {
        let _ = std::io::stdout().write_all(text.as_bytes());
    }

    fn err(&mut self, text: &str) {
        let _ = std::io::stderr().write_all(text.as_bytes());
    }
}

/// A sink capturing everything in memory, for deterministic tests and
/// embedding.
#[derive(Debug, Clone, Default)]
pub struct StringOutput {
    /// Captured normal output.
    pub output: String,
    /// Captured error output.
    pub error: String,
}

impl StringOutput {
    /// Forget everything captured so far.
    pub fn clear(&mut self) {
        self.output.clear();
        self.error.clear();
    }
}

impl Output for StringOutput {
    fn out(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn err(&mut self, text: &str) {
        self.error.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[test]
    fn it_should_capture_both_streams_separately() {
        let mut sink = StringOutput::default();
        sink.out("normal");
        sink.err("error");

        assert_that!(sink.output.as_str(), eq("normal"));
        assert_that!(sink.error.as_str(), eq("error"));

        sink.clear();
        assert_that!(sink.output.is_empty(), eq(true));
        assert_that!(sink.error.is_empty(), eq(true));
    }
}
