//! The matching engine: one left-to-right pass over the token stream that
//! classifies each token, binds it to a descriptor and validates it on the
//! way in.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::args::{ArgSet, Descriptor, FlagSpec, Handle};
use crate::help;
use crate::lexer;
use crate::output::{Console, Output};

/// Defines the possible errors that may occur while matching a token stream
/// against the registered descriptors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An option token did not resolve to any registered flag.
    #[error("invalid option '{0}'")]
    InvalidOption(String),

    /// A flag received fewer values than it consumes, or a clustered flag
    /// taking values was not last in its group.
    #[error("option '{name}' requires {num} argument(s)")]
    NotEnoughValues {
        /// The option as it appeared on the command line.
        name: String,
        /// How many values one occurrence consumes.
        num: usize,
    },

    /// `--name=value` used on a flag that does not take exactly one value.
    #[error("'=' cannot be used with option '{name}': it takes {num} argument(s)")]
    InvalidAssignment {
        /// The option as it appeared on the command line.
        name: String,
        /// How many values one occurrence consumes.
        num: usize,
    },

    /// A supplied value is not in the descriptor's allowed set.
    #[error("invalid value '{value}' for {subject}: possible values are {}", .choices.join(", "))]
    InvalidChoice {
        /// The rejected token.
        value: String,
        /// The argument it was meant for, e.g. "option '--mode'".
        subject: String,
        /// Every allowed value, in declaration order.
        choices: Vec<String>,
    },

    /// A supplied value failed conversion to the bound type.
    #[error("invalid value '{value}' for {subject}{}", type_hint(.type_name))]
    InvalidValue {
        /// The rejected token.
        value: String,
        /// The argument it was meant for.
        subject: String,
        /// The bound type's name, empty when it has none.
        type_name: &'static str,
    },

    /// A required positional received no token at all.
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    /// A positional token arrived with no descriptor left to take it.
    #[error("superfluous argument '{0}'")]
    SuperfluousArgument(String),
}

fn type_hint(type_name: &str) -> String {
    if type_name.is_empty() {
        String::new()
    } else {
        format!(" ({type_name})")
    }
}

/// Successful result of a parse.
#[derive(Debug)]
pub enum Outcome {
    /// Every token was matched and validated.
    Complete(ArgSet),
    /// A halting descriptor fired, or extra positionals were tolerated; the
    /// unconsumed tokens are in [`ArgSet::remaining`].
    Halted(ArgSet),
}

impl Outcome {
    /// Whether the scan stopped before consuming the whole stream.
    pub fn halted(&self) -> bool {
        matches!(self, Outcome::Halted(_))
    }

    /// The populated argument set.
    pub fn args(&self) -> &ArgSet {
        match self {
            Outcome::Complete(set) | Outcome::Halted(set) => set,
        }
    }

    /// Consume the outcome, keeping the argument set.
    pub fn into_args(self) -> ArgSet {
        match self {
            Outcome::Complete(set) | Outcome::Halted(set) => set,
        }
    }
}

/// Orchestrates one full parse: configuration knobs, the built-in `--help`
/// and `--version` flags, the matching loop and error reporting.
pub struct Parser {
    program: String,
    version: Option<String>,
    add_help: bool,
    exit_on_error: bool,
    error_on_extra_args: bool,
    output: Rc<RefCell<dyn Output>>,
    exit: Box<dyn FnMut(i32)>,
}

impl Parser {
    /// Create a parser for the given program name. The name only shows up in
    /// generated usage and help text.
    pub fn new(program: impl Into<String>) -> Self {
        Parser {
            program: program.into(),
            version: None,
            add_help: true,
            exit_on_error: true,
            error_on_extra_args: true,
            output: Rc::new(RefCell::new(Console)),
            exit: Box::new(|status| std::process::exit(status)),
        }
    }

    /// Enable the built-in `--version` flag, printing the given string.
    pub fn version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
    }

    /// Toggle the built-in `--help`/`-h` flag. On by default.
    pub fn add_help(&mut self, add_help: bool) {
        self.add_help = add_help;
    }

    /// When on (the default), a fatal error invokes the exit hook with
    /// status 1 after reporting. When off, the error is only returned.
    pub fn exit_on_error(&mut self, exit_on_error: bool) {
        self.exit_on_error = exit_on_error;
    }

    /// When off, positional tokens with no descriptor left become an
    /// implicit halt instead of an error, so wrapper commands can relay
    /// everything from the first unknown token onwards.
    pub fn error_on_extra_args(&mut self, error_on_extra_args: bool) {
        self.error_on_extra_args = error_on_extra_args;
    }

    /// Replace the output sink. Standard output and error by default.
    pub fn output(&mut self, output: Rc<RefCell<dyn Output>>) {
        self.output = output;
    }

    /// Replace the exit hook invoked for `--help`, `--version` and fatal
    /// errors. The default really terminates the process.
    pub fn exit_with(&mut self, exit: impl FnMut(i32) + 'static) {
        self.exit = Box::new(exit);
    }

    /// Build a fresh argument set with the built-in flags registered ahead
    /// of everything else. Configure the parser before calling this.
    pub fn args(&self) -> ArgSet {
        let mut set = ArgSet::new();

        if self.add_help {
            let handle = set.flag(
                "help",
                Some('h'),
                FlagSpec {
                    help: "Show this help message and exit".into(),
                    halt: true,
                    ..FlagSpec::default()
                },
            );
            set.help_requested = Some(handle);
        }

        if self.version.is_some() {
            let handle = set.flag(
                "version",
                None,
                FlagSpec {
                    help: "Show version string and exit".into(),
                    halt: true,
                    ..FlagSpec::default()
                },
            );
            set.version_requested = Some(handle);
        }

        set
    }

    /// Run the matching engine over `argv` (program name excluded).
    ///
    /// On a fatal error the message and a usage line go to the error sink,
    /// the exit hook fires with status 1 when [`exit_on_error`] is on, and
    /// the error is returned. Halting is not an error: `--help`,
    /// `--version`, halting descriptors and tolerated extra arguments all
    /// yield [`Outcome::Halted`].
    ///
    /// [`exit_on_error`]: Parser::exit_on_error
    pub fn parse<I, S>(&mut self, set: ArgSet, argv: I) -> Result<Outcome, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let mut set = set;

        match self.execute(&mut set, &argv) {
            Ok(true) => Ok(Outcome::Halted(set)),
            Ok(false) => Ok(Outcome::Complete(set)),
            Err(error) => {
                self.report(&set, &error);
                if self.exit_on_error {
                    (self.exit)(1);
                }
                Err(error)
            }
        }
    }

    /// Parse the process's own argument vector.
    pub fn parse_env(&mut self, set: ArgSet) -> Result<Outcome, Error> {
        self.parse(set, std::env::args().skip(1))
    }

    fn execute(&mut self, set: &mut ArgSet, argv: &[String]) -> Result<bool, Error> {
        let halted = self.scan(set, argv)?;

        if set.help_requested.as_ref().is_some_and(Handle::get) {
            let text = help::render(set, &self.program);
            self.output.borrow_mut().out(&text);
            (self.exit)(0);
            return Ok(true);
        }

        if set.version_requested.as_ref().is_some_and(Handle::get) {
            {
                let mut sink = self.output.borrow_mut();
                sink.out(self.version.as_deref().unwrap_or_default());
                sink.out("\n");
            }
            (self.exit)(0);
            return Ok(true);
        }

        if halted {
            return Ok(true);
        }

        // Halting skips this on purpose: truncation is presumed intentional.
        for positional in &set.positionals {
            if !positional.optional && positional.count == 0 {
                return Err(Error::MissingArgument(positional.name.clone()));
            }
        }

        Ok(false)
    }

    /// The classification loop. Returns whether a halting descriptor fired.
    fn scan(&mut self, set: &mut ArgSet, argv: &[String]) -> Result<bool, Error> {
        let digit_shorts = set.digit_shorts();

        // Count the tokens that will classify as positionals, so variadic
        // positionals know when to stop absorbing. Values later consumed by
        // flags are indistinguishable up front and inflate the count.
        let mut positionals_left = 0usize;
        let mut behind_delimiter = false;
        for arg in argv {
            if arg == lexer::DELIMITER {
                behind_delimiter = true;
            } else if behind_delimiter || !lexer::looks_like_flag(arg, digit_shorts) {
                positionals_left += 1;
            }
        }

        let mut positionals_required = set
            .positionals
            .iter()
            .filter(|positional| !positional.optional)
            .count();

        let mut after_delimiter = false;
        let mut halted = false;
        let mut positional_idx = 0usize;
        let mut idx = 0usize;

        while idx < argv.len() {
            let arg = &argv[idx];
            trace!(token = %arg, "next token");

            if arg == lexer::DELIMITER {
                // A repeated delimiter explicitly closes the current
                // positional, so batches can be grouped by hand.
                if after_delimiter {
                    positional_idx += 1;
                }
                after_delimiter = true;
                idx += 1;
                continue;
            }

            if !after_delimiter && lexer::looks_like_flag(arg, digit_shorts) {
                let consumed = match_flag(set, argv, idx, digit_shorts, &mut halted)?;
                idx += 1 + consumed;
            } else if positional_idx < set.positionals.len() {
                let positional = &mut set.positionals[positional_idx];
                trace!(name = %positional.name, token = %arg, "positional");

                let subject = format!("argument '{}'", positional.name);
                feed(positional, &subject, arg)?;

                let (halts, many, optional) =
                    (positional.halt, positional.many, positional.optional);

                if halts {
                    halted = true;
                    set.remaining = argv[idx + 1..].to_vec();
                } else if !many || positionals_left == positionals_required {
                    // Exactly enough tokens are left to give every later
                    // required positional its minimum, so stop absorbing.
                    if !optional {
                        positionals_required -= 1;
                    }
                    positional_idx += 1;
                }

                positionals_left -= 1;
                idx += 1;
            } else if self.error_on_extra_args {
                return Err(Error::SuperfluousArgument(arg.clone()));
            } else {
                trace!(count = argv.len() - idx, "forwarding extra tokens");
                halted = true;
                set.remaining = argv[idx..].to_vec();
            }

            if halted {
                break;
            }
        }

        Ok(halted)
    }

    fn report(&mut self, set: &ArgSet, error: &Error) {
        let mut sink = self.output.borrow_mut();
        sink.err(&format!("{error}\n"));
        sink.err(&format!("Usage: {}\n", help::usage(set, &self.program)));
    }
}

/// Resolve one flag-form token, apply its values and advance. Returns how
/// many extra tokens were consumed as values.
fn match_flag(
    set: &mut ArgSet,
    argv: &[String],
    idx: usize,
    digit_shorts: bool,
    halted: &mut bool,
) -> Result<usize, Error> {
    let arg = &argv[idx];
    let mut values: Vec<&str> = Vec::new();
    let flag_idx: usize;
    let display: String;

    if let Some(long) = arg.strip_prefix("--") {
        if let Some((name, value)) = long.split_once('=') {
            trace!(name = %name, "long option with inline value");
            let position = set
                .long_position(name)
                .ok_or_else(|| Error::InvalidOption(format!("--{name}")))?;

            let num = set.flags[position].num;
            if num != 1 {
                return Err(Error::InvalidAssignment {
                    name: format!("--{name}"),
                    num,
                });
            }

            values.push(value);
            flag_idx = position;
            display = format!("--{name}");
        } else {
            trace!(name = %long, "long option");
            flag_idx = set
                .long_position(long)
                .ok_or_else(|| Error::InvalidOption(arg.clone()))?;
            display = arg.clone();
        }
    } else {
        let body = &arg[1..];
        let first = body.chars().next().unwrap_or_default();
        let position = set
            .short_position(first)
            .ok_or_else(|| Error::InvalidOption(first.to_string()))?;

        if set.flags[position].num == 1 && body.chars().count() > 1 {
            // Glued value: -fVALUE. The remainder is one value, never
            // rescanned for more options.
            trace!(option = %first, "short option with glued value");
            values.push(&body[first.len_utf8()..]);
            flag_idx = position;
            display = first.to_string();
        } else {
            // A cluster: every option except the last must take no values.
            let shorts: Vec<char> = body.chars().collect();
            for &short in &shorts[..shorts.len() - 1] {
                trace!(option = %short, "clustered option");
                let position = set
                    .short_position(short)
                    .ok_or_else(|| Error::InvalidOption(short.to_string()))?;

                let clustered = &mut set.flags[position];
                if clustered.num != 0 {
                    return Err(Error::NotEnoughValues {
                        name: short.to_string(),
                        num: clustered.num,
                    });
                }

                clustered.parse("");
                let halts = clustered.halt;
                if halts {
                    // Finish the whole token first so none of it leaks into
                    // the remaining buffer.
                    trace!(option = %short, "halt inside cluster");
                    *halted = true;
                    set.remaining = argv[idx + 1..].to_vec();
                }
            }

            let last = shorts[shorts.len() - 1];
            flag_idx = set
                .short_position(last)
                .ok_or_else(|| Error::InvalidOption(last.to_string()))?;
            display = last.to_string();
        }
    }

    let mut consumed = 0usize;
    let num = set.flags[flag_idx].num;

    if num == 0 {
        set.flags[flag_idx].parse("");
    } else {
        if values.is_empty() {
            let end = (idx + 1).saturating_add(num).min(argv.len());
            for candidate in &argv[idx + 1..end] {
                if lexer::looks_like_flag(candidate, digit_shorts) {
                    break;
                }
                values.push(candidate);
            }
            consumed = values.len();
            trace!(option = %display, count = consumed, "gathered values");
        }

        if values.len() < num {
            return Err(Error::NotEnoughValues { name: display, num });
        }

        if !set.flags[flag_idx].collect {
            trace!(option = %display, "reset");
            set.flags[flag_idx].reset();
        }

        let subject = format!("option '{display}'");
        for value in &values {
            feed(&mut set.flags[flag_idx], &subject, value)?;
        }
    }

    if set.flags[flag_idx].halt {
        trace!(option = %display, "halt");
        *halted = true;
        set.remaining = argv[idx + 1 + consumed..].to_vec();
    }

    Ok(consumed)
}

/// The two-phase validation every matched token goes through: the choice set
/// first, on the raw string, then type conversion into the bound storage.
fn feed(descriptor: &mut dyn Descriptor, subject: &str, raw: &str) -> Result<(), Error> {
    if !descriptor.choices().is_empty() && !descriptor.choices().iter().any(|choice| choice == raw) {
        return Err(Error::InvalidChoice {
            value: raw.to_owned(),
            subject: subject.to_owned(),
            choices: descriptor.choices().to_vec(),
        });
    }

    if !descriptor.parse(raw) {
        return Err(Error::InvalidValue {
            value: raw.to_owned(),
            subject: subject.to_owned(),
            type_name: descriptor.type_name(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use crate::args::PositionalSpec;
    use crate::output::StringOutput;

    use super::*;

    fn recording(program: &str) -> (Parser, Rc<RefCell<StringOutput>>, Rc<RefCell<Option<i32>>>) {
        let sink = Rc::new(RefCell::new(StringOutput::default()));
        let status = Rc::new(RefCell::new(None));

        let mut parser = Parser::new(program);
        parser.output(sink.clone());
        let recorded = status.clone();
        parser.exit_with(move |code| *recorded.borrow_mut() = Some(code));

        (parser, sink, status)
    }

    #[test]
    fn it_should_halt_and_stash_the_rest_verbatim() {
        let (mut parser, _, _) = recording("test");
        let mut args = parser.args();
        let stop = args.flag("stop", Some('s'), FlagSpec { halt: true, ..FlagSpec::default() });
        args.positional::<String>("pos", PositionalSpec::default());

        let outcome = parser.parse(args, ["--stop", "a", "-b", "--c"]).unwrap();

        assert_that!(outcome.halted(), eq(true));
        assert_that!(stop.get(), eq(true));
        assert_that!(
            outcome.args().remaining(),
            eq(&["a".to_string(), "-b".to_string(), "--c".to_string()][..])
        );
    }

    #[test]
    fn it_should_skip_required_checks_after_a_halt() {
        let (mut parser, _, status) = recording("test");
        let mut args = parser.args();
        args.flag("stop", None, FlagSpec { halt: true, ..FlagSpec::default() });
        args.positional::<String>("needed", PositionalSpec::default());

        let outcome = parser.parse(args, ["--stop"]).unwrap();

        assert_that!(outcome.halted(), eq(true));
        assert_that!(*status.borrow(), eq(None));
    }

    #[test]
    fn it_should_halt_from_inside_a_cluster() {
        let (mut parser, _, _) = recording("test");
        let mut args = parser.args();
        let stop = args.flag("stop", Some('s'), FlagSpec { halt: true, ..FlagSpec::default() });
        let verbose = args.count("verbose", Some('v'), FlagSpec::default());

        let outcome = parser.parse(args, ["-sv", "rest"]).unwrap();

        // The whole token is finished before the halt takes effect.
        assert_that!(stop.get(), eq(true));
        assert_that!(verbose.get(), eq(1));
        assert_that!(outcome.args().remaining(), eq(&["rest".to_string()][..]));
    }

    #[test]
    fn it_should_report_errors_through_the_sink_and_exit() {
        let (mut parser, sink, status) = recording("test");
        let args = parser.args();

        let error = parser.parse(args, ["--nope"]).unwrap_err();

        assert_that!(error, eq(Error::InvalidOption("--nope".to_string())));
        assert_that!(
            sink.borrow().error.as_str(),
            contains_substring("invalid option '--nope'")
        );
        assert_that!(sink.borrow().error.as_str(), contains_substring("Usage: test"));
        assert_that!(*status.borrow(), eq(Some(1)));
    }

    #[test]
    fn it_should_only_return_the_error_when_exit_on_error_is_off() {
        let (mut parser, _, status) = recording("test");
        parser.exit_on_error(false);
        let args = parser.args();

        let error = parser.parse(args, ["--nope"]).unwrap_err();

        assert_that!(error, eq(Error::InvalidOption("--nope".to_string())));
        assert_that!(*status.borrow(), eq(None));
    }

    #[test]
    fn it_should_treat_a_lone_dash_as_a_positional() {
        let (mut parser, _, _) = recording("test");
        let mut args = parser.args();
        let pos = args.positional::<String>("pos", PositionalSpec::default());

        parser.parse(args, ["-"]).unwrap();

        assert_that!(pos.get(), eq(Some("-".to_string())));
    }

    #[test]
    fn it_should_stop_gathering_values_at_the_next_option() {
        let (mut parser, _, _) = recording("test");
        let mut args = parser.args();
        args.list::<i64>("vec", None, FlagSpec { num: 3, ..FlagSpec::default() });
        args.flag("foo", Some('f'), FlagSpec::default());

        let error = parser.parse(args, ["--vec", "1", "-f", "3"]).unwrap_err();

        assert_that!(
            error,
            eq(Error::NotEnoughValues { name: "--vec".to_string(), num: 3 })
        );
    }

    #[test]
    fn it_should_consume_negative_numbers_as_values() {
        let (mut parser, _, _) = recording("test");
        let mut args = parser.args();
        let number = args.value::<i64>("number", Some('n'), FlagSpec::default());

        parser.parse(args, ["--number", "-42"]).unwrap();

        assert_that!(number.get(), eq(Some(-42)));
    }

    #[test]
    fn it_should_read_negative_numbers_as_options_once_a_digit_short_exists() {
        let (mut parser, _, _) = recording("test");
        let mut args = parser.args();
        let one = args.flag("one", Some('1'), FlagSpec::default());

        let error = parser.parse(args, ["-42"]).unwrap_err();

        assert_that!(one.get(), eq(false));
        assert_that!(error, eq(Error::InvalidOption("4".to_string())));
    }

    #[test]
    fn it_should_forward_extras_starting_at_the_unmatched_token() {
        let (mut parser, _, _) = recording("test");
        parser.error_on_extra_args(false);
        let args = parser.args();

        let outcome = parser.parse(args, ["run", "--flag", "x"]).unwrap();

        assert_that!(outcome.halted(), eq(true));
        assert_that!(
            outcome.args().remaining(),
            eq(&["run".to_string(), "--flag".to_string(), "x".to_string()][..])
        );
    }
}
