//! Argument descriptors, typed storage handles and the per-parse registry.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Shared typed storage written by the matching engine and read by the caller
/// once parsing is done.
///
/// Registration returns one handle; the registered descriptor keeps a clone
/// of it and mutates the shared cell while tokens are matched.
pub struct Handle<T>(Rc<RefCell<T>>);

impl<T> Handle<T> {
    pub(crate) fn new(value: T) -> Self {
        Handle(Rc::new(RefCell::new(value)))
    }

    /// Clone the current value out of the storage cell.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    /// Move the current value out, leaving the default behind.
    pub fn take(&self) -> T
    where
        T: Default,
    {
        self.0.take()
    }

    pub(crate) fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub(crate) fn update(&self, mutate: impl FnOnce(&mut T)) {
        mutate(&mut self.0.borrow_mut());
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:?})", self.0.borrow())
    }
}

/// Conversion sink behind a descriptor: turns one raw token into a typed
/// value and writes it into the bound storage.
pub(crate) trait Slot {
    fn type_name(&self) -> &'static str;

    /// Convert and store one token. `false` signals a type mismatch.
    fn push(&mut self, raw: &str) -> bool;

    /// Drop previously stored values, for overwrite-last semantics.
    fn clear(&mut self) {}
}

struct ScalarSlot<T: Value> {
    out: Handle<Option<T>>,
}

impl<T: Value> Slot for ScalarSlot<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn push(&mut self, raw: &str) -> bool {
        match T::parse(raw) {
            Some(value) => {
                self.out.set(Some(value));
                true
            }
            None => false,
        }
    }
}

struct ListSlot<T: Value> {
    out: Handle<Vec<T>>,
}

impl<T: Value> Slot for ListSlot<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn push(&mut self, raw: &str) -> bool {
        match T::parse(raw) {
            Some(value) => {
                self.out.update(|values| values.push(value));
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.out.update(Vec::clear);
    }
}

/// The operations the matching engine drives on any descriptor, flag or
/// positional alike.
pub(crate) trait Descriptor {
    fn choices(&self) -> &[String];

    fn type_name(&self) -> &'static str;

    /// Apply one matched token. Zero-arity descriptors receive the empty
    /// string.
    fn parse(&mut self, raw: &str) -> bool;
}

pub(crate) enum FlagKind {
    /// `--foo` sets the bound bool.
    Switch(Handle<bool>),
    /// `-vvv` bumps the bound counter per occurrence.
    Count(Handle<usize>),
    /// `--foo value` overwrites the bound optional.
    Scalar(Box<dyn Slot>),
    /// `--foo a b` appends to the bound list.
    List(Box<dyn Slot>),
}

pub(crate) struct Flag {
    pub(crate) name: String,
    pub(crate) short: Option<char>,
    pub(crate) help: String,
    pub(crate) choices: Vec<String>,
    pub(crate) halt: bool,
    /// Values consumed per occurrence.
    pub(crate) num: usize,
    /// Whether repeated occurrences accumulate instead of overwriting.
    pub(crate) collect: bool,
    pub(crate) kind: FlagKind,
}

impl Flag {
    /// Forget values from earlier occurrences. Only list flags store more
    /// than the latest value, so everything else is untouched.
    pub(crate) fn reset(&mut self) {
        if let FlagKind::List(slot) = &mut self.kind {
            slot.clear();
        }
    }
}

impl Descriptor for Flag {
    fn choices(&self) -> &[String] {
        &self.choices
    }

    fn type_name(&self) -> &'static str {
        match &self.kind {
            FlagKind::Switch(_) | FlagKind::Count(_) => "",
            FlagKind::Scalar(slot) | FlagKind::List(slot) => slot.type_name(),
        }
    }

    fn parse(&mut self, raw: &str) -> bool {
        match &mut self.kind {
            FlagKind::Switch(on) => {
                debug_assert!(raw.is_empty());
                on.set(true);
                true
            }
            FlagKind::Count(count) => {
                debug_assert!(raw.is_empty());
                count.update(|count| *count += 1);
                true
            }
            FlagKind::Scalar(slot) | FlagKind::List(slot) => slot.push(raw),
        }
    }
}

pub(crate) struct Positional {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) choices: Vec<String>,
    pub(crate) halt: bool,
    /// Satisfied even when no token arrives.
    pub(crate) optional: bool,
    /// May consume more than one token.
    pub(crate) many: bool,
    /// Tokens matched so far.
    pub(crate) count: usize,
    slot: Box<dyn Slot>,
}

impl Descriptor for Positional {
    fn choices(&self) -> &[String] {
        &self.choices
    }

    fn type_name(&self) -> &'static str {
        self.slot.type_name()
    }

    fn parse(&mut self, raw: &str) -> bool {
        if self.slot.push(raw) {
            self.count += 1;
            true
        } else {
            false
        }
    }
}

/// Configuration for one flag registration.
#[derive(Debug, Clone)]
pub struct FlagSpec {
    /// Help text shown in the generated help output.
    pub help: String,
    /// Allowed raw values; empty means unconstrained.
    pub choices: Vec<String>,
    /// Stop parsing once this flag is matched, stashing leftover tokens.
    pub halt: bool,
    /// Values consumed per occurrence. Only list flags honor this.
    pub num: usize,
    /// Whether repeated occurrences accumulate or only the last one
    /// survives. Only list flags honor this.
    pub collect: bool,
}

impl Default for FlagSpec {
    fn default() -> Self {
        FlagSpec {
            help: String::new(),
            choices: Vec::new(),
            halt: false,
            num: 1,
            collect: true,
        }
    }
}

/// Configuration for one positional registration.
#[derive(Debug, Clone, Default)]
pub struct PositionalSpec {
    /// Help text shown in the generated help output.
    pub help: String,
    /// Allowed raw values; empty means unconstrained.
    pub choices: Vec<String>,
    /// Stop parsing once this positional is matched, stashing leftover
    /// tokens. The usual way to hand off to a subcommand parser.
    pub halt: bool,
    /// Satisfied even when no token arrives.
    pub optional: bool,
}

/// Ordered registry of flag and positional descriptors for one parse call.
///
/// Registration order is lookup and usage order for flags, and matching
/// priority order for positionals. Usually obtained from
/// [`Parser::args`](crate::Parser::args) so the built-in `--help` and
/// `--version` flags are in place.
#[derive(Default)]
pub struct ArgSet {
    pub(crate) flags: Vec<Flag>,
    pub(crate) positionals: Vec<Positional>,
    pub(crate) remaining: Vec<String>,
    pub(crate) description: String,
    pub(crate) epilog: String,
    pub(crate) usage_override: Option<String>,
    pub(crate) help_requested: Option<Handle<bool>>,
    pub(crate) version_requested: Option<Handle<bool>>,
}

impl ArgSet {
    /// Create an empty registry, without the built-in flags.
    pub fn new() -> Self {
        ArgSet::default()
    }

    /// Register a boolean flag. Matched occurrences set the handle to true.
    pub fn flag(&mut self, name: impl Into<String>, short: Option<char>, spec: FlagSpec) -> Handle<bool> {
        let handle = Handle::new(false);
        self.register_flag(Flag {
            name: name.into(),
            short,
            help: spec.help,
            choices: spec.choices,
            halt: spec.halt,
            num: 0,
            collect: false,
            kind: FlagKind::Switch(handle.clone()),
        });
        handle
    }

    /// Register a counting flag. Every occurrence bumps the handle.
    pub fn count(&mut self, name: impl Into<String>, short: Option<char>, spec: FlagSpec) -> Handle<usize> {
        let handle = Handle::new(0);
        self.register_flag(Flag {
            name: name.into(),
            short,
            help: spec.help,
            choices: spec.choices,
            halt: spec.halt,
            num: 0,
            collect: false,
            kind: FlagKind::Count(handle.clone()),
        });
        handle
    }

    /// Register a flag taking exactly one value; the last occurrence wins.
    pub fn value<T: Value + 'static>(
        &mut self,
        name: impl Into<String>,
        short: Option<char>,
        spec: FlagSpec,
    ) -> Handle<Option<T>> {
        let handle = Handle::new(None);
        self.register_flag(Flag {
            name: name.into(),
            short,
            help: spec.help,
            choices: spec.choices,
            halt: spec.halt,
            num: 1,
            collect: false,
            kind: FlagKind::Scalar(Box::new(ScalarSlot { out: handle.clone() })),
        });
        handle
    }

    /// Register a flag collecting values into a list.
    ///
    /// `spec.num` fixes how many values each occurrence consumes and
    /// `spec.collect` decides whether repeated occurrences accumulate or
    /// only the last one survives.
    pub fn list<T: Value + 'static>(
        &mut self,
        name: impl Into<String>,
        short: Option<char>,
        spec: FlagSpec,
    ) -> Handle<Vec<T>> {
        assert!(spec.num >= 1, "a list flag consumes at least one value per occurrence");

        let handle = Handle::new(Vec::new());
        self.register_flag(Flag {
            name: name.into(),
            short,
            help: spec.help,
            choices: spec.choices,
            halt: spec.halt,
            num: spec.num,
            collect: spec.collect,
            kind: FlagKind::List(Box::new(ListSlot { out: handle.clone() })),
        });
        handle
    }

    /// Register a positional taking exactly one token, required unless the
    /// spec marks it optional.
    pub fn positional<T: Value + 'static>(
        &mut self,
        name: impl Into<String>,
        spec: PositionalSpec,
    ) -> Handle<Option<T>> {
        let handle = Handle::new(None);
        self.register_positional(Positional {
            name: name.into(),
            help: spec.help,
            choices: spec.choices,
            halt: spec.halt,
            optional: spec.optional,
            many: false,
            count: 0,
            slot: Box::new(ScalarSlot { out: handle.clone() }),
        });
        handle
    }

    /// Register a variadic positional collecting one or more tokens, or zero
    /// or more when the spec marks it optional.
    pub fn positional_list<T: Value + 'static>(
        &mut self,
        name: impl Into<String>,
        spec: PositionalSpec,
    ) -> Handle<Vec<T>> {
        let handle = Handle::new(Vec::new());
        self.register_positional(Positional {
            name: name.into(),
            help: spec.help,
            choices: spec.choices,
            halt: spec.halt,
            optional: spec.optional,
            many: true,
            count: 0,
            slot: Box::new(ListSlot { out: handle.clone() }),
        });
        handle
    }

    /// Tokens left unconsumed after a halting descriptor fired, verbatim and
    /// in order.
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// Free-form text shown between the usage line and the argument lists.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Free-form text appended after the argument lists.
    pub fn set_epilog(&mut self, epilog: impl Into<String>) {
        self.epilog = epilog.into();
    }

    /// Replace the generated usage line with a hand-written one.
    pub fn set_usage(&mut self, usage: impl Into<String>) {
        self.usage_override = Some(usage.into());
    }

    pub(crate) fn long_position(&self, name: &str) -> Option<usize> {
        self.flags.iter().position(|flag| flag.name == name)
    }

    pub(crate) fn short_position(&self, short: char) -> Option<usize> {
        self.flags.iter().position(|flag| flag.short == Some(short))
    }

    pub(crate) fn digit_shorts(&self) -> bool {
        self.flags
            .iter()
            .any(|flag| flag.short.is_some_and(|short| short.is_ascii_digit()))
    }

    fn register_flag(&mut self, flag: Flag) {
        self.assert_name_free(&flag.name);
        if let Some(short) = flag.short {
            assert!(
                self.short_position(short).is_none(),
                "duplicate short option '{short}'"
            );
        }
        self.flags.push(flag);
    }

    fn register_positional(&mut self, positional: Positional) {
        self.assert_name_free(&positional.name);
        self.positionals.push(positional);
    }

    fn assert_name_free(&self, name: &str) {
        assert!(!name.is_empty(), "argument name must not be empty");
        assert!(
            self.long_position(name).is_none()
                && self.positionals.iter().all(|positional| positional.name != name),
            "duplicate argument name '{name}'"
        );
    }
}

impl fmt::Debug for ArgSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgSet")
            .field(
                "flags",
                &self.flags.iter().map(|flag| flag.name.as_str()).collect::<Vec<_>>(),
            )
            .field(
                "positionals",
                &self
                    .positionals
                    .iter()
                    .map(|positional| positional.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[test]
    fn it_should_write_through_switch_handles() {
        let mut set = ArgSet::new();
        let on = set.flag("force", Some('f'), FlagSpec::default());

        assert_that!(on.get(), eq(false));
        set.flags[0].parse("");
        assert_that!(on.get(), eq(true));
    }

    #[test]
    fn it_should_count_occurrences() {
        let mut set = ArgSet::new();
        let verbosity = set.count("verbose", Some('v'), FlagSpec::default());

        for _ in 0..3 {
            set.flags[0].parse("");
        }

        assert_that!(verbosity.get(), eq(3));
    }

    #[test]
    fn it_should_report_type_mismatches_from_slots() {
        let mut set = ArgSet::new();
        let number = set.value::<i64>("num", None, FlagSpec::default());

        assert_that!(set.flags[0].parse("42x"), eq(false));
        assert_that!(number.get(), eq(None));
        assert_that!(set.flags[0].parse("42"), eq(true));
        assert_that!(number.get(), eq(Some(42)));
    }

    #[test]
    fn it_should_clear_lists_on_reset_only() {
        let mut set = ArgSet::new();
        let values = set.list::<i64>("vals", None, FlagSpec::default());

        set.flags[0].parse("1");
        set.flags[0].parse("2");
        set.flags[0].reset();
        set.flags[0].parse("3");

        assert_that!(values.get(), eq(vec![3]));
    }

    #[test]
    fn it_should_track_positional_counts() {
        let mut set = ArgSet::new();
        let files = set.positional_list::<String>("file", PositionalSpec::default());

        set.positionals[0].parse("a");
        set.positionals[0].parse("b");

        assert_that!(set.positionals[0].count, eq(2));
        assert_that!(files.get(), eq(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn it_should_take_out_of_handles() {
        let mut set = ArgSet::new();
        let files = set.positional_list::<String>("file", PositionalSpec::default());

        set.positionals[0].parse("a");

        assert_that!(files.take(), eq(vec!["a".to_string()]));
        assert_that!(files.get(), eq(Vec::<String>::new()));
    }

    #[test]
    #[should_panic(expected = "duplicate argument name 'input'")]
    fn it_should_reject_duplicate_names() {
        let mut set = ArgSet::new();
        set.flag("input", None, FlagSpec::default());
        set.positional::<String>("input", PositionalSpec::default());
    }

    #[test]
    #[should_panic(expected = "duplicate short option 'v'")]
    fn it_should_reject_duplicate_short_options() {
        let mut set = ArgSet::new();
        set.count("verbose", Some('v'), FlagSpec::default());
        set.flag("version", Some('v'), FlagSpec::default());
    }
}
