//! argot, a declarative command-line argument parser with typed bindings.
//!
//! Describe each flag and positional once, get a typed [`Handle`] back, run
//! [`Parser::parse`] and read the matched values out of the handles:
//!
//! ```
//! use argot::{FlagSpec, Parser, PositionalSpec};
//!
//! let mut parser = Parser::new("copy");
//! parser.exit_on_error(false);
//!
//! let mut args = parser.args();
//! let verbose = args.count("verbose", Some('v'), FlagSpec::default());
//! let sources = args.positional_list::<String>("source", PositionalSpec::default());
//! let destination = args.positional::<String>("destination", PositionalSpec::default());
//!
//! parser.parse(args, ["-vv", "a.txt", "b.txt", "out"]).unwrap();
//!
//! assert_eq!(verbose.get(), 2);
//! assert_eq!(sources.get(), vec!["a.txt".to_string(), "b.txt".to_string()]);
//! assert_eq!(destination.get(), Some("out".to_string()));
//! ```
#![deny(missing_docs)]

pub use argot_parser as parser;

pub use parser::{help, lexer};
pub use parser::{
    ArgSet, Console, FlagSpec, Handle, Outcome, Output, Parser, PositionalSpec, StringOutput, Value,
};

/// Defines the possible errors that may occur during usage of the crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An error comes from the matching of arguments.
    #[error(transparent)]
    Parser(#[from] parser::Error),
}
