//! Usage and help text generation from a registered argument set.

use crate::args::{ArgSet, Flag};

const HELP_OFFSET: usize = 35;
const MIN_SPACING: usize = 2;

fn repeated(word: &str, num: usize) -> String {
    let mut out = String::new();
    for i in 0..num {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// The uppercased value placeholders after a flag, one per consumed value.
fn value_stub(flag: &Flag) -> String {
    repeated(&flag.name.to_uppercase(), flag.num)
}

fn spacing(len: usize) -> usize {
    if len > HELP_OFFSET - MIN_SPACING {
        MIN_SPACING
    } else {
        HELP_OFFSET - len
    }
}

/// Generate the one-line usage summary, or return the hand-written override.
pub fn usage(set: &ArgSet, program: &str) -> String {
    if let Some(custom) = &set.usage_override {
        return custom.clone();
    }

    let mut usage = String::from(program);
    usage.push(' ');

    for flag in &set.flags {
        usage.push_str("[--");
        usage.push_str(&flag.name);
        let stub = value_stub(flag);
        if !stub.is_empty() {
            usage.push(' ');
            usage.push_str(&stub);
        }
        usage.push(']');
        if flag.collect {
            usage.push_str("...");
        }
        usage.push(' ');
    }

    for positional in &set.positionals {
        let name = if positional.choices.is_empty() {
            positional.name.clone()
        } else {
            format!("{{{}}}", positional.choices.join(","))
        };

        if positional.optional {
            usage.push('[');
            usage.push_str(&name);
            if positional.many {
                usage.push_str("...");
            }
            usage.push(']');
        } else {
            usage.push_str(&name);
            if positional.many {
                usage.push_str(" [");
                usage.push_str(&name);
                usage.push_str("...]");
            }
        }
        usage.push(' ');
    }

    usage
}

/// Generate the full help text: usage, description, the argument lists and
/// the epilog.
pub fn render(set: &ArgSet, program: &str) -> String {
    let mut help = format!("Usage: {}\n\n", usage(set, program));

    if !set.description.is_empty() {
        help.push_str(&set.description);
        help.push_str("\n\n");
    }

    if !set.positionals.is_empty() {
        help.push_str("Positional Arguments:\n");
        for positional in &set.positionals {
            help.push_str("  ");
            if !positional.choices.is_empty() {
                help.push('{');
                help.push_str(&positional.choices.join(","));
                help.push_str("}\n");
            } else {
                help.push_str(&positional.name);
                help.push_str(&" ".repeat(spacing(positional.name.len())));
                help.push_str(&positional.help);
                help.push('\n');
            }
        }
        help.push('\n');
    }

    if !set.flags.is_empty() {
        help.push_str("Optional Arguments:\n");
        for flag in &set.flags {
            help.push_str("  ");
            match flag.short {
                Some(short) => {
                    help.push('-');
                    help.push(short);
                    help.push_str(", ");
                }
                None => help.push_str("    "),
            }
            help.push_str("--");
            help.push_str(&flag.name);

            let mut width = 4 + 2 + flag.name.len();
            let stub = value_stub(flag);
            if !stub.is_empty() {
                help.push(' ');
                help.push_str(&stub);
                width += 1 + stub.len();
            }

            help.push_str(&" ".repeat(spacing(width)));
            help.push_str(&flag.help);
            help.push('\n');
        }
        help.push('\n');
    }

    if !set.epilog.is_empty() {
        help.push('\n');
        help.push_str(&set.epilog);
        help.push('\n');
    }

    help
}
