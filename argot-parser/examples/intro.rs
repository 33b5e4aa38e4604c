use argot_parser::{FlagSpec, Parser, PositionalSpec};

fn main() {
    let mut parser = Parser::new("intro");
    let mut args = parser.args();

    let dry_run = args.flag(
        "dry-run",
        Some('d'),
        FlagSpec { help: "Only log potential filesystem changes".into(), ..FlagSpec::default() },
    );
    let verbose = args.count(
        "verbose",
        Some('v'),
        FlagSpec { help: "Output more debugging information".into(), ..FlagSpec::default() },
    );
    let num = args.value::<i64>(
        "num",
        None,
        FlagSpec { help: "The number of things to do".into(), ..FlagSpec::default() },
    );
    let output = args.value::<String>(
        "output",
        Some('o'),
        FlagSpec { help: "The output file".into(), ..FlagSpec::default() },
    );
    let input = args.positional_list::<String>("input", PositionalSpec::default());

    if parser.parse_env(args).is_err() {
        return;
    }

    println!(
        "dry-run: {}, verbose: {}, num: {}, output: {}, input: {}",
        dry_run.get(),
        verbose.get(),
        num.get().unwrap_or(42),
        output.get().unwrap_or_else(|| "<none>".to_string()),
        input.get().join(", ")
    );
}
