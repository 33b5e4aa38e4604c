use argot_parser::{FlagSpec, Parser, PositionalSpec};

fn main() {
    let mut parser = Parser::new("system");
    let mut args = parser.args();

    let device = args.value::<String>(
        "device",
        Some('d'),
        FlagSpec { help: "Which device to start the system on".into(), ..FlagSpec::default() },
    );
    let command = args.positional::<String>(
        "command",
        PositionalSpec {
            choices: vec!["start".into(), "stop".into()],
            halt: true,
            ..PositionalSpec::default()
        },
    );

    let Ok(outcome) = parser.parse_env(args) else {
        return;
    };
    let parent = outcome.into_args();

    if let Some(device) = device.get() {
        println!("device: {device}");
    }

    match command.get().as_deref() {
        Some("start") => start(parent.remaining()),
        Some("stop") => stop(parent.remaining()),
        _ => {}
    }
}

fn start(argv: &[String]) {
    let mut parser = Parser::new("system start");
    let mut args = parser.args();

    let power = args.value::<String>(
        "power",
        Some('p'),
        FlagSpec { help: "With how much power to start the system".into(), ..FlagSpec::default() },
    );
    let system = args.positional::<String>(
        "system",
        PositionalSpec { help: "The system to start".into(), ..PositionalSpec::default() },
    );

    if parser.parse(args, argv.to_vec()).is_err() {
        return;
    }

    if let Some(power) = power.get() {
        println!("power: {power}");
    }
    println!("starting system: {}", system.get().unwrap_or_default());
}

fn stop(argv: &[String]) {
    let mut parser = Parser::new("system stop");
    let mut args = parser.args();

    let force = args.flag(
        "force",
        Some('f'),
        FlagSpec { help: "Force stopping of system".into(), ..FlagSpec::default() },
    );
    let system = args.positional::<String>(
        "system",
        PositionalSpec { help: "The system to stop".into(), ..PositionalSpec::default() },
    );

    if parser.parse(args, argv.to_vec()).is_err() {
        return;
    }

    println!("force: {}", force.get());
    println!("stopping system: {}", system.get().unwrap_or_default());
}
