use clap::Parser as _;
use elster_tools::commands;
use std::process::ExitCode;
use tracing_subscriber::filter::targets::Targets;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

const LOG_FILTER_VARIABLE: &str = "ELSTER_TOOLS_LOG";

#[derive(clap::Parser)]
#[clap(version, about, author)]
enum Commands {
    Registers(commands::registers::Args),
    Decode(commands::decode::Args),
    Encode(commands::encode::Args),
    Format(commands::format::Args),
    Parse(commands::parse::Args),
    Poll(commands::poll::Args),
    Command(commands::command::Args),
    Clock(commands::clock::Args),
}

impl Commands {
    fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::Registers(args) => commands::registers::run(args)?,
            Commands::Decode(args) => commands::decode::run(args)?,
            Commands::Encode(args) => commands::encode::run(args)?,
            Commands::Format(args) => commands::format::run(args)?,
            Commands::Parse(args) => commands::parse::run(args)?,
            Commands::Poll(args) => commands::poll::run(args)?,
            Commands::Command(args) => commands::command::run(args)?,
            Commands::Clock(args) => commands::clock::run(args)?,
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{LOG_FILTER_VARIABLE} does not hold a valid log filter")]
struct LogFilterError(#[source] <Targets as std::str::FromStr>::Err);

fn init_logging() -> Result<(), LogFilterError> {
    let filter = match std::env::var(LOG_FILTER_VARIABLE) {
        Ok(description) => description.parse::<Targets>().map_err(LogFilterError)?,
        Err(_) => Targets::new().with_default(tracing::Level::WARN),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}

fn report(error: &dyn std::error::Error) -> ExitCode {
    eprintln!("error: {error}");
    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  because: {e}");
        cause = e.source();
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        return report(&e);
    }
    match Commands::parse().run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&*e),
    }
}
