mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::io::{self, Write};
use std::process;

use commands::estimate::EstimateArgs;

/// Remaining net present value of a residential solar installation
#[derive(Parser)]
#[command(
    name = "solar-npv",
    version,
    about = "Remaining net present value of a residential solar installation",
    long_about = "Projects monthly feed-in tariff, self-consumption and export income over the \
                  remaining 25-year life of a UK residential solar installation and reports \
                  the homeowner value and the value an owner-occupier could capture, each \
                  rounded down to the nearest thousand."
)]
struct Cli {
    #[command(flatten)]
    estimate: EstimateArgs,

    /// Output format
    #[arg(long, default_value = "minimal", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    process::exit(run(cli, &mut io::stderr()));
}

/// Run the estimate and render the result, returning the process exit code.
/// Domain errors go to `stderr` as `error: <message>` with code 1.
fn run(cli: Cli, stderr: &mut impl Write) -> i32 {
    match commands::estimate::run_estimate(cli.estimate) {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            0
        }
        Err(e) => {
            let _ = writeln!(stderr, "{}: {}", "error".red().bold(), e);
            1
        }
    }
}
