pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shopchat",
    about = "Shop chat assistant operator CLI",
    long_about = "Inspect configuration, preview the product catalog the assistant sees, and check deployment readiness.",
    after_help = "Examples:\n  shopchat doctor --json\n  shopchat config\n  shopchat catalog"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print the catalog text exactly as it is injected into the prompt")]
    Catalog,
    #[command(about = "Validate config, model credentials, and catalog readability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Catalog => commands::catalog::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
