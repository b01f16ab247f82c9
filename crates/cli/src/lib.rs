pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::formulation::FormulationCommand;
use commands::price::PriceArgs;
use commands::synthesize::SynthesizeArgs;
use dermacraft_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "dermacraft",
    about = "Dermacraft formulation CLI",
    long_about = "Synthesize personalized skincare products, price ingredient lists, validate base formulations, and inspect configuration.",
    after_help = "Examples:\n  dermacraft synthesize --skin-type dry --concern wrinkle --environment moderate\n  dermacraft price --ingredient peptides --ingredient vitamin_c\n  dermacraft formulation validate --file base.toml\n  dermacraft smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Synthesize a custom product for a skin profile")]
    Synthesize(SynthesizeArgs),
    #[command(about = "Price an ingredient list with the configured pricing policy")]
    Price(PriceArgs),
    #[command(about = "Validate and check base formulation drafts")]
    Formulation {
        #[command(subcommand)]
        command: FormulationCommand,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Run an end-to-end in-memory flow with per-check timing details")]
    Smoke,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are reported by the command itself.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Synthesize(args) => commands::synthesize::run(args),
        Command::Price(args) => commands::price::run(args),
        Command::Formulation { command } => commands::formulation::run(command),
        Command::Config => commands::config::run(),
        Command::Smoke => commands::smoke::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only command output.
fn init_logging(config: &AppConfig) {
    use dermacraft_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("logging already initialized: {error}");
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};
    use crate::commands::formulation::FormulationCommand;

    #[test]
    fn synthesize_accepts_repeated_concerns_and_allergies() {
        let cli = Cli::try_parse_from([
            "dermacraft",
            "synthesize",
            "--skin-type",
            "dry",
            "--concern",
            "wrinkle",
            "--concern",
            "spots",
            "--environment",
            "urban",
            "--allergy",
            "vitamin_c",
            "--seed",
            "7",
        ])
        .expect("parse");

        let Command::Synthesize(args) = cli.command else {
            panic!("expected synthesize command");
        };
        assert_eq!(args.concerns, vec!["wrinkle", "spots"]);
        assert_eq!(args.allergies, vec!["vitamin_c"]);
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn formulation_check_requires_percent_with_ingredient() {
        let missing_percent = Cli::try_parse_from([
            "dermacraft",
            "formulation",
            "check",
            "--file",
            "base.toml",
            "--ingredient",
            "water",
        ]);
        assert!(missing_percent.is_err());

        let cli = Cli::try_parse_from([
            "dermacraft",
            "formulation",
            "check",
            "--file",
            "base.toml",
            "--ingredient",
            "water",
            "--percent",
            "80.01",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Formulation { command: FormulationCommand::Check(ref args) } if args.percent.is_some()
        ));
    }
}
