#![deny(missing_docs)]

//! # Tinyspec CLI
//!
//! Command Line Interface for the tinyspec compiler.
//!
//! Supported Commands:
//! - `yaml`: Compiles the project into `swagger.yaml`.
//! - `json`: Compiles the project into `swagger.json`.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::compile::{CompileArgs, OutputFormat};
use crate::error::CliResult;

mod compile;
mod error;
mod project;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Tinyspec to Swagger compiler")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compiles the project into a YAML document.
    Yaml(CompileArgs),
    /// Compiles the project into a JSON document.
    Json(CompileArgs),
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Yaml(args) => compile::execute(args, OutputFormat::Yaml),
        Commands::Json(args) => compile::execute(args, OutputFormat::Json),
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
