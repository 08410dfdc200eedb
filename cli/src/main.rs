#![deny(missing_docs)]

//! # CDD RPC CLI
//!
//! Command Line Interface for the schema compiler.
//!
//! Supported Commands:
//! - `swagger`: Compiles a schema tree (JSON or YAML) into a Swagger 2.0 document.

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;

mod error;
mod swagger;

#[derive(Parser, Debug)]
#[clap(author, version, about = "RPC schema to Swagger compiler")]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace).
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a schema tree into a Swagger 2.0 document.
    Swagger(swagger::SwaggerArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Swagger(args) => {
            swagger::execute(args)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
