//! Merge the core ontology modules and data extensions into the build
//! artifact.
//!
//! Usage:
//!   assemble [--root <DIR>] [--config <FILE>]

use clap::Parser;
use ontology_pipeline::{CliArgs, LoggingConfig, PipelineConfig, assemble, exit_code_of, init_logging};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "assemble", version, about = "Assemble ontology modules and data into one graph")]
struct Cli {
    #[command(flatten)]
    common: CliArgs,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig::from_args(cli.common)?;
    let outcome = assemble(&config)?;
    println!("Wrote {}", outcome.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(LoggingConfig::from_env().for_binary("assemble"))
        .map_err(|e| eprintln!("logging disabled: {e:#}"))
        .ok();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "assembly failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code_of(&e) as u8)
        }
    }
}
