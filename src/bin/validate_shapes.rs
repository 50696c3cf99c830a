//! Validate the assembled graph against the SHACL shapes directory.
//!
//! Exit status: 0 conforms, 1 does not conform, 2 the artifact is missing or
//! validation could not run.

use clap::Parser;
use ontology_pipeline::{
    CliArgs, LoggingConfig, PipelineConfig, ValidatorOptions, init_logging, run_validation,
};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "validate-shapes",
    version,
    about = "Validate the assembled graph against SHACL shapes under RDFS entailment"
)]
struct Cli {
    #[command(flatten)]
    common: CliArgs,
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = PipelineConfig::from_args(cli.common)?;
    let outcome = run_validation(&config, ValidatorOptions::default())?;
    println!("{}", outcome.text);
    Ok(outcome.conforms())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(LoggingConfig::from_env().for_binary("validate-shapes"))
        .map_err(|e| eprintln!("logging disabled: {e:#}"))
        .ok();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "shape validation did not run");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
