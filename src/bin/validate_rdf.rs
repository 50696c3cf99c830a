//! Parse every graph file in the target directories and report per file.

use clap::Parser;
use ontology_pipeline::{CliArgs, LoggingConfig, PipelineConfig, check_targets, init_logging};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "validate-rdf",
    version,
    about = "Check that every RDF file under ontology/, shapes/, mappings/ and build/ parses"
)]
struct Cli {
    #[command(flatten)]
    common: CliArgs,
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = PipelineConfig::from_args(cli.common)?;
    let report = check_targets(&config)?;
    for entry in &report.entries {
        if entry.is_ok() {
            println!("{entry}");
        } else {
            eprintln!("{entry}");
        }
    }
    if report.passed() {
        println!("{}", report.summary());
    } else {
        eprintln!("{}", report.summary());
    }
    Ok(report.exit_code() as u8)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(LoggingConfig::from_env().for_binary("validate-rdf"))
        .map_err(|e| eprintln!("logging disabled: {e:#}"))
        .ok();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "syntax check failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}
