//! Write a VoID/DCAT/PROV record describing the assembled artifact.
//!
//! Usage:
//!   generate-metadata [--in <PATH>] [--out <PATH>] [--root <DIR>]

use chrono::Utc;
use clap::Parser;
use ontology_pipeline::metadata::generate;
use ontology_pipeline::{CliArgs, LoggingConfig, PipelineConfig, init_logging};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "generate-metadata",
    version,
    about = "Generate VoID/DCAT metadata for the assembled ontology dataset"
)]
struct Cli {
    #[command(flatten)]
    common: CliArgs,

    /// Input graph (defaults to the assembled artifact)
    #[arg(long = "in", value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output record (defaults to build/metadata/void.ttl)
    #[arg(long = "out", value_name = "PATH")]
    output: Option<PathBuf>,
}

fn run(cli: Cli) -> anyhow::Result<PathBuf> {
    let config = PipelineConfig::from_args(cli.common)?;
    let input = cli.input.unwrap_or_else(|| config.assembled_file.clone());
    let output = cli.output.unwrap_or_else(|| config.metadata_file.clone());
    let output = std::path::absolute(&output).unwrap_or(output);

    let outcome = generate(&input, &output, &config.root, Utc::now())?;
    Ok(outcome.output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(LoggingConfig::from_env().for_binary("generate-metadata"))
        .map_err(|e| eprintln!("logging disabled: {e:#}"))
        .ok();

    match run(cli) {
        Ok(output) => {
            println!("Wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "metadata generation failed");
            println!("Metadata generation failed: {e:#}");
            ExitCode::from(1)
        }
    }
}
