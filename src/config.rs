use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::graph::RdfSyntax;

const DEFAULT_ONTOLOGY_DIR: &str = "ontology";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SHAPES_DIR: &str = "shapes";
const DEFAULT_BUILD_DIR: &str = "build";
const DEFAULT_ASSEMBLED_FILE: &str = "lemon-kg.ttl";
const DEFAULT_REPORT_FILE: &str = "shacl-report.txt";
const DEFAULT_METADATA_FILE: &str = "metadata/void.ttl";

/// Core ontology modules, merged in this order.
pub const DEFAULT_MODULES: &[&str] = &[
    "lemon-core",
    "lemon-diversity",
    "lemon-energy",
    "lemon-context",
    "lemon-align",
];

/// Directories scanned by the syntax validator, relative to the root.
pub const DEFAULT_SYNTAX_TARGETS: &[&str] = &["ontology", "shapes", "mappings", "build"];

/// Resolved pipeline layout. Every path is already joined onto `root`
/// unless it was configured as an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub root: PathBuf,
    pub ontology_dir: PathBuf,
    pub data_dir: PathBuf,
    pub shapes_dir: PathBuf,
    pub build_dir: PathBuf,
    /// Module names (`lemon-core`) or file names (`lemon-core.ttl`)
    pub modules: Vec<String>,
    pub assembled_file: PathBuf,
    pub report_file: PathBuf,
    pub metadata_file: PathBuf,
    pub syntax_targets: Vec<PathBuf>,
}

impl PipelineConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            root: cli_root,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let root = cli_root
            .or_else(|| file_config.root.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        let config = Self::from_partial(root, file_config);
        config.validate()?;
        Ok(config)
    }

    /// The fixed default layout under `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self::from_partial(root.into(), PartialConfig::default())
    }

    fn from_partial(root: PathBuf, partial: PartialConfig) -> Self {
        let PartialConfig {
            root: _,
            ontology_dir,
            data_dir,
            shapes_dir,
            build_dir,
            modules,
            assembled_file,
            report_file,
            metadata_file,
            syntax_targets,
        } = partial;

        let resolve = |path: PathBuf| -> PathBuf {
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        };

        let build_dir = resolve(build_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR)));
        let in_build = |default: &str, configured: Option<PathBuf>| -> PathBuf {
            match configured {
                Some(path) => resolve(path),
                None => build_dir.join(default),
            }
        };
        let assembled_file = in_build(DEFAULT_ASSEMBLED_FILE, assembled_file);
        let report_file = in_build(DEFAULT_REPORT_FILE, report_file);
        let metadata_file = in_build(DEFAULT_METADATA_FILE, metadata_file);

        let modules = modules
            .unwrap_or_else(|| DEFAULT_MODULES.iter().map(|m| (*m).to_string()).collect())
            .into_iter()
            .map(|m| m.trim().to_string())
            .collect();

        let syntax_targets = syntax_targets
            .unwrap_or_else(|| DEFAULT_SYNTAX_TARGETS.iter().map(PathBuf::from).collect())
            .into_iter()
            .map(resolve)
            .collect();

        Self {
            ontology_dir: resolve(ontology_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_ONTOLOGY_DIR))),
            data_dir: resolve(data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))),
            shapes_dir: resolve(shapes_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_SHAPES_DIR))),
            build_dir,
            modules,
            assembled_file,
            report_file,
            metadata_file,
            syntax_targets,
            root,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.modules.is_empty() {
            return Err(PipelineError::config("at least one core module must be listed"));
        }
        let mut seen = HashSet::new();
        for module in &self.modules {
            if module.is_empty() {
                return Err(PipelineError::config("module names must not be empty"));
            }
            if !seen.insert(module.as_str()) {
                return Err(PipelineError::config(format!("module {module:?} is listed twice")));
            }
        }
        for (label, path) in [
            ("assembled_file", &self.assembled_file),
            ("metadata_file", &self.metadata_file),
        ] {
            if RdfSyntax::from_path(path).is_none() {
                return Err(PipelineError::config(format!(
                    "{label} {:?} has no recognized graph extension",
                    path
                )));
            }
        }
        Ok(())
    }

    /// File backing a core module. Bare names get the `.ttl` extension.
    pub fn module_path(&self, module: &str) -> PathBuf {
        if RdfSyntax::from_path(Path::new(module)).is_some() {
            self.ontology_dir.join(module)
        } else {
            self.ontology_dir.join(format!("{module}.ttl"))
        }
    }
}

/// Flags shared by every pipeline binary.
#[derive(Args, Debug, Default, Clone)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "ONTOLOGY_PIPELINE_ROOT",
        value_name = "DIR",
        help = "Repository root containing ontology/, data/, shapes/ and build/"
    )]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    root: Option<PathBuf>,
    ontology_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    shapes_dir: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    modules: Option<Vec<String>>,
    assembled_file: Option<PathBuf>,
    report_file: Option<PathBuf>,
    metadata_file: Option<PathBuf>,
    syntax_targets: Option<Vec<PathBuf>>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!(PipelineError::config(format!(
            "config file {:?} does not exist",
            path
        )));
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .map_err(|e| PipelineError::config(format!("failed to parse YAML config {:?}: {e}", path)))?,
        "json" => serde_json::from_str(&contents)
            .map_err(|e| PipelineError::config(format!("failed to parse JSON config {:?}: {e}", path)))?,
        other => anyhow::bail!(PipelineError::config(format!(
            "unsupported config extension: {other}"
        ))),
    };
    Ok(parsed)
}
