//! Module assembly: core ontology modules plus data extensions into one
//! build artifact.
//!
//! Core modules are named explicitly and merged in their declared order.
//! Extensions are every recognized graph file under the data directory,
//! merged in lexicographic path order. The first file that fails to parse
//! aborts the build and nothing is written.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::graph::{Graph, RdfSyntax};

/// Result of a successful assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub output: PathBuf,
    pub modules_loaded: usize,
    pub extensions_loaded: usize,
    pub triples: usize,
}

/// Recognized graph files under `dir`, recursively, sorted by path.
/// A missing directory yields no files.
pub fn discover_graph_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            PipelineError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && RdfSyntax::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Merge the configured modules and extensions into one graph without
/// writing anything.
pub fn assemble_graph(config: &PipelineConfig) -> Result<(Graph, usize, usize)> {
    let mut graph = Graph::new();

    for module in &config.modules {
        let path = config.module_path(module);
        if !path.is_file() {
            return Err(PipelineError::MissingInput { path });
        }
        let syntax = RdfSyntax::from_path(&path).unwrap_or(RdfSyntax::Turtle);
        let read = graph.parse_file(&path, syntax)?;
        tracing::info!(module = %module, path = %path.display(), triples = read, "loaded core module");
    }

    let extensions = discover_graph_files(&config.data_dir)?;
    for path in &extensions {
        let Some(syntax) = RdfSyntax::from_path(path) else {
            continue;
        };
        let read = graph.parse_file(path, syntax)?;
        tracing::info!(path = %path.display(), triples = read, "loaded extension");
    }

    Ok((graph, config.modules.len(), extensions.len()))
}

/// Assemble and write the build artifact atomically.
pub fn assemble(config: &PipelineConfig) -> Result<AssemblyOutcome> {
    let _span = crate::logging::stage_span("assemble").entered();

    let (graph, modules_loaded, extensions_loaded) = assemble_graph(config)?;
    let output = config.assembled_file.clone();
    let syntax = RdfSyntax::from_path(&output).ok_or_else(|| {
        PipelineError::config(format!(
            "assembled artifact {:?} has no recognized graph extension",
            output
        ))
    })?;
    graph.serialize_to_file(&output, syntax)?;

    tracing::info!(
        output = %output.display(),
        modules = modules_loaded,
        extensions = extensions_loaded,
        triples = graph.len(),
        "assembled graph written"
    );

    Ok(AssemblyOutcome {
        output,
        modules_loaded,
        extensions_loaded,
        triples: graph.len(),
    })
}
