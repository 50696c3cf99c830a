//! Error types for the build pipeline
//!
//! Every stage owns its own top-level error boundary. The library reports
//! failures as [`PipelineError`]; the binaries wrap them in `anyhow` and map
//! them to exit codes with [`PipelineError::exit_code`].
//!
//! Shape nonconformance is not an error: a nonconforming data graph is
//! a successful validation run whose report says `Conforms: False`.

use std::fmt;
use std::path::{Path, PathBuf};

/// Result alias used throughout the library.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

// =============================================================================
// PARSE ERROR
// =============================================================================

/// A graph file that is not well-formed in its declared syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// File (or logical source name) that failed to parse
    pub path: PathBuf,
    /// Declared syntax label (`turtle`, `trig`, `nt`, `nquads`)
    pub syntax: &'static str,
    /// Underlying parser message
    pub message: String,
    /// 1-based line of the syntax error, when the parser reports one
    pub line: Option<u64>,
    /// 1-based column of the syntax error, when the parser reports one
    pub column: Option<u64>,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, syntax: &'static str, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            syntax,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn with_location(mut self, line: u64, column: u64) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(
                f,
                "{} ({}) line {}, column {}: {}",
                self.path.display(),
                self.syntax,
                line,
                column,
                self.message
            ),
            _ => write!(
                f,
                "{} ({}): {}",
                self.path.display(),
                self.syntax,
                self.message
            ),
        }
    }
}

impl std::error::Error for ParseError {}

// =============================================================================
// PIPELINE ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An upstream build artifact is required but absent
    #[error("build artifact {} not found; run `assemble` first", .path.display())]
    Precondition { path: PathBuf },

    /// A required input file is absent
    #[error("input not found: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {message}")]
    Serialize { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// A shapes graph that cannot be interpreted
    #[error("ill-formed shape {shape}: {message}")]
    InvalidShape { shape: String, message: String },
}

impl PipelineError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn serialize(message: impl fmt::Display) -> Self {
        PipelineError::Serialize {
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Config {
            message: message.into(),
        }
    }

    pub fn invalid_shape(shape: impl fmt::Display, message: impl Into<String>) -> Self {
        PipelineError::InvalidShape {
            shape: shape.to_string(),
            message: message.into(),
        }
    }

    /// Process exit status for this failure. `1` is reserved for
    /// "ran to completion and found problems".
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Parse(_) => 1,
            PipelineError::Precondition { .. } | PipelineError::MissingInput { .. } => 2,
            PipelineError::Config { .. } | PipelineError::InvalidShape { .. } => 3,
            PipelineError::Io { .. } | PipelineError::Serialize { .. } => 4,
        }
    }

    /// Error category for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "parse_error",
            PipelineError::Precondition { .. } => "precondition",
            PipelineError::MissingInput { .. } => "missing_input",
            PipelineError::Io { .. } => "io_error",
            PipelineError::Serialize { .. } => "serialize_error",
            PipelineError::Config { .. } => "config_error",
            PipelineError::InvalidShape { .. } => "invalid_shape",
        }
    }
}

/// Exit status of a finished run, carried out of `anyhow` chains by binaries.
pub fn exit_code_of(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}
