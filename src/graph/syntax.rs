//! File-extension driven syntax selection.

use oxigraph::io::RdfFormat;
use std::fmt;
use std::path::Path;

/// Graph serialization syntaxes understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdfSyntax {
    Turtle,
    TriG,
    NTriples,
    NQuads,
}

impl RdfSyntax {
    pub const ALL: [RdfSyntax; 4] = [
        RdfSyntax::Turtle,
        RdfSyntax::TriG,
        RdfSyntax::NTriples,
        RdfSyntax::NQuads,
    ];

    /// Map an extension (with or without the leading dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "ttl" => Some(RdfSyntax::Turtle),
            "trig" => Some(RdfSyntax::TriG),
            "nt" => Some(RdfSyntax::NTriples),
            "nq" => Some(RdfSyntax::NQuads),
            _ => None,
        }
    }

    /// Unrecognized extensions yield `None`; callers skip those files.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RdfSyntax::Turtle => "ttl",
            RdfSyntax::TriG => "trig",
            RdfSyntax::NTriples => "nt",
            RdfSyntax::NQuads => "nq",
        }
    }

    /// Short format label used in per-file reports.
    pub fn name(&self) -> &'static str {
        match self {
            RdfSyntax::Turtle => "turtle",
            RdfSyntax::TriG => "trig",
            RdfSyntax::NTriples => "nt",
            RdfSyntax::NQuads => "nquads",
        }
    }

    pub fn format(&self) -> RdfFormat {
        match self {
            RdfSyntax::Turtle => RdfFormat::Turtle,
            RdfSyntax::TriG => RdfFormat::TriG,
            RdfSyntax::NTriples => RdfFormat::NTriples,
            RdfSyntax::NQuads => RdfFormat::NQuads,
        }
    }

    /// Whether the syntax has prefix declarations worth emitting.
    pub fn supports_prefixes(&self) -> bool {
        matches!(self, RdfSyntax::Turtle | RdfSyntax::TriG)
    }
}

impl fmt::Display for RdfSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
