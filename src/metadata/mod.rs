//! VoID/DCAT/PROV description of the assembled artifact.
//!
//! The dataset is named by the SHA-256 of the artifact's raw bytes, so the
//! identity changes exactly when the file does.

pub mod revision;
pub mod stats;

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::graph::vocab::{
    DCAT_NS, DCTERMS_NS, METADATA_PREFIXES, PROV_NS, RDF_TYPE, VOID_NS, XSD_DATE_TIME, XSD_INTEGER,
};
use crate::graph::{Graph, Literal, RdfSyntax, Subject, Term, Triple};
use crate::utils::sha256_file_hex;

pub use revision::read_revision;
pub use stats::{GraphStats, collect_stats, namespace_of};

const TITLE: &str = "Assembled ontology dataset";
const DESCRIPTION: &str = "Unified ontology and data graph assembled from repo modules.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    /// `urn:sha256:<hex>` of the artifact bytes
    pub identity: String,
    pub triples: usize,
    pub classes: usize,
    pub properties: usize,
    pub entities: usize,
    pub vocabularies: Vec<String>,
    pub issued: DateTime<Utc>,
    pub revision: Option<String>,
}

impl DatasetDescriptor {
    /// Describe the artifact at `input`. `repo_root` is searched for a git
    /// revision.
    pub fn describe(input: &Path, repo_root: &Path, issued: DateTime<Utc>) -> Result<Self> {
        if !input.is_file() {
            return Err(PipelineError::MissingInput {
                path: input.to_path_buf(),
            });
        }
        let identity = format!("urn:sha256:{}", sha256_file_hex(input)?);

        let mut graph = Graph::new();
        let syntax = RdfSyntax::from_path(input).unwrap_or(RdfSyntax::Turtle);
        graph.parse_file(input, syntax)?;
        let stats = collect_stats(&graph);

        Ok(Self {
            identity,
            triples: stats.triples,
            classes: stats.classes,
            properties: stats.properties,
            entities: stats.entities,
            vocabularies: stats.vocabularies,
            issued,
            revision: read_revision(repo_root),
        })
    }

    /// `xsd:dateTime` lexical form: UTC, whole seconds, `Z` suffix.
    pub fn issued_lexical(&self) -> String {
        self.issued.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        for (prefix, namespace) in METADATA_PREFIXES {
            graph.bind_prefix(prefix, namespace);
        }

        let dataset = Subject::iri(self.identity.as_str());
        let issued = Term::Literal(Literal::typed(self.issued_lexical(), XSD_DATE_TIME));
        let count = |n: usize| Term::Literal(Literal::typed(n.to_string(), XSD_INTEGER));
        let dcat = |local: &str| format!("{DCAT_NS}{local}");
        let dcterms = |local: &str| format!("{DCTERMS_NS}{local}");
        let void = |local: &str| format!("{VOID_NS}{local}");
        let prov = |local: &str| format!("{PROV_NS}{local}");

        let mut record = vec![
            Triple::new(dataset.clone(), RDF_TYPE, Term::iri(dcat("Dataset"))),
            Triple::new(dataset.clone(), RDF_TYPE, Term::iri(void("Dataset"))),
            Triple::new(dataset.clone(), dcterms("title"), Term::literal(TITLE)),
            Triple::new(dataset.clone(), dcterms("description"), Term::literal(DESCRIPTION)),
            Triple::new(dataset.clone(), dcterms("issued"), issued.clone()),
            Triple::new(dataset.clone(), void("triples"), count(self.triples)),
            Triple::new(dataset.clone(), void("classes"), count(self.classes)),
            Triple::new(dataset.clone(), void("properties"), count(self.properties)),
            Triple::new(dataset.clone(), void("entities"), count(self.entities)),
        ];
        if let Some(revision) = &self.revision {
            record.push(Triple::new(
                dataset.clone(),
                dcterms("hasVersion"),
                Term::literal(revision.as_str()),
            ));
        }
        for namespace in &self.vocabularies {
            record.push(Triple::new(
                dataset.clone(),
                void("vocabulary"),
                Term::iri(namespace.as_str()),
            ));
        }

        let activity = graph.fresh_blank();
        record.push(Triple::new(activity.clone(), RDF_TYPE, Term::iri(prov("Activity"))));
        record.push(Triple::new(activity.clone(), prov("startedAtTime"), issued));
        record.push(Triple::new(dataset, prov("wasGeneratedBy"), Term::from(activity)));

        graph.extend(record);
        graph
    }
}

/// Result of a metadata run.
#[derive(Debug, Clone)]
pub struct MetadataOutcome {
    pub output: PathBuf,
    pub descriptor: DatasetDescriptor,
}

/// Describe `input` and write the record to `output` atomically.
pub fn generate(
    input: &Path,
    output: &Path,
    repo_root: &Path,
    issued: DateTime<Utc>,
) -> Result<MetadataOutcome> {
    let _span = crate::logging::stage_span("generate-metadata").entered();

    let descriptor = DatasetDescriptor::describe(input, repo_root, issued)?;
    let syntax = RdfSyntax::from_path(output).unwrap_or(RdfSyntax::Turtle);
    descriptor.to_graph().serialize_to_file(output, syntax)?;

    tracing::info!(
        identity = %descriptor.identity,
        triples = descriptor.triples,
        vocabularies = descriptor.vocabularies.len(),
        revision = descriptor.revision.as_deref().unwrap_or("-"),
        output = %output.display(),
        "metadata record written"
    );

    Ok(MetadataOutcome {
        output: output.to_path_buf(),
        descriptor,
    })
}
