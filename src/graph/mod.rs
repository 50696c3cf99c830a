//! In-memory triple set with deterministic parsing and serialization.
//!
//! The store is a plain set of triples: adding a triple twice is a no-op and
//! iteration is always in `(subject, predicate, object)` order, so two graphs
//! with the same triples serialize to the same bytes. Parsing and
//! serialization go through `oxigraph::io`; everything else stays in memory.

pub mod syntax;
pub mod term;
pub mod vocab;

use oxigraph::io::{RdfParseError, RdfParser, RdfSerializer};
use oxigraph::model as ox;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::error::{ParseError, PipelineError, Result};
use crate::utils::{path_to_forward_slashes, write_atomic};

pub use syntax::RdfSyntax;
pub use term::{Literal, Subject, Term, Triple};

use vocab::RDF_TYPE;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    triples: BTreeSet<Triple>,
    /// (predicate, object, subject) index for reverse lookups
    pos: BTreeSet<(String, Term, Subject)>,
    prefixes: BTreeMap<String, String>,
    blank_counter: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple. Returns `true` when it was not already present.
    pub fn add(&mut self, triple: Triple) -> bool {
        if self.triples.contains(&triple) {
            return false;
        }
        self.pos.insert((
            triple.predicate.clone(),
            triple.object.clone(),
            triple.subject.clone(),
        ));
        self.triples.insert(triple)
    }

    /// Insert every triple, returning how many were new.
    pub fn extend<I: IntoIterator<Item = Triple>>(&mut self, triples: I) -> usize {
        triples
            .into_iter()
            .map(|triple| self.add(triple))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn has(&self, subject: &Subject, predicate: &str, object: &Term) -> bool {
        self.triples.contains(&Triple::new(subject.clone(), predicate, object.clone()))
    }

    pub fn triples_with_subject<'a>(
        &'a self,
        subject: &'a Subject,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        let start = Triple::new(subject.clone(), String::new(), Term::min());
        self.triples
            .range(start..)
            .take_while(move |t| &t.subject == subject)
    }

    pub fn triples_with_predicate<'a>(
        &'a self,
        predicate: &'a str,
    ) -> impl Iterator<Item = (&'a Subject, &'a Term)> + 'a {
        let start = (predicate.to_string(), Term::min(), Subject::min());
        self.pos
            .range(start..)
            .take_while(move |(p, _, _)| p == predicate)
            .map(|(_, o, s)| (s, o))
    }

    pub fn objects<'a>(
        &'a self,
        subject: &'a Subject,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        let start = Triple::new(subject.clone(), predicate, Term::min());
        self.triples
            .range(start..)
            .take_while(move |t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// First object of `subject predicate ?o`. The result borrows only the
    /// graph, so callers may pass temporaries.
    pub fn object(&self, subject: &Subject, predicate: &str) -> Option<&Term> {
        let start = Triple::new(subject.clone(), predicate, Term::min());
        self.triples
            .range(start..)
            .next()
            .filter(|t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }

    pub fn subjects<'a>(
        &'a self,
        predicate: &'a str,
        object: &'a Term,
    ) -> impl Iterator<Item = &'a Subject> + 'a {
        let start = (predicate.to_string(), object.clone(), Subject::min());
        self.pos
            .range(start..)
            .take_while(move |(p, o, _)| p == predicate && o == object)
            .map(|(_, _, s)| s)
    }

    /// Subjects with an `rdf:type` of exactly `class` (no entailment).
    pub fn instances_of<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Subject> + 'a {
        let start = (RDF_TYPE.to_string(), Term::iri(class), Subject::min());
        self.pos
            .range(start..)
            .take_while(move |(p, o, _)| p == RDF_TYPE && o.as_iri() == Some(class))
            .map(|(_, _, s)| s)
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// Bind a serialization prefix. The first binding of a prefix wins; a
    /// conflicting rebinding is ignored.
    pub fn bind_prefix(&mut self, prefix: &str, namespace: &str) {
        match self.prefixes.get(prefix) {
            Some(existing) if existing == namespace => {}
            Some(existing) => {
                tracing::warn!(
                    prefix,
                    kept = %existing,
                    ignored = %namespace,
                    "conflicting prefix binding ignored"
                );
            }
            None => {
                self.prefixes.insert(prefix.to_string(), namespace.to_string());
            }
        }
    }

    /// A blank node label not used by anything parsed into this graph so far.
    pub fn fresh_blank(&mut self) -> Subject {
        let label = format!("b{}", self.blank_counter);
        self.blank_counter += 1;
        Subject::Blank(label)
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    /// Parse a file into this graph, returning the number of triples read.
    pub fn parse_file(&mut self, path: &Path, syntax: RdfSyntax) -> Result<usize> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
        let base_iri = std::path::absolute(path)
            .ok()
            .map(|abs| format!("file://{}", path_to_forward_slashes(&abs)));
        Ok(self.parse_with_base(&bytes, syntax, path, base_iri.as_deref())?)
    }

    /// Parse in-memory bytes. `source` names the input in errors.
    ///
    /// Quads are flattened into the default graph. Blank node labels are
    /// scoped to this call and renamed to fresh `b{n}` labels, so two inputs
    /// reusing a label never share a node. On error the graph is unchanged.
    pub fn parse_bytes(
        &mut self,
        bytes: &[u8],
        syntax: RdfSyntax,
        source: &Path,
    ) -> std::result::Result<usize, ParseError> {
        self.parse_with_base(bytes, syntax, source, None)
    }

    fn parse_with_base(
        &mut self,
        bytes: &[u8],
        syntax: RdfSyntax,
        source: &Path,
        base_iri: Option<&str>,
    ) -> std::result::Result<usize, ParseError> {
        let parser = base_iri
            .and_then(|base| RdfParser::from_format(syntax.format()).with_base_iri(base).ok())
            .unwrap_or_else(|| RdfParser::from_format(syntax.format()));
        let mut reader = parser.for_reader(bytes);

        let mut labels: HashMap<String, String> = HashMap::new();
        let mut next_blank = self.blank_counter;
        let mut relabel = |label: &str| -> String {
            labels
                .entry(label.to_string())
                .or_insert_with(|| {
                    let fresh = format!("b{next_blank}");
                    next_blank += 1;
                    fresh
                })
                .clone()
        };

        let mut staged = Vec::new();
        for quad in reader.by_ref() {
            let quad = quad.map_err(|e| parse_error(source, syntax, e))?;
            let subject = match &quad.subject {
                ox::NamedOrBlankNode::NamedNode(node) => Subject::Iri(node.as_str().to_string()),
                ox::NamedOrBlankNode::BlankNode(node) => Subject::Blank(relabel(node.as_str())),
            };
            let object = match &quad.object {
                ox::Term::NamedNode(node) => Term::Iri(node.as_str().to_string()),
                ox::Term::BlankNode(node) => Term::Blank(relabel(node.as_str())),
                ox::Term::Literal(literal) => Term::Literal(Literal::from_oxigraph(literal)),
                #[allow(unreachable_patterns)]
                other => {
                    return Err(ParseError::new(
                        source,
                        syntax.name(),
                        format!("unsupported term in object position: {other}"),
                    ));
                }
            };
            staged.push(Triple::new(subject, quad.predicate.as_str(), object));
        }

        let prefixes: Vec<(String, String)> = reader
            .prefixes()
            .map(|(prefix, namespace)| (prefix.to_string(), namespace.to_string()))
            .collect();

        let read = staged.len();
        self.blank_counter = next_blank;
        self.extend(staged);
        for (prefix, namespace) in prefixes {
            self.bind_prefix(&prefix, &namespace);
        }
        tracing::debug!(source = %source.display(), syntax = %syntax, triples = read, "parsed graph");
        Ok(read)
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize every triple in sorted order. Prefixes are emitted in sorted
    /// order for syntaxes that have them.
    pub fn serialize(&self, syntax: RdfSyntax) -> Result<Vec<u8>> {
        let mut serializer = RdfSerializer::from_format(syntax.format());
        if syntax.supports_prefixes() {
            for (prefix, namespace) in &self.prefixes {
                serializer = serializer
                    .with_prefix(prefix.as_str(), namespace.as_str())
                    .map_err(|e| PipelineError::serialize(format!("prefix {prefix}: {e}")))?;
            }
        }
        let mut writer = serializer.for_writer(Vec::new());
        for triple in &self.triples {
            let triple: ox::Triple = triple.to_oxigraph();
            writer
                .serialize_triple(&triple)
                .map_err(PipelineError::serialize)?;
        }
        writer.finish().map_err(PipelineError::serialize)
    }

    pub fn serialize_to_file(&self, path: &Path, syntax: RdfSyntax) -> Result<()> {
        let bytes = self.serialize(syntax)?;
        write_atomic(path, &bytes)
    }
}

fn parse_error(source: &Path, syntax: RdfSyntax, error: RdfParseError) -> ParseError {
    let err = ParseError::new(source, syntax.name(), error.to_string());
    if let RdfParseError::Syntax(syntax_error) = &error
        && let Some(location) = syntax_error.location()
    {
        return err.with_location(location.start.line + 1, location.start.column + 1);
    }
    err
}
