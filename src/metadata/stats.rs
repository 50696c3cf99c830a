//! Counting and vocabulary extraction over an assembled graph.

use std::collections::BTreeSet;

use crate::graph::vocab::{
    OWL_CLASS, OWL_DATATYPE_PROPERTY, OWL_OBJECT_PROPERTY, RDF_PROPERTY, RDFS_CLASS,
    is_builtin_namespace,
};
use crate::graph::{Graph, Subject};

const CLASS_TYPES: [&str; 2] = [OWL_CLASS, RDFS_CLASS];
const PROPERTY_TYPES: [&str; 3] = [RDF_PROPERTY, OWL_OBJECT_PROPERTY, OWL_DATATYPE_PROPERTY];
/// Types whose instances are treated as vocabulary terms.
const TERM_TYPES: [&str; 4] = [OWL_CLASS, RDF_PROPERTY, OWL_OBJECT_PROPERTY, OWL_DATATYPE_PROPERTY];

/// Namespace of an IRI: through the last `#` when there is one, otherwise
/// through the last `/`, otherwise the IRI itself.
pub fn namespace_of(iri: &str) -> &str {
    if let Some(pos) = iri.rfind('#') {
        &iri[..=pos]
    } else if let Some(pos) = iri.rfind('/') {
        &iri[..=pos]
    } else {
        iri
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub triples: usize,
    pub classes: usize,
    pub properties: usize,
    pub entities: usize,
    /// Sorted, deduplicated, built-ins excluded
    pub vocabularies: Vec<String>,
}

fn iri_instances<'a>(graph: &'a Graph, types: &'a [&'a str]) -> BTreeSet<&'a str> {
    types
        .iter()
        .flat_map(|class| graph.instances_of(*class))
        .filter_map(Subject::as_iri)
        .collect()
}

pub fn collect_vocabularies(graph: &Graph) -> BTreeSet<String> {
    let predicates = graph.iter().map(|t| t.predicate.as_str());
    let terms = iri_instances(graph, &TERM_TYPES);
    predicates
        .chain(terms)
        .map(namespace_of)
        .filter(|ns| !ns.is_empty() && !is_builtin_namespace(ns))
        .map(str::to_string)
        .collect()
}

pub fn collect_stats(graph: &Graph) -> GraphStats {
    let entities: BTreeSet<&str> = graph.iter().filter_map(|t| t.subject.as_iri()).collect();
    GraphStats {
        triples: graph.len(),
        classes: iri_instances(graph, &CLASS_TYPES).len(),
        properties: iri_instances(graph, &PROPERTY_TYPES).len(),
        entities: entities.len(),
        vocabularies: collect_vocabularies(graph).into_iter().collect(),
    }
}
