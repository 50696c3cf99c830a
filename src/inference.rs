//! RDFS entailment, iterated to a fixpoint.
//!
//! Only the rules that produce facts SHACL cares about are applied:
//!
//! | rule   | premise                                 | conclusion        |
//! |--------|-----------------------------------------|-------------------|
//! | rdfs2  | `p rdfs:domain c`, `s p o`              | `s a c`           |
//! | rdfs3  | `p rdfs:range c`, `s p o` (o not literal) | `o a c`         |
//! | rdfs5  | `p subPropertyOf q`, `q subPropertyOf r` | `p subPropertyOf r` |
//! | rdfs7  | `p subPropertyOf q`, `s p o`            | `s q o`           |
//! | rdfs9  | `c subClassOf d`, `s a c`               | `s a d`           |
//! | rdfs11 | `c subClassOf d`, `d subClassOf e`      | `c subClassOf e`  |
//!
//! Axiomatic triples are not materialized.

use crate::graph::vocab::{
    RDF_TYPE, RDFS_DOMAIN, RDFS_RANGE, RDFS_SUB_CLASS_OF, RDFS_SUB_PROPERTY_OF,
};
use crate::graph::{Graph, Subject, Term, Triple};

/// Which entailment regime to apply before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inference {
    None,
    #[default]
    Rdfs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferenceStats {
    pub rounds: usize,
    pub inferred: usize,
}

/// Add RDFS consequences to `graph` in place until nothing new follows.
pub fn apply_rdfs(graph: &mut Graph) -> InferenceStats {
    let mut stats = InferenceStats::default();
    loop {
        stats.rounds += 1;
        let derived = derive_round(graph);
        let added = graph.extend(derived);
        stats.inferred += added;
        if added == 0 {
            break;
        }
    }
    tracing::debug!(rounds = stats.rounds, inferred = stats.inferred, "rdfs closure reached");
    stats
}

/// Schema pairs `(s, o)` for a schema predicate where both ends are IRIs.
fn iri_pairs(graph: &Graph, predicate: &str) -> Vec<(String, String)> {
    graph
        .triples_with_predicate(predicate)
        .filter_map(|(s, o)| Some((s.as_iri()?.to_string(), o.as_iri()?.to_string())))
        .collect()
}

fn transitive_step(pairs: &[(String, String)], predicate: &str, out: &mut Vec<Triple>) {
    for (a, b) in pairs {
        for (c, d) in pairs {
            if b == c && a != d {
                out.push(Triple::new(Subject::iri(a), predicate, Term::iri(d)));
            }
        }
    }
}

fn derive_round(graph: &Graph) -> Vec<Triple> {
    let mut out = Vec::new();

    let sub_properties = iri_pairs(graph, RDFS_SUB_PROPERTY_OF);
    let sub_classes = iri_pairs(graph, RDFS_SUB_CLASS_OF);

    // rdfs5, rdfs11
    transitive_step(&sub_properties, RDFS_SUB_PROPERTY_OF, &mut out);
    transitive_step(&sub_classes, RDFS_SUB_CLASS_OF, &mut out);

    // rdfs7
    for (p, q) in &sub_properties {
        if p == q {
            continue;
        }
        for (s, o) in graph.triples_with_predicate(p) {
            out.push(Triple::new(s.clone(), q.as_str(), o.clone()));
        }
    }

    // rdfs2
    for (p, class) in iri_pairs(graph, RDFS_DOMAIN) {
        for (s, _) in graph.triples_with_predicate(&p) {
            out.push(Triple::new(s.clone(), RDF_TYPE, Term::iri(class.as_str())));
        }
    }

    // rdfs3
    for (p, class) in iri_pairs(graph, RDFS_RANGE) {
        for (_, o) in graph.triples_with_predicate(&p) {
            if let Some(object) = o.as_subject() {
                out.push(Triple::new(object, RDF_TYPE, Term::iri(class.as_str())));
            }
        }
    }

    // rdfs9
    for (sub, sup) in &sub_classes {
        if sub == sup {
            continue;
        }
        for s in graph.instances_of(sub) {
            out.push(Triple::new(s.clone(), RDF_TYPE, Term::iri(sup.as_str())));
        }
    }

    out.retain(|t| !graph.contains(t));
    out
}
