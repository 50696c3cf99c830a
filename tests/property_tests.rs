//! Property-based checks for graph, metric and namespace invariants.

use proptest::prelude::*;

use ontology_pipeline::metadata::namespace_of;
use ontology_pipeline::{Graph, Literal, RdfSyntax, Subject, Term, Triple, shannon_index};

// =============================================================================
// Generators
// =============================================================================

fn local_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}"
}

fn triple() -> impl Strategy<Value = Triple> {
    let object = prop_oneof![
        local_name().prop_map(|n| Term::iri(format!("http://example.org/{n}"))),
        "[ -~]{0,12}".prop_map(|v| Term::Literal(Literal::simple(v))),
        (0i64..1000).prop_map(|n| Term::typed(n.to_string(), "http://www.w3.org/2001/XMLSchema#integer")),
    ];
    (local_name(), local_name(), object).prop_map(|(s, p, o)| {
        Triple::new(
            Subject::iri(format!("http://example.org/{s}")),
            format!("http://example.org/p/{p}"),
            o,
        )
    })
}

// =============================================================================
// Graph Store
// =============================================================================

proptest! {
    #[test]
    fn prop_merging_twice_is_idempotent(triples in prop::collection::vec(triple(), 0..40)) {
        let mut once = Graph::new();
        once.extend(triples.clone());
        let mut twice = once.clone();
        prop_assert_eq!(twice.extend(triples), 0);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_insertion_order_does_not_change_serialization(
        triples in prop::collection::vec(triple(), 0..30)
    ) {
        let mut forward = Graph::new();
        forward.extend(triples.clone());
        let mut backward = Graph::new();
        backward.extend(triples.into_iter().rev());
        prop_assert_eq!(
            forward.serialize(RdfSyntax::NTriples).unwrap(),
            backward.serialize(RdfSyntax::NTriples).unwrap()
        );
    }

    #[test]
    fn prop_ntriples_reparse_preserves_triples(triples in prop::collection::vec(triple(), 0..30)) {
        let mut graph = Graph::new();
        graph.extend(triples);
        let bytes = graph.serialize(RdfSyntax::NTriples).unwrap();
        let mut reparsed = Graph::new();
        reparsed
            .parse_bytes(&bytes, RdfSyntax::NTriples, std::path::Path::new("prop.nt"))
            .unwrap();
        prop_assert_eq!(
            graph.iter().cloned().collect::<Vec<_>>(),
            reparsed.iter().cloned().collect::<Vec<_>>()
        );
    }
}

// =============================================================================
// Diversity Metric
// =============================================================================

proptest! {
    #[test]
    fn prop_entropy_is_permutation_invariant(
        labels in prop::collection::vec("[a-e]", 0..50),
        seed in any::<u64>()
    ) {
        let mut shuffled = labels.clone();
        // deterministic rotation plus reversal
        if !shuffled.is_empty() {
            let k = (seed as usize) % shuffled.len();
            shuffled.rotate_left(k);
            shuffled.reverse();
        }
        prop_assert_eq!(shannon_index(&labels), shannon_index(&shuffled));
    }

    #[test]
    fn prop_entropy_bounds(labels in prop::collection::vec("[a-h]", 1..60)) {
        let distinct = labels.iter().collect::<std::collections::BTreeSet<_>>().len();
        let h = shannon_index(&labels);
        prop_assert!(h >= 0.0);
        prop_assert!(h <= (distinct as f64).ln() + 1e-9);
    }

    #[test]
    fn prop_uniform_entropy_is_ln_k(k in 1usize..20, copies in 1usize..5) {
        let labels: Vec<usize> = (0..k).flat_map(|i| std::iter::repeat_n(i, copies)).collect();
        prop_assert!((shannon_index(labels) - (k as f64).ln()).abs() < 1e-9);
    }
}

// =============================================================================
// Namespace Heuristic
// =============================================================================

proptest! {
    #[test]
    fn prop_hash_rule_wins(base in "[a-z]{1,8}", local in "[a-z/]{0,8}") {
        let iri = format!("http://{base}.org/onto#{local}");
        prop_assert_eq!(namespace_of(&iri), format!("http://{base}.org/onto#"));
    }

    #[test]
    fn prop_namespace_is_prefix(iri in "[a-z:/#.]{0,24}") {
        let ns = namespace_of(&iri);
        prop_assert!(iri.starts_with(ns));
        if let Some(last) = ns.chars().last() {
            prop_assert!(ns == iri || last == '#' || last == '/');
        }
    }
}
