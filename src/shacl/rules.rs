//! SHACL-AF triple rules applied to the data graph before validation.

use std::collections::BTreeSet;

use super::constraints::ConstraintChecker;
use super::report::NodeRenderer;
use super::shapes::{NodeExpr, Shape, ShapesGraph, TripleRule};
use crate::graph::{Graph, Term, Triple};
use crate::inference::{Inference, apply_rdfs};

/// Upper bound on rule rounds; rules that keep minting triples stop here.
const MAX_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleStats {
    pub rounds: usize,
    pub inferred: usize,
}

/// Apply every active shape's triple rules to `data` until nothing new is
/// produced. With RDFS inference on, entailment is recomputed after each
/// round so rules can build on each other's conclusions.
pub fn apply_rules(data: &mut Graph, shapes: &ShapesGraph, inference: Inference) -> RuleStats {
    let mut stats = RuleStats::default();
    let mut ordered: Vec<(&TripleRule, &Shape)> = shapes
        .roots()
        .flat_map(|shape| shape.rules.iter().map(move |rule| (rule, shape)))
        .collect();
    if ordered.is_empty() {
        return stats;
    }
    ordered.sort_by(|(a, _), (b, _)| a.order.total_cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

    let renderer = NodeRenderer::new(shapes.prefixes());
    while stats.rounds < MAX_ROUNDS {
        stats.rounds += 1;
        let mut produced = Vec::new();
        {
            let checker = ConstraintChecker::new(data, shapes, &renderer);
            for (rule, shape) in &ordered {
                for focus in checker.focus_nodes(shape) {
                    if rule
                        .conditions
                        .iter()
                        .all(|condition| checker.conforms(condition, &focus, 0))
                    {
                        fire(&checker, rule, &focus, &mut produced);
                    }
                }
            }
        }

        let mut added = data.extend(produced);
        if added > 0 && inference == Inference::Rdfs {
            added += apply_rdfs(data).inferred;
        }
        stats.inferred += added;
        if added == 0 {
            break;
        }
    }
    if stats.rounds == MAX_ROUNDS {
        tracing::warn!(rounds = MAX_ROUNDS, "triple rules did not settle; stopped early");
    }
    tracing::debug!(rounds = stats.rounds, inferred = stats.inferred, "triple rules applied");
    stats
}

fn evaluate(checker: &ConstraintChecker<'_>, expr: &NodeExpr, focus: &Term) -> BTreeSet<Term> {
    match expr {
        NodeExpr::This => BTreeSet::from([focus.clone()]),
        NodeExpr::Constant(term) => BTreeSet::from([term.clone()]),
        NodeExpr::Path(path) => checker.value_nodes(focus, path),
    }
}

fn fire(checker: &ConstraintChecker<'_>, rule: &TripleRule, focus: &Term, out: &mut Vec<Triple>) {
    let objects = evaluate(checker, &rule.object, focus);
    for subject in evaluate(checker, &rule.subject, focus) {
        let Some(subject) = subject.as_subject() else {
            continue;
        };
        for object in &objects {
            out.push(Triple::new(subject.clone(), rule.predicate.as_str(), object.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::vocab::RDF_TYPE;
    use crate::graph::{RdfSyntax, Subject};
    use std::path::PathBuf;

    const PREFIXES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .
        @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
    "#;

    fn parse(body: &str) -> Graph {
        let mut graph = Graph::new();
        graph
            .parse_bytes(
                format!("{PREFIXES}{body}").as_bytes(),
                RdfSyntax::Turtle,
                &PathBuf::from("inline.ttl"),
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_rule_materializes_type() {
        let shapes = ShapesGraph::load(&parse(
            r#"
            ex:AdultRule a sh:NodeShape ;
                sh:targetClass ex:Person ;
                sh:rule [ a sh:TripleRule ;
                    sh:subject sh:this ; sh:predicate rdf:type ; sh:object ex:Adult ;
                    sh:condition [ sh:property [ sh:path ex:age ; sh:minCount 1 ] ] ] .
            "#,
        ))
        .unwrap();
        let mut data = parse("ex:alice a ex:Person ; ex:age 40 . ex:bob a ex:Person .");

        let stats = apply_rules(&mut data, &shapes, Inference::None);
        assert_eq!(stats.inferred, 1);
        let adult = Term::iri("http://example.org/Adult");
        assert!(data.has(&Subject::iri("http://example.org/alice"), RDF_TYPE, &adult));
        assert!(!data.has(&Subject::iri("http://example.org/bob"), RDF_TYPE, &adult));
    }

    #[test]
    fn test_path_expression_copies_values() {
        let shapes = ShapesGraph::load(&parse(
            r#"
            ex:S sh:targetSubjectsOf ex:parent ;
                sh:rule [ a sh:TripleRule ;
                    sh:subject [ sh:path ex:parent ] ; sh:predicate ex:child ; sh:object sh:this ] .
            "#,
        ))
        .unwrap();
        let mut data = parse("ex:kid ex:parent ex:mum , ex:dad .");
        apply_rules(&mut data, &shapes, Inference::Rdfs);
        let kid = Term::iri("http://example.org/kid");
        assert!(data.has(&Subject::iri("http://example.org/mum"), "http://example.org/child", &kid));
        assert!(data.has(&Subject::iri("http://example.org/dad"), "http://example.org/child", &kid));
    }
}
