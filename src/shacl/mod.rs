//! SHACL validation of the assembled graph.
//!
//! The data graph is copied, closed under RDFS entailment, extended by
//! SHACL-AF triple rules, and then every targeted shape is evaluated. The
//! caller's graphs are never mutated.

pub mod constraints;
pub mod report;
pub mod rules;
pub mod shapes;

pub use constraints::ConstraintChecker;
pub use report::{NodeRenderer, Severity, ValidationReport, ValidationResult};
pub use shapes::{Constraint, PropertyPath, Shape, ShapesGraph};

use std::path::{Path, PathBuf};

use crate::assemble::discover_graph_files;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::graph::{Graph, RdfSyntax};
use crate::inference::{Inference, apply_rdfs};
use crate::utils::write_atomic;

/// Knobs of a validation run. The default is the pipeline's fixed setup:
/// RDFS entailment, full reporting, advanced features on, scripts off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorOptions {
    pub inference: Inference,
    pub abort_on_first: bool,
    pub advanced: bool,
    pub allow_js: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            inference: Inference::Rdfs,
            abort_on_first: false,
            advanced: true,
            allow_js: false,
        }
    }
}

pub struct ShapeValidator {
    shapes: ShapesGraph,
    options: ValidatorOptions,
}

impl ShapeValidator {
    pub fn new(shapes: ShapesGraph, options: ValidatorOptions) -> Self {
        if options.allow_js {
            tracing::warn!("JavaScript constraints are not supported; sh:js is ignored");
        }
        Self { shapes, options }
    }

    pub fn from_graph(graph: &Graph, options: ValidatorOptions) -> Result<Self> {
        Ok(Self::new(ShapesGraph::load(graph)?, options))
    }

    /// Load every recognized graph file under `dir`, in path order, as one
    /// shapes graph.
    pub fn from_dir(dir: &Path, options: ValidatorOptions) -> Result<Self> {
        let files = discover_graph_files(dir)?;
        if files.is_empty() {
            tracing::warn!(dir = %dir.display(), "no shape files found; every graph conforms");
        }
        let mut graph = Graph::new();
        for path in &files {
            let Some(syntax) = RdfSyntax::from_path(path) else {
                continue;
            };
            let read = graph.parse_file(path, syntax)?;
            tracing::debug!(path = %path.display(), triples = read, "loaded shapes file");
        }
        Self::from_graph(&graph, options)
    }

    pub fn shapes(&self) -> &ShapesGraph {
        &self.shapes
    }

    pub fn options(&self) -> ValidatorOptions {
        self.options
    }

    /// Renderer for report text: data prefixes, overridden by shape prefixes.
    pub fn renderer_for(&self, data: &Graph) -> NodeRenderer {
        let mut prefixes = data.prefixes().clone();
        prefixes.extend(
            self.shapes
                .prefixes()
                .iter()
                .map(|(p, ns)| (p.clone(), ns.clone())),
        );
        NodeRenderer::new(&prefixes)
    }

    pub fn validate(&self, data: &Graph) -> ValidationReport {
        let mut working = data.clone();
        if self.options.inference == Inference::Rdfs {
            let stats = apply_rdfs(&mut working);
            tracing::info!(inferred = stats.inferred, rounds = stats.rounds, "rdfs entailment applied");
        }
        if self.options.advanced {
            let stats = rules::apply_rules(&mut working, &self.shapes, self.options.inference);
            if stats.inferred > 0 {
                tracing::info!(inferred = stats.inferred, "triple rules applied");
            }
        }

        let renderer = self.renderer_for(&working);
        let checker = ConstraintChecker::new(&working, &self.shapes, &renderer);
        let mut report = ValidationReport::new();
        'shapes: for shape in self.shapes.roots() {
            let focus_nodes = checker.focus_nodes(shape);
            tracing::debug!(shape = %shape.id, focus_nodes = focus_nodes.len(), "evaluating shape");
            for focus in focus_nodes {
                for result in checker.validate_shape(shape, &focus, 0) {
                    report.add_result(result);
                    if self.options.abort_on_first {
                        break 'shapes;
                    }
                }
            }
        }
        report.normalize();
        report
    }
}

/// Result of validating the build artifact.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub report: ValidationReport,
    pub text: String,
    pub report_file: PathBuf,
}

impl ValidationOutcome {
    pub fn conforms(&self) -> bool {
        self.report.conforms()
    }
}

/// Validate the assembled artifact against the shapes directory and write
/// the text report, conforming or not.
pub fn run_validation(config: &PipelineConfig, options: ValidatorOptions) -> Result<ValidationOutcome> {
    let _span = crate::logging::stage_span("validate-shapes").entered();

    let artifact = &config.assembled_file;
    if !artifact.is_file() {
        return Err(PipelineError::Precondition {
            path: artifact.clone(),
        });
    }

    let validator = ShapeValidator::from_dir(&config.shapes_dir, options)?;
    let mut data = Graph::new();
    let syntax = RdfSyntax::from_path(artifact).unwrap_or(RdfSyntax::Turtle);
    data.parse_file(artifact, syntax)?;

    let report = validator.validate(&data);
    let text = report.render_text(&validator.renderer_for(&data));
    write_atomic(&config.report_file, text.as_bytes())?;

    tracing::info!(
        shapes = validator.shapes().len(),
        conforms = report.conforms(),
        violations = report.violation_count(),
        warnings = report.warning_count(),
        report = %config.report_file.display(),
        "shape validation finished"
    );

    Ok(ValidationOutcome {
        report,
        text,
        report_file: config.report_file.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
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

    fn validate_with(shapes: &str, data: &str, options: ValidatorOptions) -> ValidationReport {
        ShapeValidator::from_graph(&parse(shapes), options)
            .unwrap()
            .validate(&parse(data))
    }

    fn validate(shapes: &str, data: &str) -> ValidationReport {
        validate_with(shapes, data, ValidatorOptions::default())
    }

    fn components(report: &ValidationReport) -> Vec<&'static str> {
        report.results().iter().map(|r| r.source_constraint).collect()
    }

    const PERSON_SHAPE: &str = r#"
        ex:PersonShape a sh:NodeShape ;
            sh:targetClass ex:Person ;
            sh:property [ sh:path ex:name ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:string ] .
    "#;

    #[test]
    fn test_min_count_violation() {
        let report = validate(PERSON_SHAPE, "ex:alice a ex:Person .");
        assert!(!report.conforms());
        assert_eq!(components(&report), vec!["MinCountConstraintComponent"]);
        assert_eq!(report.results()[0].focus_node.as_iri(), Some("http://example.org/alice"));
    }

    #[test]
    fn test_conforming_data() {
        let report = validate(PERSON_SHAPE, r#"ex:alice a ex:Person ; ex:name "Alice" ."#);
        assert!(report.conforms());
        assert!(report.results().is_empty());
    }

    #[test]
    fn test_subclass_instances_are_targeted_under_rdfs() {
        let data = "ex:Student rdfs:subClassOf ex:Person . ex:bob a ex:Student .";
        let report = validate(PERSON_SHAPE, data);
        assert_eq!(report.violation_count(), 1);

        let no_inference = ValidatorOptions {
            inference: Inference::None,
            ..ValidatorOptions::default()
        };
        // targetClass still follows rdfs:subClassOf in the data graph
        assert_eq!(validate_with(PERSON_SHAPE, data, no_inference).violation_count(), 1);
    }

    #[test]
    fn test_domain_inference_creates_focus_nodes() {
        let data = r#"ex:worksAt rdfs:domain ex:Person . ex:carol ex:worksAt ex:acme ."#;
        assert_eq!(validate(PERSON_SHAPE, data).violation_count(), 1);
        let none = ValidatorOptions {
            inference: Inference::None,
            ..ValidatorOptions::default()
        };
        assert!(validate_with(PERSON_SHAPE, data, none).conforms());
    }

    #[test]
    fn test_validation_does_not_mutate_data() {
        let data = parse("ex:Student rdfs:subClassOf ex:Person . ex:bob a ex:Student .");
        let before = data.clone();
        let validator = ShapeValidator::from_graph(&parse(PERSON_SHAPE), ValidatorOptions::default()).unwrap();
        validator.validate(&data);
        assert_eq!(data, before);
    }

    #[test]
    fn test_warnings_break_conformance() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ex:p ; sh:minCount 1 ; sh:severity sh:Warning ] .
        "#;
        let report = validate(shapes, "ex:a ex:q 1 .");
        assert!(!report.conforms());
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.violation_count(), 0);
    }

    #[test]
    fn test_custom_message_and_value_constraints() {
        let shapes = r#"
            ex:S sh:targetSubjectsOf ex:age ;
                sh:property [ sh:path ex:age ; sh:datatype xsd:integer ;
                              sh:minInclusive 0 ; sh:maxExclusive 150 ;
                              sh:message "age out of range" ] .
        "#;
        let report = validate(shapes, r#"ex:a ex:age 200 . ex:b ex:age "x" . ex:c ex:age 30 ."#);
        assert!(report.results().iter().all(|r| r.message == "age out of range"));
        let mut found = components(&report);
        found.sort();
        // "x" fails datatype and both range checks, 200 fails the upper bound
        assert_eq!(
            found,
            vec![
                "DatatypeConstraintComponent",
                "MaxExclusiveConstraintComponent",
                "MaxExclusiveConstraintComponent",
                "MinInclusiveConstraintComponent",
            ]
        );
    }

    #[test]
    fn test_string_constraints() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ex:code ; sh:pattern "^[A-Z]{3}$" ; sh:maxLength 3 ] ;
                sh:property [ sh:path ex:label ; sh:languageIn ( "en" ) ; sh:uniqueLang true ] .
        "#;
        let data = r#"ex:a ex:code "ABCD" ; ex:label "hi"@en , "hello"@en , "salut"@fr ."#;
        let mut found = components(&validate(shapes, data));
        found.sort();
        assert_eq!(
            found,
            vec![
                "LanguageInConstraintComponent",
                "MaxLengthConstraintComponent",
                "PatternConstraintComponent",
                "UniqueLangConstraintComponent",
            ]
        );
    }

    #[test]
    fn test_paths_inverse_and_transitive() {
        let shapes = r#"
            ex:S sh:targetNode ex:c ;
                sh:property [ sh:path [ sh:inversePath ex:parentOf ] ; sh:minCount 1 ] ;
                sh:property [ sh:path [ sh:oneOrMorePath [ sh:inversePath ex:parentOf ] ] ;
                              sh:hasValue ex:grandma ] .
        "#;
        let data = "ex:grandma ex:parentOf ex:mum . ex:mum ex:parentOf ex:c .";
        assert!(validate(shapes, data).conforms());
        assert!(!validate(shapes, "ex:mum ex:parentOf ex:c .").conforms());
    }

    #[test]
    fn test_logical_and_node_constraints() {
        let shapes = r#"
            ex:Named sh:property [ sh:path ex:name ; sh:minCount 1 ] .
            ex:Aged sh:property [ sh:path ex:age ; sh:minCount 1 ] .
            ex:S sh:targetSubjectsOf ex:kind ;
                sh:or ( ex:Named ex:Aged ) ;
                sh:not ex:Aged ;
                sh:property [ sh:path ex:friend ; sh:node ex:Named ] .
        "#;
        let data = r#"
            ex:a ex:kind 1 ; ex:name "A" ; ex:friend ex:b .
            ex:b ex:age 3 .
            ex:c ex:kind 1 ; ex:age 4 .
        "#;
        let report = validate(shapes, data);
        let mut found: Vec<_> = report
            .results()
            .iter()
            .map(|r| (r.focus_node.as_iri().unwrap_or_default(), r.source_constraint))
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                ("http://example.org/a", "NodeConstraintComponent"),
                ("http://example.org/c", "NotConstraintComponent"),
            ]
        );
    }

    #[test]
    fn test_closed_shape_reports_extra_predicates() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ; sh:closed true ;
                sh:ignoredProperties ( <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ) ;
                sh:property [ sh:path ex:name ] .
        "#;
        let report = validate(shapes, r#"ex:a a ex:Thing ; ex:name "a" ; ex:extra 1 ."#);
        assert_eq!(components(&report), vec!["ClosedConstraintComponent"]);
        let result = &report.results()[0];
        assert_eq!(
            result.result_path.as_ref().and_then(|p| p.as_predicate()),
            Some("http://example.org/extra")
        );
    }

    #[test]
    fn test_property_pair_constraints() {
        let shapes = r#"
            ex:S sh:targetNode ex:e ;
                sh:property [ sh:path ex:start ; sh:lessThan ex:end ] ;
                sh:property [ sh:path ex:alias ; sh:disjoint ex:name ] .
        "#;
        let data = r#"ex:e ex:start 10 ; ex:end 5 ; ex:alias "x" ; ex:name "x" ."#;
        let mut found = components(&validate(shapes, data));
        found.sort();
        assert_eq!(found, vec!["DisjointConstraintComponent", "LessThanConstraintComponent"]);
    }

    #[test]
    fn test_qualified_value_shape() {
        let shapes = r#"
            ex:Doctor sh:property [ sh:path ex:role ; sh:hasValue ex:doctor ] .
            ex:S sh:targetNode ex:hospital ;
                sh:property [ sh:path ex:staff ; sh:qualifiedValueShape [ sh:class ex:Doctor ] ;
                              sh:qualifiedMinCount 1 ] .
        "#;
        let ok = "ex:hospital ex:staff ex:x . ex:x a ex:Doctor .";
        let missing = "ex:hospital ex:staff ex:y . ex:y a ex:Nurse .";
        assert!(validate(shapes, ok).conforms());
        assert_eq!(
            components(&validate(shapes, missing)),
            vec!["QualifiedMinCountConstraintComponent"]
        );
    }

    #[test]
    fn test_abort_on_first() {
        let options = ValidatorOptions {
            abort_on_first: true,
            ..ValidatorOptions::default()
        };
        let data = "ex:a a ex:Person . ex:b a ex:Person .";
        assert_eq!(validate_with(PERSON_SHAPE, data, options).results().len(), 1);
        assert_eq!(validate(PERSON_SHAPE, data).results().len(), 2);
    }

    #[test]
    fn test_recursive_shape_terminates() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ex:next ; sh:node ex:S ] .
        "#;
        let report = validate(shapes, "ex:a ex:next ex:a .");
        assert!(report.conforms());
    }
}
