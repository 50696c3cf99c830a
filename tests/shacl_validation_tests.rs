//! Shape validation of the build artifact, end to end through the filesystem.

mod support;

use assert_matches::assert_matches;
use ontology_pipeline::error::PipelineError;
use ontology_pipeline::shacl::{ShapeValidator, ValidatorOptions, run_validation};
use ontology_pipeline::{Inference, assemble};
use support::TestWorkspace;

const WORD_SHAPES: &str = r#"
ex:WordShape a sh:NodeShape ;
    sh:targetClass ex:Word ;
    sh:property [
        sh:path rdfs:label ;
        sh:minCount 1 ;
        sh:datatype xsd:string ;
    ] .
"#;

fn workspace(data: &str) -> TestWorkspace {
    let ws = TestWorkspace::new().with_core_modules();
    ws.turtle("shapes/words.ttl", WORD_SHAPES);
    ws.turtle("data/words.ttl", data);
    assemble(&ws.config()).unwrap();
    ws
}

#[test]
fn test_missing_artifact_is_precondition_error() {
    let ws = TestWorkspace::new();
    ws.turtle("shapes/words.ttl", WORD_SHAPES);

    let err = run_validation(&ws.config(), ValidatorOptions::default()).unwrap_err();
    assert_matches!(err, PipelineError::Precondition { .. });
    assert_eq!(err.exit_code(), 2);
    assert!(!ws.path("build/shacl-report.txt").exists());
}

#[test]
fn test_conforming_run_writes_report() {
    let ws = workspace("ex:run a ex:Word ; rdfs:label \"run\" .\n");
    let outcome = run_validation(&ws.config(), ValidatorOptions::default()).unwrap();

    assert!(outcome.conforms());
    assert_eq!(outcome.text, "Validation Report\nConforms: True\n");
    assert_eq!(ws.read("build/shacl-report.txt"), outcome.text);
}

#[test]
fn test_nonconforming_run_lists_every_focus_node() {
    let ws = workspace("ex:run a ex:Word . ex:walk a ex:Word . ex:jump a ex:Word ; rdfs:label \"jump\" .\n");
    let outcome = run_validation(&ws.config(), ValidatorOptions::default()).unwrap();

    assert!(!outcome.conforms());
    assert_eq!(outcome.report.violation_count(), 2);
    let text = ws.read("build/shacl-report.txt");
    assert!(text.starts_with("Validation Report\nConforms: False\nResults (2):\n"));
    assert!(text.contains("Focus Node: ex:run"));
    assert!(text.contains("Focus Node: ex:walk"));
    assert!(!text.contains("Focus Node: ex:jump"));
    assert!(text.contains(
        "Constraint Violation in MinCountConstraintComponent (http://www.w3.org/ns/shacl#MinCountConstraintComponent):"
    ));
    assert!(text.contains("\tResult Path: rdfs:label\n"));
}

#[test]
fn test_subclass_instances_validated_under_rdfs() {
    let ws = TestWorkspace::new().with_core_modules();
    ws.turtle("shapes/words.ttl", WORD_SHAPES);
    ws.turtle("data/verbs.ttl", "ex:Verb rdfs:subClassOf ex:Word . ex:go a ex:Verb .\n");
    assemble(&ws.config()).unwrap();

    let outcome = run_validation(&ws.config(), ValidatorOptions::default()).unwrap();
    assert_eq!(outcome.report.violation_count(), 1);
    assert!(outcome.text.contains("Focus Node: ex:go"));
}

#[test]
fn test_shape_files_are_merged() {
    let ws = workspace("ex:run a ex:Word ; rdfs:label \"run\" .\n");
    ws.turtle(
        "shapes/extra/closed.ttl",
        "ex:Closed sh:targetNode ex:run ; sh:closed true ; sh:ignoredProperties ( rdfs:label ) .\n",
    );

    let outcome = run_validation(&ws.config(), ValidatorOptions::default()).unwrap();
    // rdf:type is not ignored, so the closed shape flags it
    assert_eq!(outcome.report.violation_count(), 1);
    assert_eq!(
        outcome.report.results()[0].source_constraint,
        "ClosedConstraintComponent"
    );
}

#[test]
fn test_ill_formed_shape_is_reported_as_error() {
    let ws = workspace("ex:run a ex:Word .\n");
    ws.turtle("shapes/bad.ttl", "ex:Bad sh:targetNode ex:run ; sh:pattern \"(\" .\n");

    let err = run_validation(&ws.config(), ValidatorOptions::default()).unwrap_err();
    assert_matches!(err, PipelineError::InvalidShape { .. });
}

#[test]
fn test_inference_can_be_disabled() {
    let ws = TestWorkspace::new().with_core_modules();
    ws.turtle(
        "shapes/words.ttl",
        "ex:S sh:targetClass ex:Word ; sh:property [ sh:path rdfs:label ; sh:minCount 1 ] .\n",
    );
    ws.turtle("data/d.ttl", "ex:hasForm rdfs:domain ex:Word . ex:x ex:hasForm \"x\" .\n");
    assemble(&ws.config()).unwrap();

    let with_rdfs = run_validation(&ws.config(), ValidatorOptions::default()).unwrap();
    assert!(!with_rdfs.conforms());

    let options = ValidatorOptions {
        inference: Inference::None,
        ..ValidatorOptions::default()
    };
    let without = run_validation(&ws.config(), options).unwrap();
    assert!(without.conforms());
}

#[test]
fn test_validator_from_dir_with_no_shapes_conforms() {
    let ws = TestWorkspace::new();
    let validator = ShapeValidator::from_dir(&ws.path("shapes"), ValidatorOptions::default()).unwrap();
    assert!(validator.shapes().is_empty());
    assert!(validator.validate(&ontology_pipeline::Graph::new()).conforms());
}
