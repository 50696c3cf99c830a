//! Independent per-file syntax checks over the target directories.

mod support;

use ontology_pipeline::syntax_check::{check_dirs, check_targets};
use support::TestWorkspace;

#[test]
fn test_all_formats_are_checked_in_directory_order() {
    let ws = TestWorkspace::new();
    ws.turtle("shapes/s.ttl", "ex:S sh:targetNode ex:a .\n");
    ws.turtle("ontology/core.ttl", "ex:A a owl:Class .\n");
    ws.write(
        "ontology/sub/graph.trig",
        "<http://example.org/g> { <http://example.org/a> <http://example.org/p> 1 . }\n",
    );
    ws.write(
        "build/dump.nq",
        "<http://example.org/a> <http://example.org/p> \"x\" <http://example.org/g> .\n",
    );
    ws.write("mappings/readme.txt", "ignored");

    let report = check_targets(&ws.config()).unwrap();
    assert_eq!(report.checked, 4);
    assert!(report.passed());

    let lines: Vec<String> = report.entries.iter().map(ToString::to_string).collect();
    assert!(lines[0].starts_with("OK [turtle]: ") && lines[0].ends_with("core.ttl"));
    assert!(lines[1].starts_with("OK [trig]: ") && lines[1].ends_with("graph.trig"));
    assert!(lines[2].starts_with("OK [turtle]: ") && lines[2].ends_with("s.ttl"));
    assert!(lines[3].starts_with("OK [nquads]: ") && lines[3].ends_with("dump.nq"));
    assert_eq!(report.summary(), "Validation passed: 4 file(s) checked.");
}

#[test]
fn test_every_broken_file_is_reported() {
    let ws = TestWorkspace::new();
    ws.write("ontology/a.ttl", "this is not turtle");
    ws.write("ontology/b.nt", "<http://example.org/a> <http://example.org/p> .\n");
    ws.turtle("ontology/c.ttl", "ex:ok ex:p ex:q .\n");

    let report = check_targets(&ws.config()).unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.exit_code(), 1);

    let errors: Vec<String> = report
        .entries
        .iter()
        .filter(|e| !e.is_ok())
        .map(ToString::to_string)
        .collect();
    assert!(errors[0].starts_with("ERR [turtle]: ") && errors[0].contains("a.ttl: "));
    assert!(errors[1].starts_with("ERR [nt]: ") && errors[1].contains("b.nt: "));
    assert_eq!(report.summary(), "Validation failed: 2 file(s) errored out of 3.");
}

#[test]
fn test_empty_repository() {
    let ws = TestWorkspace::new();
    let report = check_dirs(&ws.config().syntax_targets).unwrap();
    assert_eq!(report.checked, 0);
    assert_eq!(report.exit_code(), 0);
    assert!(report.summary().starts_with("No RDF files found in target directories"));
}
