//! Validation results and the plain-text report.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::shapes::PropertyPath;
use crate::graph::vocab::{RDF_NS, RDFS_NS, SH_NS, XSD_NS};
use crate::graph::{Literal, Term};

// =============================================================================
// Severity Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Violation,
}

impl Severity {
    pub fn from_iri(iri: &str) -> Self {
        match iri {
            "http://www.w3.org/ns/shacl#Info" => Severity::Info,
            "http://www.w3.org/ns/shacl#Warning" => Severity::Warning,
            _ => Severity::Violation,
        }
    }

    pub fn local_name(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Violation => "Violation",
        }
    }
}

// =============================================================================
// Node Rendering
// =============================================================================

/// Renders terms as compact names using known prefixes.
#[derive(Debug, Clone)]
pub struct NodeRenderer {
    /// (namespace, prefix), longest namespace first
    namespaces: Vec<(String, String)>,
}

impl NodeRenderer {
    pub fn new(prefixes: &BTreeMap<String, String>) -> Self {
        let mut bound: BTreeMap<String, String> = [
            ("sh", SH_NS),
            ("rdf", RDF_NS),
            ("rdfs", RDFS_NS),
            ("xsd", XSD_NS),
        ]
        .into_iter()
        .map(|(prefix, ns)| (ns.to_string(), prefix.to_string()))
        .collect();
        for (prefix, namespace) in prefixes {
            bound.insert(namespace.clone(), prefix.clone());
        }
        let mut namespaces: Vec<(String, String)> = bound.into_iter().collect();
        namespaces.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { namespaces }
    }

    pub fn iri(&self, iri: &str) -> String {
        for (namespace, prefix) in &self.namespaces {
            if let Some(local) = iri.strip_prefix(namespace.as_str())
                && is_local_name(local)
            {
                return format!("{prefix}:{local}");
            }
        }
        format!("<{iri}>")
    }

    pub fn term(&self, term: &Term) -> String {
        match term {
            Term::Iri(iri) => self.iri(iri),
            Term::Blank(label) => format!("_:{label}"),
            Term::Literal(literal) => self.literal(literal),
        }
    }

    pub fn literal(&self, literal: &Literal) -> String {
        let plain = Literal::simple(literal.value.clone()).to_string();
        match (&literal.language, &literal.datatype) {
            (Some(language), _) => format!("{plain}@{language}"),
            (None, Some(datatype)) => format!("{plain}^^{}", self.iri(datatype)),
            (None, None) => plain,
        }
    }
}

fn is_local_name(local: &str) -> bool {
    let Some(first) = local.chars().next() else {
        return true;
    };
    !matches!(first, '-' | '.')
        && !local.ends_with('.')
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

// =============================================================================
// Validation Result
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// The node that caused the violation
    pub focus_node: Term,
    pub result_path: Option<PropertyPath>,
    /// The value that violated the constraint
    pub value: Option<Term>,
    pub message: String,
    pub severity: Severity,
    /// The shape whose constraint was violated
    pub source_shape: Term,
    /// Path of the source shape, used to describe blank property shapes
    pub source_shape_path: Option<PropertyPath>,
    /// Local name of the constraint component
    pub source_constraint: &'static str,
}

impl ValidationResult {
    pub fn new(
        focus_node: Term,
        message: String,
        severity: Severity,
        source_shape: Term,
        source_constraint: &'static str,
    ) -> Self {
        Self {
            focus_node,
            result_path: None,
            value: None,
            message,
            severity,
            source_shape,
            source_shape_path: None,
            source_constraint,
        }
    }

    pub fn with_path(mut self, path: Option<PropertyPath>) -> Self {
        self.result_path = path;
        self
    }

    pub fn with_value(mut self, value: Term) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_shape_path(mut self, path: Option<PropertyPath>) -> Self {
        self.source_shape_path = path;
        self
    }

    pub fn component_iri(&self) -> String {
        format!("{SH_NS}{}", self.source_constraint)
    }

    fn sort_key(&self) -> (&Term, &Option<PropertyPath>, &str, &str, &Option<Term>, &Term) {
        (
            &self.focus_node,
            &self.result_path,
            self.source_constraint,
            &self.message,
            &self.value,
            &self.source_shape,
        )
    }

    fn render_source_shape(&self, renderer: &NodeRenderer) -> String {
        match (&self.source_shape, &self.source_shape_path) {
            (Term::Blank(_), Some(path)) => format!("[ sh:path {} ]", path.render(renderer)),
            (shape, _) => renderer.term(shape),
        }
    }
}

// =============================================================================
// Validation Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn add_result(&mut self, result: ValidationResult) {
        self.results.push(result);
    }

    /// A graph conforms only when no result of any severity was produced.
    pub fn conforms(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn violations(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Violation)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.severity == Severity::Info)
    }

    pub fn violation_count(&self) -> usize {
        self.violations().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn info_count(&self) -> usize {
        self.infos().count()
    }

    /// Order results and drop exact duplicates so reports are reproducible.
    pub fn normalize(&mut self) {
        self.results.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.results.dedup();
    }

    /// Plain-text report:
    ///
    /// ```text
    /// Validation Report
    /// Conforms: False
    /// Results (1):
    /// Constraint Violation in MinCountConstraintComponent (http://www.w3.org/ns/shacl#MinCountConstraintComponent):
    ///     Severity: sh:Violation
    ///     ...
    /// ```
    pub fn render_text(&self, renderer: &NodeRenderer) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Validation Report");
        let _ = writeln!(
            out,
            "Conforms: {}",
            if self.conforms() { "True" } else { "False" }
        );
        if self.results.is_empty() {
            return out;
        }
        let _ = writeln!(out, "Results ({}):", self.results.len());
        for result in &self.results {
            let heading = if result.severity == Severity::Violation {
                "Constraint Violation"
            } else {
                "Validation Result"
            };
            let _ = writeln!(
                out,
                "{heading} in {} ({}):",
                result.source_constraint,
                result.component_iri()
            );
            let _ = writeln!(out, "\tSeverity: sh:{}", result.severity.local_name());
            let _ = writeln!(out, "\tSource Shape: {}", result.render_source_shape(renderer));
            let _ = writeln!(out, "\tFocus Node: {}", renderer.term(&result.focus_node));
            if let Some(value) = &result.value {
                let _ = writeln!(out, "\tValue Node: {}", renderer.term(value));
            }
            if let Some(path) = &result.result_path {
                let _ = writeln!(out, "\tResult Path: {}", path.render(renderer));
            }
            let _ = writeln!(out, "\tMessage: {}", result.message);
        }
        out
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> NodeRenderer {
        NodeRenderer::new(&BTreeMap::from([(
            "ex".to_string(),
            "http://example.org/".to_string(),
        )]))
    }

    fn min_count_result(focus: &str, severity: Severity) -> ValidationResult {
        ValidationResult::new(
            Term::iri(format!("http://example.org/{focus}")),
            format!("Less than 1 values on ex:{focus}->ex:name"),
            severity,
            Term::Blank("b0".into()),
            "MinCountConstraintComponent",
        )
        .with_path(Some(PropertyPath::Predicate("http://example.org/name".into())))
        .with_shape_path(Some(PropertyPath::Predicate("http://example.org/name".into())))
    }

    #[test]
    fn test_any_severity_breaks_conformance() {
        let mut report = ValidationReport::new();
        assert!(report.conforms());
        report.add_result(min_count_result("a", Severity::Info));
        assert!(!report.conforms());
        assert_eq!(report.info_count(), 1);

        let mut report = ValidationReport::new();
        report.add_result(min_count_result("b", Severity::Warning));
        assert!(!report.conforms());
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.violation_count(), 0);
        assert!(report.render_text(&renderer()).starts_with("Validation Report\nConforms: False\n"));
    }

    #[test]
    fn test_render_text_layout() {
        let mut report = ValidationReport::new();
        report.add_result(min_count_result("alice", Severity::Violation));
        let text = report.render_text(&renderer());
        let expected = "Validation Report\n\
            Conforms: False\n\
            Results (1):\n\
            Constraint Violation in MinCountConstraintComponent (http://www.w3.org/ns/shacl#MinCountConstraintComponent):\n\
            \tSeverity: sh:Violation\n\
            \tSource Shape: [ sh:path ex:name ]\n\
            \tFocus Node: ex:alice\n\
            \tResult Path: ex:name\n\
            \tMessage: Less than 1 values on ex:alice->ex:name\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_conforming_report_has_no_results_section() {
        let text = ValidationReport::new().render_text(&renderer());
        assert_eq!(text, "Validation Report\nConforms: True\n");
    }

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let mut report = ValidationReport::new();
        report.add_result(min_count_result("b", Severity::Violation));
        report.add_result(min_count_result("a", Severity::Violation));
        report.add_result(min_count_result("a", Severity::Violation));
        report.normalize();
        let focus: Vec<_> = report
            .results()
            .iter()
            .map(|r| r.focus_node.to_string())
            .collect();
        assert_eq!(focus, vec!["<http://example.org/a>", "<http://example.org/b>"]);
    }

    #[test]
    fn test_renderer_falls_back_to_full_iri() {
        let r = renderer();
        assert_eq!(r.iri("http://example.org/name"), "ex:name");
        assert_eq!(r.iri("http://example.org/a/b"), "<http://example.org/a/b>");
        assert_eq!(r.iri("http://www.w3.org/ns/shacl#Violation"), "sh:Violation");
        assert_eq!(
            r.term(&Term::typed("5", "http://www.w3.org/2001/XMLSchema#integer")),
            "\"5\"^^xsd:integer"
        );
    }
}
