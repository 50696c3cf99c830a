//! Shape definitions read out of a shapes graph.
//!
//! Loading starts from every node that is declared a shape or carries a
//! target, then follows `sh:property`, `sh:node`, logical operators,
//! qualified value shapes and rule conditions until every referenced shape
//! has been read.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use super::report::{NodeRenderer, Severity};
use crate::error::{PipelineError, Result};
use crate::graph::vocab::{OWL_CLASS, RDF_FIRST, RDF_NIL, RDF_REST, RDF_TYPE, RDFS_CLASS, sh};
use crate::graph::{Graph, Literal, Subject, Term};

const TARGET_PREDICATES: [&str; 4] = [
    "targetNode",
    "targetClass",
    "targetSubjectsOf",
    "targetObjectsOf",
];

// =============================================================================
// Property Paths
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyPath {
    Predicate(String),
    Inverse(Box<PropertyPath>),
    Sequence(Vec<PropertyPath>),
    Alternative(Vec<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
}

impl PropertyPath {
    /// The predicate IRI when the path is a single predicate.
    pub fn as_predicate(&self) -> Option<&str> {
        match self {
            PropertyPath::Predicate(iri) => Some(iri),
            _ => None,
        }
    }

    /// SPARQL-style rendering: `^p`, `p/q`, `(p|q)`, `p*`, `p+`, `p?`.
    pub fn render(&self, renderer: &NodeRenderer) -> String {
        let grouped = |path: &PropertyPath| match path {
            PropertyPath::Predicate(_) | PropertyPath::Alternative(_) => path.render(renderer),
            _ => format!("({})", path.render(renderer)),
        };
        match self {
            PropertyPath::Predicate(iri) => renderer.iri(iri),
            PropertyPath::Inverse(inner) => format!("^{}", grouped(inner)),
            PropertyPath::Sequence(steps) => steps
                .iter()
                .map(|p| p.render(renderer))
                .collect::<Vec<_>>()
                .join("/"),
            PropertyPath::Alternative(options) => format!(
                "({})",
                options
                    .iter()
                    .map(|p| p.render(renderer))
                    .collect::<Vec<_>>()
                    .join("|")
            ),
            PropertyPath::ZeroOrMore(inner) => format!("{}*", grouped(inner)),
            PropertyPath::OneOrMore(inner) => format!("{}+", grouped(inner)),
            PropertyPath::ZeroOrOne(inner) => format!("{}?", grouped(inner)),
        }
    }
}

// =============================================================================
// Constraint Components
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub fn from_iri(iri: &str) -> Option<Self> {
        let local = iri.strip_prefix(crate::graph::vocab::SH_NS)?;
        match local {
            "IRI" => Some(NodeKind::Iri),
            "BlankNode" => Some(NodeKind::BlankNode),
            "Literal" => Some(NodeKind::Literal),
            "BlankNodeOrIRI" => Some(NodeKind::BlankNodeOrIri),
            "BlankNodeOrLiteral" => Some(NodeKind::BlankNodeOrLiteral),
            "IRIOrLiteral" => Some(NodeKind::IriOrLiteral),
            _ => None,
        }
    }

    pub fn local_name(&self) -> &'static str {
        match self {
            NodeKind::Iri => "IRI",
            NodeKind::BlankNode => "BlankNode",
            NodeKind::Literal => "Literal",
            NodeKind::BlankNodeOrIri => "BlankNodeOrIRI",
            NodeKind::BlankNodeOrLiteral => "BlankNodeOrLiteral",
            NodeKind::IriOrLiteral => "IRIOrLiteral",
        }
    }

    pub fn matches(&self, term: &Term) -> bool {
        match (self, term) {
            (NodeKind::Iri, Term::Iri(_)) => true,
            (NodeKind::BlankNode, Term::Blank(_)) => true,
            (NodeKind::Literal, Term::Literal(_)) => true,
            (NodeKind::BlankNodeOrIri, Term::Iri(_) | Term::Blank(_)) => true,
            (NodeKind::BlankNodeOrLiteral, Term::Blank(_) | Term::Literal(_)) => true,
            (NodeKind::IriOrLiteral, Term::Iri(_) | Term::Literal(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatternConstraint {
    pub regex: Regex,
    pub source: String,
    pub flags: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Constraint {
    MinCount(u64),
    MaxCount(u64),
    Datatype(String),
    NodeKind(NodeKind),
    Class(String),
    MinInclusive(Literal),
    MaxInclusive(Literal),
    MinExclusive(Literal),
    MaxExclusive(Literal),
    MinLength(u64),
    MaxLength(u64),
    Pattern(PatternConstraint),
    LanguageIn(Vec<String>),
    UniqueLang,
    In(Vec<Term>),
    HasValue(Term),
    Equals(String),
    Disjoint(String),
    LessThan(String),
    LessThanOrEquals(String),
    Closed { allowed: BTreeSet<String> },
    Node(Term),
    Not(Term),
    And(Vec<Term>),
    Or(Vec<Term>),
    Xone(Vec<Term>),
    Property(Term),
    QualifiedValueShape {
        shape: Term,
        min: Option<u64>,
        max: Option<u64>,
        /// Qualified shapes of sibling property shapes, when
        /// `sh:qualifiedValueShapesDisjoint` is set
        siblings: Vec<Term>,
    },
}

impl Constraint {
    /// Local name of the constraint component in the `sh:` namespace.
    pub fn component(&self) -> &'static str {
        match self {
            Constraint::MinCount(_) => "MinCountConstraintComponent",
            Constraint::MaxCount(_) => "MaxCountConstraintComponent",
            Constraint::Datatype(_) => "DatatypeConstraintComponent",
            Constraint::NodeKind(_) => "NodeKindConstraintComponent",
            Constraint::Class(_) => "ClassConstraintComponent",
            Constraint::MinInclusive(_) => "MinInclusiveConstraintComponent",
            Constraint::MaxInclusive(_) => "MaxInclusiveConstraintComponent",
            Constraint::MinExclusive(_) => "MinExclusiveConstraintComponent",
            Constraint::MaxExclusive(_) => "MaxExclusiveConstraintComponent",
            Constraint::MinLength(_) => "MinLengthConstraintComponent",
            Constraint::MaxLength(_) => "MaxLengthConstraintComponent",
            Constraint::Pattern(_) => "PatternConstraintComponent",
            Constraint::LanguageIn(_) => "LanguageInConstraintComponent",
            Constraint::UniqueLang => "UniqueLangConstraintComponent",
            Constraint::In(_) => "InConstraintComponent",
            Constraint::HasValue(_) => "HasValueConstraintComponent",
            Constraint::Equals(_) => "EqualsConstraintComponent",
            Constraint::Disjoint(_) => "DisjointConstraintComponent",
            Constraint::LessThan(_) => "LessThanConstraintComponent",
            Constraint::LessThanOrEquals(_) => "LessThanOrEqualsConstraintComponent",
            Constraint::Closed { .. } => "ClosedConstraintComponent",
            Constraint::Node(_) => "NodeConstraintComponent",
            Constraint::Not(_) => "NotConstraintComponent",
            Constraint::And(_) => "AndConstraintComponent",
            Constraint::Or(_) => "OrConstraintComponent",
            Constraint::Xone(_) => "XoneConstraintComponent",
            Constraint::Property(_) => "PropertyConstraintComponent",
            Constraint::QualifiedValueShape { .. } => "QualifiedValueShapeConstraintComponent",
        }
    }
}

// =============================================================================
// Targets and Rules
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(Term),
    Class(String),
    SubjectsOf(String),
    ObjectsOf(String),
}

/// A node expression in a triple rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeExpr {
    /// `sh:this`, the focus node
    This,
    Constant(Term),
    /// `[ sh:path p ]`, the values reached from the focus node
    Path(PropertyPath),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripleRule {
    pub id: Term,
    pub subject: NodeExpr,
    pub predicate: String,
    pub object: NodeExpr,
    /// Shapes the focus node must conform to for the rule to fire
    pub conditions: Vec<Term>,
    pub order: f64,
}

// =============================================================================
// Shapes
// =============================================================================

#[derive(Debug, Clone)]
pub struct Shape {
    pub id: Term,
    /// Present for property shapes
    pub path: Option<PropertyPath>,
    pub targets: Vec<Target>,
    pub constraints: Vec<Constraint>,
    pub severity: Severity,
    pub message: Option<String>,
    pub deactivated: bool,
    pub rules: Vec<TripleRule>,
}

impl Shape {
    pub fn is_property_shape(&self) -> bool {
        self.path.is_some()
    }
}

/// All shapes read from a shapes graph, keyed by their node.
#[derive(Debug, Clone, Default)]
pub struct ShapesGraph {
    shapes: BTreeMap<Term, Shape>,
    roots: Vec<Term>,
    prefixes: BTreeMap<String, String>,
}

impl ShapesGraph {
    pub fn load(graph: &Graph) -> Result<Self> {
        let mut candidates = BTreeSet::new();
        for class in [sh("NodeShape"), sh("PropertyShape")] {
            candidates.extend(graph.instances_of(&class).cloned().map(Term::from));
        }
        for predicate in TARGET_PREDICATES {
            let predicate = sh(predicate);
            candidates.extend(
                graph
                    .triples_with_predicate(&predicate)
                    .map(|(s, _)| Term::from(s.clone())),
            );
        }

        let mut shapes = BTreeMap::new();
        let mut pending: Vec<Term> = candidates.iter().cloned().collect();
        while let Some(id) = pending.pop() {
            if shapes.contains_key(&id) {
                continue;
            }
            let shape = read_shape(graph, &id, &mut pending)?;
            shapes.insert(id, shape);
        }

        let roots = candidates
            .into_iter()
            .filter(|id| {
                shapes
                    .get(id)
                    .is_some_and(|shape: &Shape| !shape.deactivated && !shape.targets.is_empty())
            })
            .collect::<Vec<_>>();

        tracing::debug!(shapes = shapes.len(), targeted = roots.len(), "loaded shapes graph");

        Ok(Self {
            shapes,
            roots,
            prefixes: graph.prefixes().clone(),
        })
    }

    pub fn get(&self, id: &Term) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Active shapes that carry at least one target.
    pub fn roots(&self) -> impl Iterator<Item = &Shape> {
        self.roots.iter().filter_map(|id| self.shapes.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }
}

// =============================================================================
// Reading
// =============================================================================

struct ShapeReader<'a> {
    graph: &'a Graph,
    id: &'a Term,
    node: Subject,
}

impl<'a> ShapeReader<'a> {
    fn values(&self, local: &str) -> Vec<Term> {
        self.graph.objects(&self.node, &sh(local)).cloned().collect()
    }

    fn one(&self, local: &str) -> Option<Term> {
        self.graph.object(&self.node, &sh(local)).cloned()
    }

    fn iri_values(&self, local: &str) -> Result<Vec<String>> {
        self.values(local)
            .into_iter()
            .map(|term| match term {
                Term::Iri(iri) => Ok(iri),
                other => Err(self.invalid(format!("sh:{local} expects an IRI, found {other}"))),
            })
            .collect()
    }

    fn literal_values(&self, local: &str) -> Result<Vec<Literal>> {
        self.values(local)
            .into_iter()
            .map(|term| match term {
                Term::Literal(literal) => Ok(literal),
                other => Err(self.invalid(format!("sh:{local} expects a literal, found {other}"))),
            })
            .collect()
    }

    fn count(&self, local: &str) -> Result<Option<u64>> {
        match self.one(local) {
            None => Ok(None),
            Some(Term::Literal(literal)) => literal.value.trim().parse::<u64>().map(Some).map_err(|_| {
                self.invalid(format!(
                    "sh:{local} expects a non-negative integer, found {literal}"
                ))
            }),
            Some(other) => Err(self.invalid(format!("sh:{local} expects a literal, found {other}"))),
        }
    }

    fn flag(&self, local: &str) -> bool {
        matches!(
            self.one(local),
            Some(Term::Literal(literal)) if literal.value == "true" || literal.value == "1"
        )
    }

    fn list(&self, local: &str) -> Result<Vec<Vec<Term>>> {
        self.values(local)
            .iter()
            .map(|head| list_items(self.graph, head))
            .collect()
    }

    fn invalid(&self, message: String) -> PipelineError {
        PipelineError::invalid_shape(self.id, message)
    }
}

fn read_shape(graph: &Graph, id: &Term, pending: &mut Vec<Term>) -> Result<Shape> {
    let Some(node) = id.as_subject() else {
        return Err(PipelineError::invalid_shape(id, "a literal cannot be a shape"));
    };
    let reader = ShapeReader { graph, id, node };

    let path = match reader.one("path") {
        Some(term) => Some(read_path(graph, &term)?),
        None => None,
    };

    let mut targets = Vec::new();
    targets.extend(reader.values("targetNode").into_iter().map(Target::Node));
    targets.extend(reader.iri_values("targetClass")?.into_iter().map(Target::Class));
    targets.extend(
        reader
            .iri_values("targetSubjectsOf")?
            .into_iter()
            .map(Target::SubjectsOf),
    );
    targets.extend(
        reader
            .iri_values("targetObjectsOf")?
            .into_iter()
            .map(Target::ObjectsOf),
    );
    if let Term::Iri(iri) = id
        && (graph.has(&reader.node, RDF_TYPE, &Term::iri(RDFS_CLASS))
            || graph.has(&reader.node, RDF_TYPE, &Term::iri(OWL_CLASS)))
    {
        targets.push(Target::Class(iri.clone()));
    }
    if reader.one("target").is_some() {
        tracing::warn!(shape = %id, "SPARQL-based targets are not supported; target skipped");
    }

    let severity = reader
        .one("severity")
        .and_then(|term| term.as_iri().map(Severity::from_iri))
        .unwrap_or(Severity::Violation);

    let mut messages = reader.literal_values("message")?;
    messages.sort_by_key(|literal| literal.language.is_some());
    let message = messages.into_iter().next().map(|literal| literal.value);

    let constraints = read_constraints(&reader, path.as_ref(), pending)?;

    let mut rules = Vec::new();
    for rule in reader.values("rule") {
        if let Some(rule) = read_rule(graph, &rule, pending)? {
            rules.push(rule);
        }
    }

    if reader.one("sparql").is_some() {
        tracing::warn!(shape = %id, "SPARQL-based constraints are not supported; constraint skipped");
    }
    if reader.one("js").is_some() {
        tracing::warn!(shape = %id, "JavaScript constraints are disabled; constraint skipped");
    }

    Ok(Shape {
        id: id.clone(),
        path,
        targets,
        constraints,
        severity,
        message,
        deactivated: reader.flag("deactivated"),
        rules,
    })
}

fn read_constraints(
    reader: &ShapeReader<'_>,
    path: Option<&PropertyPath>,
    pending: &mut Vec<Term>,
) -> Result<Vec<Constraint>> {
    let mut constraints = Vec::new();

    if path.is_some() {
        if let Some(n) = reader.count("minCount")? {
            constraints.push(Constraint::MinCount(n));
        }
        if let Some(n) = reader.count("maxCount")? {
            constraints.push(Constraint::MaxCount(n));
        }
        if reader.flag("uniqueLang") {
            constraints.push(Constraint::UniqueLang);
        }
        for predicate in reader.iri_values("lessThan")? {
            constraints.push(Constraint::LessThan(predicate));
        }
        for predicate in reader.iri_values("lessThanOrEquals")? {
            constraints.push(Constraint::LessThanOrEquals(predicate));
        }
        if let Some(shape) = reader.one("qualifiedValueShape") {
            let siblings = if reader.flag("qualifiedValueShapesDisjoint") {
                sibling_qualified_shapes(reader.graph, reader.id)
            } else {
                Vec::new()
            };
            pending.push(shape.clone());
            pending.extend(siblings.iter().cloned());
            constraints.push(Constraint::QualifiedValueShape {
                shape,
                min: reader.count("qualifiedMinCount")?,
                max: reader.count("qualifiedMaxCount")?,
                siblings,
            });
        }
    }

    for datatype in reader.iri_values("datatype")? {
        constraints.push(Constraint::Datatype(datatype));
    }
    for kind in reader.iri_values("nodeKind")? {
        let kind = NodeKind::from_iri(&kind)
            .ok_or_else(|| reader.invalid(format!("unknown node kind <{kind}>")))?;
        constraints.push(Constraint::NodeKind(kind));
    }
    for class in reader.iri_values("class")? {
        constraints.push(Constraint::Class(class));
    }

    for literal in reader.literal_values("minInclusive")? {
        constraints.push(Constraint::MinInclusive(literal));
    }
    for literal in reader.literal_values("maxInclusive")? {
        constraints.push(Constraint::MaxInclusive(literal));
    }
    for literal in reader.literal_values("minExclusive")? {
        constraints.push(Constraint::MinExclusive(literal));
    }
    for literal in reader.literal_values("maxExclusive")? {
        constraints.push(Constraint::MaxExclusive(literal));
    }

    if let Some(n) = reader.count("minLength")? {
        constraints.push(Constraint::MinLength(n));
    }
    if let Some(n) = reader.count("maxLength")? {
        constraints.push(Constraint::MaxLength(n));
    }

    let flags = reader.one("flags").and_then(|term| term.as_literal().map(|l| l.value.clone()));
    for pattern in reader.literal_values("pattern")? {
        constraints.push(Constraint::Pattern(compile_pattern(
            reader,
            &pattern.value,
            flags.as_deref(),
        )?));
    }

    for list in reader.list("languageIn")? {
        let tags = list
            .into_iter()
            .map(|term| match term {
                Term::Literal(literal) => Ok(literal.value.to_ascii_lowercase()),
                other => Err(reader.invalid(format!("sh:languageIn expects literals, found {other}"))),
            })
            .collect::<Result<Vec<_>>>()?;
        constraints.push(Constraint::LanguageIn(tags));
    }

    for list in reader.list("in")? {
        constraints.push(Constraint::In(list));
    }
    for value in reader.values("hasValue") {
        constraints.push(Constraint::HasValue(value));
    }
    for predicate in reader.iri_values("equals")? {
        constraints.push(Constraint::Equals(predicate));
    }
    for predicate in reader.iri_values("disjoint")? {
        constraints.push(Constraint::Disjoint(predicate));
    }

    if reader.flag("closed") {
        let mut allowed: BTreeSet<String> = reader
            .list("ignoredProperties")?
            .into_iter()
            .flatten()
            .filter_map(|term| term.as_iri().map(str::to_string))
            .collect();
        for property in reader.values("property") {
            if let Some(node) = property.as_subject()
                && let Some(Term::Iri(predicate)) = reader.graph.object(&node, &sh("path"))
            {
                allowed.insert(predicate.clone());
            }
        }
        constraints.push(Constraint::Closed { allowed });
    }

    for shape in reader.values("node") {
        pending.push(shape.clone());
        constraints.push(Constraint::Node(shape));
    }
    for shape in reader.values("not") {
        pending.push(shape.clone());
        constraints.push(Constraint::Not(shape));
    }
    for members in reader.list("and")? {
        pending.extend(members.iter().cloned());
        constraints.push(Constraint::And(members));
    }
    for members in reader.list("or")? {
        pending.extend(members.iter().cloned());
        constraints.push(Constraint::Or(members));
    }
    for members in reader.list("xone")? {
        pending.extend(members.iter().cloned());
        constraints.push(Constraint::Xone(members));
    }
    for shape in reader.values("property") {
        let has_path = shape
            .as_subject()
            .is_some_and(|node| reader.graph.object(&node, &sh("path")).is_some());
        if !has_path {
            return Err(PipelineError::invalid_shape(
                &shape,
                format!("property shape of {} has no sh:path", reader.id),
            ));
        }
        pending.push(shape.clone());
        constraints.push(Constraint::Property(shape));
    }

    Ok(constraints)
}

/// Build a regex honoring the `i`, `m`, `s` and `x` flags.
fn compile_pattern(
    reader: &ShapeReader<'_>,
    pattern: &str,
    flags: Option<&str>,
) -> Result<PatternConstraint> {
    let inline: String = flags
        .unwrap_or("")
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
        .collect();
    let source = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    let regex = Regex::new(&source)
        .map_err(|e| reader.invalid(format!("invalid sh:pattern {pattern:?}: {e}")))?;
    Ok(PatternConstraint {
        regex,
        source: pattern.to_string(),
        flags: flags.map(str::to_string),
    })
}

/// Qualified value shapes declared by the other property shapes of every
/// shape that lists `property_shape` under `sh:property`.
fn sibling_qualified_shapes(graph: &Graph, property_shape: &Term) -> Vec<Term> {
    let property = sh("property");
    let qualified = sh("qualifiedValueShape");
    let mut siblings = BTreeSet::new();
    for parent in graph.subjects(&property, property_shape) {
        for sibling in graph.objects(parent, &property) {
            if sibling == property_shape {
                continue;
            }
            if let Some(node) = sibling.as_subject() {
                siblings.extend(graph.objects(&node, &qualified).cloned());
            }
        }
    }
    siblings.into_iter().collect()
}

pub(crate) fn read_path(graph: &Graph, term: &Term) -> Result<PropertyPath> {
    let node = match term {
        Term::Iri(iri) => return Ok(PropertyPath::Predicate(iri.clone())),
        Term::Blank(label) => Subject::Blank(label.clone()),
        Term::Literal(_) => {
            return Err(PipelineError::invalid_shape(term, "a literal cannot be a path"));
        }
    };

    if graph.object(&node, RDF_FIRST).is_some() {
        let steps = list_items(graph, term)?
            .iter()
            .map(|step| read_path(graph, step))
            .collect::<Result<Vec<_>>>()?;
        return Ok(PropertyPath::Sequence(steps));
    }
    if let Some(inner) = graph.object(&node, &sh("inversePath")) {
        return Ok(PropertyPath::Inverse(Box::new(read_path(graph, inner)?)));
    }
    if let Some(list) = graph.object(&node, &sh("alternativePath")) {
        let options = list_items(graph, list)?
            .iter()
            .map(|option| read_path(graph, option))
            .collect::<Result<Vec<_>>>()?;
        return Ok(PropertyPath::Alternative(options));
    }
    if let Some(inner) = graph.object(&node, &sh("zeroOrMorePath")) {
        return Ok(PropertyPath::ZeroOrMore(Box::new(read_path(graph, inner)?)));
    }
    if let Some(inner) = graph.object(&node, &sh("oneOrMorePath")) {
        return Ok(PropertyPath::OneOrMore(Box::new(read_path(graph, inner)?)));
    }
    if let Some(inner) = graph.object(&node, &sh("zeroOrOnePath")) {
        return Ok(PropertyPath::ZeroOrOne(Box::new(read_path(graph, inner)?)));
    }
    Err(PipelineError::invalid_shape(term, "unrecognized property path"))
}

/// Members of the RDF list starting at `head`.
pub(crate) fn list_items(graph: &Graph, head: &Term) -> Result<Vec<Term>> {
    let mut items = Vec::new();
    let mut seen = BTreeSet::new();
    let mut current = head.clone();
    loop {
        if current.as_iri() == Some(RDF_NIL) {
            return Ok(items);
        }
        let Some(node) = current.as_subject() else {
            return Err(PipelineError::invalid_shape(head, "malformed RDF list"));
        };
        if !seen.insert(node.clone()) {
            return Err(PipelineError::invalid_shape(head, "cyclic RDF list"));
        }
        let (Some(first), Some(rest)) = (graph.object(&node, RDF_FIRST), graph.object(&node, RDF_REST))
        else {
            return Err(PipelineError::invalid_shape(head, "RDF list node without rdf:first/rdf:rest"));
        };
        items.push(first.clone());
        current = rest.clone();
    }
}

fn read_node_expr(graph: &Graph, term: &Term) -> Result<NodeExpr> {
    if term.as_iri() == Some(sh("this").as_str()) {
        return Ok(NodeExpr::This);
    }
    if let Some(node) = term.as_subject()
        && node.is_blank()
        && let Some(path) = graph.object(&node, &sh("path"))
    {
        return Ok(NodeExpr::Path(read_path(graph, path)?));
    }
    Ok(NodeExpr::Constant(term.clone()))
}

fn read_rule(graph: &Graph, id: &Term, pending: &mut Vec<Term>) -> Result<Option<TripleRule>> {
    let Some(node) = id.as_subject() else {
        return Err(PipelineError::invalid_shape(id, "a literal cannot be a rule"));
    };
    let reader = ShapeReader { graph, id, node };

    if graph.has(&reader.node, RDF_TYPE, &Term::iri(sh("SPARQLRule"))) {
        tracing::warn!(rule = %id, "SPARQL rules are not supported; rule skipped");
        return Ok(None);
    }
    if reader.flag("deactivated") {
        return Ok(None);
    }

    let (Some(subject), Some(predicate), Some(object)) =
        (reader.one("subject"), reader.one("predicate"), reader.one("object"))
    else {
        return Err(reader.invalid("triple rule needs sh:subject, sh:predicate and sh:object".into()));
    };
    let Term::Iri(predicate) = predicate else {
        return Err(reader.invalid(format!("rule predicate must be an IRI, found {predicate}")));
    };

    let conditions = reader.values("condition");
    pending.extend(conditions.iter().cloned());

    let order = reader
        .one("order")
        .and_then(|term| term.as_literal().and_then(|l| l.value.trim().parse::<f64>().ok()))
        .unwrap_or(0.0);

    Ok(Some(TripleRule {
        id: id.clone(),
        subject: read_node_expr(graph, &subject)?,
        predicate,
        object: read_node_expr(graph, &object)?,
        conditions,
        order,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RdfSyntax;
    use assert_matches::assert_matches;
    use std::path::PathBuf;

    const PREFIXES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
    "#;

    fn load(body: &str) -> Result<ShapesGraph> {
        let mut graph = Graph::new();
        graph
            .parse_bytes(
                format!("{PREFIXES}{body}").as_bytes(),
                RdfSyntax::Turtle,
                &PathBuf::from("shapes.ttl"),
            )
            .unwrap();
        ShapesGraph::load(&graph)
    }

    #[test]
    fn test_property_shapes_are_followed() {
        let shapes = load(
            r#"
            ex:PersonShape a sh:NodeShape ;
                sh:targetClass ex:Person ;
                sh:property [ sh:path ex:name ; sh:minCount 1 ; sh:datatype xsd:string ] .
            "#,
        )
        .unwrap();
        assert_eq!(shapes.len(), 2);
        let roots: Vec<_> = shapes.roots().collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].targets, vec![Target::Class("http://example.org/Person".into())]);

        let property = shapes.iter().find(|s| s.is_property_shape()).unwrap();
        assert_eq!(property.path.as_ref().and_then(|p| p.as_predicate()), Some("http://example.org/name"));
        assert_matches!(property.constraints[0], Constraint::MinCount(1));
    }

    #[test]
    fn test_complex_paths() {
        let shapes = load(
            r#"
            ex:S a sh:NodeShape ; sh:targetNode ex:a ;
                sh:property [ sh:path ( ex:knows [ sh:inversePath ex:parent ] ) ] ;
                sh:property [ sh:path [ sh:alternativePath ( ex:p ex:q ) ] ] ;
                sh:property [ sh:path [ sh:zeroOrMorePath ex:next ] ] .
            "#,
        )
        .unwrap();
        let renderer = NodeRenderer::new(&BTreeMap::from([(
            "ex".to_string(),
            "http://example.org/".to_string(),
        )]));
        let mut rendered: Vec<_> = shapes
            .iter()
            .filter_map(|s| s.path.as_ref().map(|p| p.render(&renderer)))
            .collect();
        rendered.sort();
        assert_eq!(rendered, vec!["(ex:p|ex:q)", "ex:knows/^ex:parent", "ex:next*"]);
    }

    #[test]
    fn test_implicit_class_target() {
        let shapes = load("ex:Person a rdfs:Class, sh:NodeShape ; sh:closed true .").unwrap();
        let root = shapes.roots().next().unwrap();
        assert_eq!(root.targets, vec![Target::Class("http://example.org/Person".into())]);
    }

    #[test]
    fn test_deactivated_shapes_are_not_roots() {
        let shapes = load("ex:S sh:targetNode ex:a ; sh:deactivated true ; sh:nodeKind sh:IRI .").unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes.roots().count(), 0);
    }

    #[test]
    fn test_pattern_flags_and_invalid_pattern() {
        let shapes = load(r#"ex:S sh:targetNode ex:a ; sh:pattern "^abc" ; sh:flags "i" ."#).unwrap();
        let root = shapes.roots().next().unwrap();
        let Constraint::Pattern(pattern) = &root.constraints[0] else {
            panic!("expected pattern constraint");
        };
        assert!(pattern.regex.is_match("ABCdef"));

        let err = load(r#"ex:S sh:targetNode ex:a ; sh:pattern "(" ."#).unwrap_err();
        assert_eq!(err.category(), "invalid_shape");
    }

    #[test]
    fn test_bad_count_is_invalid_shape() {
        let err = load(r#"ex:S sh:targetNode ex:a ; sh:property [ sh:path ex:p ; sh:minCount "many" ] ."#)
            .unwrap_err();
        assert_matches!(err, PipelineError::InvalidShape { .. });
    }

    #[test]
    fn test_property_shape_requires_path() {
        let err = load(r#"ex:S sh:targetNode ex:a ; sh:property [ sh:minCount 1 ] ."#).unwrap_err();
        assert_matches!(err, PipelineError::InvalidShape { ref message, .. } if message.contains("sh:path"));

        let err = load(r#"ex:S sh:targetNode ex:a ; sh:property ex:Named . ex:Named sh:datatype ex:T ."#)
            .unwrap_err();
        assert_eq!(err.category(), "invalid_shape");
    }

    #[test]
    fn test_triple_rule_parsing() {
        let shapes = load(
            r#"
            ex:S a sh:NodeShape ; sh:targetClass ex:Square ;
                sh:rule [ a sh:TripleRule ; sh:subject sh:this ; sh:predicate rdfs:label ; sh:object "square" ; sh:order 2 ] .
            "#,
        )
        .unwrap();
        let root = shapes.roots().next().unwrap();
        assert_eq!(root.rules.len(), 1);
        assert_eq!(root.rules[0].subject, NodeExpr::This);
        assert_eq!(root.rules[0].object, NodeExpr::Constant(Term::literal("square")));
        assert_eq!(root.rules[0].order, 2.0);
    }
}
