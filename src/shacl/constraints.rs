//! Constraint evaluation against a data graph.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::report::{NodeRenderer, ValidationResult};
use super::shapes::{Constraint, PropertyPath, Shape, ShapesGraph, Target};
use crate::graph::vocab::{RDF_TYPE, RDFS_SUB_CLASS_OF, XSD_NS};
use crate::graph::{Graph, Literal, Term};

/// Nesting limit for `sh:node`, `sh:property` and logical operators.
/// Recursive shapes stop being evaluated past this depth.
const MAX_DEPTH: usize = 32;

// =============================================================================
// Constraint Checker
// =============================================================================

pub struct ConstraintChecker<'a> {
    data: &'a Graph,
    shapes: &'a ShapesGraph,
    renderer: &'a NodeRenderer,
}

impl<'a> ConstraintChecker<'a> {
    pub fn new(data: &'a Graph, shapes: &'a ShapesGraph, renderer: &'a NodeRenderer) -> Self {
        Self {
            data,
            shapes,
            renderer,
        }
    }

    /// Every node selected by the shape's targets.
    pub fn focus_nodes(&self, shape: &Shape) -> BTreeSet<Term> {
        let mut nodes = BTreeSet::new();
        for target in &shape.targets {
            match target {
                Target::Node(node) => {
                    nodes.insert(node.clone());
                }
                Target::Class(class) => {
                    for class in self.subclasses_of(class) {
                        nodes.extend(self.data.instances_of(&class).cloned().map(Term::from));
                    }
                }
                Target::SubjectsOf(predicate) => {
                    nodes.extend(
                        self.data
                            .triples_with_predicate(predicate)
                            .map(|(s, _)| Term::from(s.clone())),
                    );
                }
                Target::ObjectsOf(predicate) => {
                    nodes.extend(
                        self.data
                            .triples_with_predicate(predicate)
                            .map(|(_, o)| o.clone()),
                    );
                }
            }
        }
        nodes
    }

    /// Validate one focus node against one shape.
    pub fn validate_shape(&self, shape: &Shape, focus: &Term, depth: usize) -> Vec<ValidationResult> {
        if shape.deactivated {
            return Vec::new();
        }
        if depth > MAX_DEPTH {
            tracing::warn!(shape = %shape.id, focus = %focus, "shape nesting too deep; treating as conforming");
            return Vec::new();
        }

        let values: Vec<Term> = match &shape.path {
            Some(path) => self.value_nodes(focus, path).into_iter().collect(),
            None => vec![focus.clone()],
        };

        let mut results = Vec::new();
        for constraint in &shape.constraints {
            self.check(shape, constraint, focus, &values, depth, &mut results);
        }
        results
    }

    /// Whether `node` conforms to the shape named `shape_id`.
    pub fn conforms(&self, shape_id: &Term, node: &Term, depth: usize) -> bool {
        match self.shapes.get(shape_id) {
            Some(shape) => self.validate_shape(shape, node, depth + 1).is_empty(),
            None => true,
        }
    }

    /// Values reached from `focus` along `path`.
    pub fn value_nodes(&self, focus: &Term, path: &PropertyPath) -> BTreeSet<Term> {
        self.eval_path(focus, path, false)
    }

    // =========================================================================
    // Paths
    // =========================================================================

    fn eval_path(&self, focus: &Term, path: &PropertyPath, inverse: bool) -> BTreeSet<Term> {
        match path {
            PropertyPath::Predicate(predicate) => {
                if inverse {
                    self.data
                        .subjects(predicate, focus)
                        .cloned()
                        .map(Term::from)
                        .collect()
                } else {
                    match focus.as_subject() {
                        Some(subject) => self.data.objects(&subject, predicate).cloned().collect(),
                        None => BTreeSet::new(),
                    }
                }
            }
            PropertyPath::Inverse(inner) => self.eval_path(focus, inner, !inverse),
            PropertyPath::Sequence(steps) => {
                let ordered: Vec<&PropertyPath> = if inverse {
                    steps.iter().rev().collect()
                } else {
                    steps.iter().collect()
                };
                let mut current = BTreeSet::from([focus.clone()]);
                for step in ordered {
                    current = current
                        .iter()
                        .flat_map(|node| self.eval_path(node, step, inverse))
                        .collect();
                }
                current
            }
            PropertyPath::Alternative(options) => options
                .iter()
                .flat_map(|option| self.eval_path(focus, option, inverse))
                .collect(),
            PropertyPath::ZeroOrMore(inner) => self.closure(focus, inner, inverse, true),
            PropertyPath::OneOrMore(inner) => self.closure(focus, inner, inverse, false),
            PropertyPath::ZeroOrOne(inner) => {
                let mut nodes = self.eval_path(focus, inner, inverse);
                nodes.insert(focus.clone());
                nodes
            }
        }
    }

    fn closure(
        &self,
        start: &Term,
        inner: &PropertyPath,
        inverse: bool,
        include_start: bool,
    ) -> BTreeSet<Term> {
        let mut reached = BTreeSet::new();
        let mut queue: Vec<Term> = self.eval_path(start, inner, inverse).into_iter().collect();
        while let Some(node) = queue.pop() {
            if reached.insert(node.clone()) {
                queue.extend(self.eval_path(&node, inner, inverse));
            }
        }
        if include_start {
            reached.insert(start.clone());
        }
        reached
    }

    // =========================================================================
    // Class Membership
    // =========================================================================

    /// `class` and every class below it through `rdfs:subClassOf`.
    fn subclasses_of(&self, class: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::from([class.to_string()]);
        let mut queue = vec![class.to_string()];
        while let Some(current) = queue.pop() {
            let object = Term::iri(current);
            for sub in self.data.subjects(RDFS_SUB_CLASS_OF, &object) {
                if let Some(iri) = sub.as_iri()
                    && found.insert(iri.to_string())
                {
                    queue.push(iri.to_string());
                }
            }
        }
        found
    }

    fn has_class(&self, value: &Term, class: &str) -> bool {
        let Some(subject) = value.as_subject() else {
            return false;
        };
        let mut seen = BTreeSet::new();
        let mut queue: Vec<Term> = self.data.objects(&subject, RDF_TYPE).cloned().collect();
        while let Some(current) = queue.pop() {
            if current.as_iri() == Some(class) {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = current.as_subject() {
                queue.extend(self.data.objects(&node, RDFS_SUB_CLASS_OF).cloned());
            }
        }
        false
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    fn result(&self, shape: &Shape, focus: &Term, component: &'static str, message: String) -> ValidationResult {
        ValidationResult::new(
            focus.clone(),
            shape.message.clone().unwrap_or(message),
            shape.severity,
            shape.id.clone(),
            component,
        )
        .with_path(shape.path.clone())
        .with_shape_path(shape.path.clone())
    }

    fn focus_label(&self, shape: &Shape, focus: &Term) -> String {
        match &shape.path {
            Some(path) => format!("{}->{}", self.renderer.term(focus), path.render(self.renderer)),
            None => self.renderer.term(focus),
        }
    }

    fn check(
        &self,
        shape: &Shape,
        constraint: &Constraint,
        focus: &Term,
        values: &[Term],
        depth: usize,
        out: &mut Vec<ValidationResult>,
    ) {
        let component = constraint.component();
        let r = self.renderer;
        let mut fail_each = |predicate: &dyn Fn(&Term) -> bool, message: &dyn Fn(&Term) -> String| {
            for value in values {
                if predicate(value) {
                    out.push(
                        self.result(shape, focus, component, message(value))
                            .with_value(value.clone()),
                    );
                }
            }
        };

        match constraint {
            Constraint::MinCount(min) => {
                if (values.len() as u64) < *min {
                    out.push(self.result(
                        shape,
                        focus,
                        component,
                        format!("Less than {min} values on {}", self.focus_label(shape, focus)),
                    ));
                }
            }
            Constraint::MaxCount(max) => {
                if (values.len() as u64) > *max {
                    out.push(self.result(
                        shape,
                        focus,
                        component,
                        format!("More than {max} values on {}", self.focus_label(shape, focus)),
                    ));
                }
            }
            Constraint::Datatype(datatype) => fail_each(
                &|v: &Term| !matches!(v, Term::Literal(l) if l.datatype_iri() == datatype.as_str() && is_valid_lexical(datatype, &l.value)),
                &|v: &Term| format!("Value {} is not Literal with datatype {}", r.term(v), r.iri(datatype)),
            ),
            Constraint::NodeKind(kind) => fail_each(
                &|v: &Term| !kind.matches(v),
                &|v: &Term| format!("Value {} is not of Node Kind sh:{}", r.term(v), kind.local_name()),
            ),
            Constraint::Class(class) => fail_each(
                &|v: &Term| !self.has_class(v, class),
                &|v: &Term| format!("Value {} does not have class {}", r.term(v), r.iri(class)),
            ),
            Constraint::MinInclusive(bound) => fail_each(
                &|v: &Term| !compares(v, bound, |o| o != Ordering::Less),
                &|v: &Term| format!("Value {} is not >= {}", r.term(v), r.literal(bound)),
            ),
            Constraint::MaxInclusive(bound) => fail_each(
                &|v: &Term| !compares(v, bound, |o| o != Ordering::Greater),
                &|v: &Term| format!("Value {} is not <= {}", r.term(v), r.literal(bound)),
            ),
            Constraint::MinExclusive(bound) => fail_each(
                &|v: &Term| !compares(v, bound, |o| o == Ordering::Greater),
                &|v: &Term| format!("Value {} is not > {}", r.term(v), r.literal(bound)),
            ),
            Constraint::MaxExclusive(bound) => fail_each(
                &|v: &Term| !compares(v, bound, |o| o == Ordering::Less),
                &|v: &Term| format!("Value {} is not < {}", r.term(v), r.literal(bound)),
            ),
            Constraint::MinLength(min) => fail_each(
                &|v: &Term| lexical_form(v).is_none_or(|s| (s.chars().count() as u64) < *min),
                &|_: &Term| format!("String length not >= {min}"),
            ),
            Constraint::MaxLength(max) => fail_each(
                &|v: &Term| lexical_form(v).is_none_or(|s| (s.chars().count() as u64) > *max),
                &|_: &Term| format!("String length not <= {max}"),
            ),
            Constraint::Pattern(pattern) => fail_each(
                &|v: &Term| lexical_form(v).is_none_or(|s| !pattern.regex.is_match(s)),
                &|v: &Term| format!("Value {} does not match pattern '{}'", r.term(v), pattern.source),
            ),
            Constraint::LanguageIn(tags) => fail_each(
                &|v: &Term| {
                    !matches!(v, Term::Literal(Literal { language: Some(lang), .. })
                        if tags.iter().any(|range| language_matches(lang, range)))
                },
                &|_: &Term| format!("String language is not in {tags:?}"),
            ),
            Constraint::In(allowed) => fail_each(
                &|v: &Term| !allowed.contains(v),
                &|v: &Term| {
                    let listed: Vec<String> = allowed.iter().map(|a| r.term(a)).collect();
                    format!("Value {} not in list [{}]", r.term(v), listed.join(", "))
                },
            ),
            Constraint::UniqueLang => {
                let mut by_language: BTreeMap<&str, usize> = BTreeMap::new();
                for value in values {
                    if let Term::Literal(Literal {
                        language: Some(lang),
                        ..
                    }) = value
                    {
                        *by_language.entry(lang.as_str()).or_default() += 1;
                    }
                }
                for (lang, count) in by_language {
                    if count > 1 {
                        out.push(self.result(
                            shape,
                            focus,
                            component,
                            format!("More than one String shares language \"{lang}\""),
                        ));
                    }
                }
            }
            Constraint::HasValue(expected) => {
                if !values.contains(expected) {
                    out.push(self.result(
                        shape,
                        focus,
                        component,
                        format!(
                            "Missing expected value {} on {}",
                            r.term(expected),
                            self.focus_label(shape, focus)
                        ),
                    ));
                }
            }
            Constraint::Equals(predicate) => {
                let others = self.predicate_values(focus, predicate);
                let mine: BTreeSet<Term> = values.iter().cloned().collect();
                for value in mine.symmetric_difference(&others) {
                    out.push(
                        self.result(
                            shape,
                            focus,
                            component,
                            format!(
                                "Value of {} != {}",
                                self.focus_label(shape, focus),
                                r.iri(predicate)
                            ),
                        )
                        .with_value(value.clone()),
                    );
                }
            }
            Constraint::Disjoint(predicate) => {
                let others = self.predicate_values(focus, predicate);
                fail_each(&|v: &Term| others.contains(v), &|v: &Term| {
                    format!(
                        "Value {} of {} is also a value of {}",
                        r.term(v),
                        self.focus_label(shape, focus),
                        r.iri(predicate)
                    )
                });
            }
            Constraint::LessThan(predicate) | Constraint::LessThanOrEquals(predicate) => {
                let or_equal = matches!(constraint, Constraint::LessThanOrEquals(_));
                let others = self.predicate_values(focus, predicate);
                let symbol = if or_equal { "<=" } else { "<" };
                fail_each(
                    &|v: &Term| {
                        others.iter().any(|o| match compare_terms(v, o) {
                            Some(Ordering::Less) => false,
                            Some(Ordering::Equal) => !or_equal,
                            _ => true,
                        })
                    },
                    &|v: &Term| {
                        format!(
                            "Value {} of {} is not {symbol} every value of {}",
                            r.term(v),
                            self.focus_label(shape, focus),
                            r.iri(predicate)
                        )
                    },
                );
            }
            Constraint::Closed { allowed } => {
                for value in values {
                    let Some(subject) = value.as_subject() else {
                        continue;
                    };
                    for triple in self.data.triples_with_subject(&subject) {
                        if allowed.contains(&triple.predicate) {
                            continue;
                        }
                        out.push(
                            self.result(
                                shape,
                                focus,
                                component,
                                format!(
                                    "Node {} is closed. It cannot have value: {}",
                                    r.term(value),
                                    r.term(&triple.object)
                                ),
                            )
                            .with_path(Some(PropertyPath::Predicate(triple.predicate.clone())))
                            .with_value(triple.object.clone()),
                        );
                    }
                }
            }
            Constraint::Node(node_shape) => fail_each(
                &|v: &Term| !self.conforms(node_shape, v, depth),
                &|v: &Term| format!("Value {} does not conform to Shape {}", r.term(v), r.term(node_shape)),
            ),
            Constraint::Not(negated) => fail_each(
                &|v: &Term| self.conforms(negated, v, depth),
                &|v: &Term| format!("Node {} conforms to shape {}", r.term(v), r.term(negated)),
            ),
            Constraint::And(members) => fail_each(
                &|v: &Term| !members.iter().all(|m| self.conforms(m, v, depth)),
                &|v: &Term| format!("Node {} does not conform to all shapes in {}", r.term(v), self.shape_list(members)),
            ),
            Constraint::Or(members) => fail_each(
                &|v: &Term| !members.iter().any(|m| self.conforms(m, v, depth)),
                &|v: &Term| {
                    format!(
                        "Node {} does not conform to one or more shapes in {}",
                        r.term(v),
                        self.shape_list(members)
                    )
                },
            ),
            Constraint::Xone(members) => fail_each(
                &|v: &Term| members.iter().filter(|m| self.conforms(m, v, depth)).count() != 1,
                &|v: &Term| {
                    format!(
                        "Node {} does not conform to exactly one shape in {}",
                        r.term(v),
                        self.shape_list(members)
                    )
                },
            ),
            Constraint::Property(property) => {
                if let Some(property_shape) = self.shapes.get(property) {
                    for value in values {
                        out.extend(self.validate_shape(property_shape, value, depth + 1));
                    }
                }
            }
            Constraint::QualifiedValueShape {
                shape: qualified,
                min,
                max,
                siblings,
            } => {
                let matching = values
                    .iter()
                    .filter(|v| {
                        self.conforms(qualified, v, depth)
                            && !siblings.iter().any(|s| self.conforms(s, v, depth))
                    })
                    .count() as u64;
                if let Some(min) = min
                    && matching < *min
                {
                    out.push(self.result(
                        shape,
                        focus,
                        "QualifiedMinCountConstraintComponent",
                        format!(
                            "Focus node does not conform to shape {} MinimumCount {min}",
                            r.term(qualified)
                        ),
                    ));
                }
                if let Some(max) = max
                    && matching > *max
                {
                    out.push(self.result(
                        shape,
                        focus,
                        "QualifiedMaxCountConstraintComponent",
                        format!(
                            "Focus node does not conform to shape {} MaximumCount {max}",
                            r.term(qualified)
                        ),
                    ));
                }
            }
        }
    }

    fn predicate_values(&self, focus: &Term, predicate: &str) -> BTreeSet<Term> {
        match focus.as_subject() {
            Some(subject) => self.data.objects(&subject, predicate).cloned().collect(),
            None => BTreeSet::new(),
        }
    }

    fn shape_list(&self, members: &[Term]) -> String {
        let names: Vec<String> = members.iter().map(|m| self.renderer.term(m)).collect();
        format!("({})", names.join(", "))
    }
}

// =============================================================================
// Literal Semantics
// =============================================================================

const NUMERIC_TYPES: [&str; 16] = [
    "integer",
    "decimal",
    "double",
    "float",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "positiveInteger",
    "negativeInteger",
    "nonPositiveInteger",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
    "unsignedByte",
];

fn xsd_local(datatype: &str) -> Option<&str> {
    datatype.strip_prefix(XSD_NS)
}

fn is_numeric(datatype: &str) -> bool {
    xsd_local(datatype).is_some_and(|local| NUMERIC_TYPES.contains(&local))
}

/// Text a string-based constraint applies to. Blank nodes have none.
fn lexical_form(term: &Term) -> Option<&str> {
    match term {
        Term::Iri(iri) => Some(iri),
        Term::Literal(literal) => Some(&literal.value),
        Term::Blank(_) => None,
    }
}

/// Basic language-range matching: `*`, exact tag, or tag prefix ending at `-`.
fn language_matches(tag: &str, range: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    range == "*"
        || tag == range
        || (tag.starts_with(&range) && tag.as_bytes().get(range.len()) == Some(&b'-'))
}

fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.strip_suffix('Z').unwrap_or(value);
    let date = if date.len() > 10 && matches!(date.as_bytes()[10], b'+' | b'-') {
        &date[..10]
    } else {
        date
    };
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn parse_number(value: &str) -> Option<f64> {
    match value.trim() {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        text if text.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')) => {
            text.parse::<f64>().ok()
        }
        _ => None,
    }
}

fn is_integer_lexical(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_decimal_lexical(value: &str) -> bool {
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    (!whole.is_empty() || !fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit())
}

/// Whether `value` is a legal lexical form of `datatype`. Datatypes without
/// a known lexical space accept anything.
pub(crate) fn is_valid_lexical(datatype: &str, value: &str) -> bool {
    let Some(local) = xsd_local(datatype) else {
        return true;
    };
    let integer_in = |min: i128, max: i128| {
        is_integer_lexical(value)
            && value
                .parse::<i128>()
                .is_ok_and(|n| n >= min && n <= max)
    };
    match local {
        "integer" => is_integer_lexical(value),
        "nonNegativeInteger" => integer_in(0, i128::MAX),
        "positiveInteger" => integer_in(1, i128::MAX),
        "nonPositiveInteger" => integer_in(i128::MIN, 0),
        "negativeInteger" => integer_in(i128::MIN, -1),
        "long" => integer_in(i64::MIN as i128, i64::MAX as i128),
        "int" => integer_in(i32::MIN as i128, i32::MAX as i128),
        "short" => integer_in(i16::MIN as i128, i16::MAX as i128),
        "byte" => integer_in(i8::MIN as i128, i8::MAX as i128),
        "unsignedLong" => integer_in(0, u64::MAX as i128),
        "unsignedInt" => integer_in(0, u32::MAX as i128),
        "unsignedShort" => integer_in(0, u16::MAX as i128),
        "unsignedByte" => integer_in(0, u8::MAX as i128),
        "decimal" => is_decimal_lexical(value),
        "double" | "float" => parse_number(value).is_some(),
        "boolean" => matches!(value, "true" | "false" | "1" | "0"),
        "dateTime" => parse_date_time(value).is_some(),
        "date" => parse_date(value).is_some(),
        _ => true,
    }
}

/// Order two literals when their value spaces are comparable.
pub(crate) fn compare_literals(a: &Literal, b: &Literal) -> Option<Ordering> {
    let (da, db) = (a.datatype_iri(), b.datatype_iri());
    if is_numeric(da) && is_numeric(db) {
        return parse_number(&a.value)?.partial_cmp(&parse_number(&b.value)?);
    }
    match (xsd_local(da), xsd_local(db)) {
        (Some("dateTime"), Some("dateTime")) => {
            return Some(parse_date_time(&a.value)?.cmp(&parse_date_time(&b.value)?));
        }
        (Some("date"), Some("date")) => {
            return Some(parse_date(&a.value)?.cmp(&parse_date(&b.value)?));
        }
        _ => {}
    }
    if da == db && a.language == b.language {
        return Some(a.value.cmp(&b.value));
    }
    None
}

fn compare_terms(a: &Term, b: &Term) -> Option<Ordering> {
    match (a, b) {
        (Term::Literal(a), Term::Literal(b)) => compare_literals(a, b),
        _ => None,
    }
}

/// Whether `value` is a literal whose comparison with `bound` satisfies `ok`.
fn compares(value: &Term, bound: &Literal, ok: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Term::Literal(literal) => compare_literals(literal, bound).is_some_and(ok),
        _ => false,
    }
}
