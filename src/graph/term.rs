//! RDF terms and triples.
//!
//! The derived orderings are what makes serialization deterministic: a
//! [`Graph`](super::Graph) iterates its triples in `(subject, predicate,
//! object)` order, IRIs sort before blank nodes, blank nodes before literals.

use oxigraph::model as ox;
use std::fmt;

use super::vocab::{RDF_LANG_STRING, XSD_STRING};

/// Anything allowed in subject position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    Iri(String),
    Blank(String),
}

impl Subject {
    pub fn iri(iri: impl Into<String>) -> Self {
        Subject::Iri(iri.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Subject::Iri(iri) => Some(iri),
            Subject::Blank(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Subject::Blank(_))
    }

    /// Smallest subject in the total order, used as a range lower bound.
    pub(crate) fn min() -> Self {
        Subject::Iri(String::new())
    }

    pub(crate) fn to_oxigraph(&self) -> ox::NamedOrBlankNode {
        match self {
            Subject::Iri(iri) => ox::NamedNode::new_unchecked(iri.as_str()).into(),
            Subject::Blank(label) => ox::BlankNode::new_unchecked(label.as_str()).into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Iri(iri) => write!(f, "<{iri}>"),
            Subject::Blank(label) => write!(f, "_:{label}"),
        }
    }
}

/// A literal value. Plain strings and `xsd:string` literals share one
/// representation (`datatype: None`), and language-tagged strings carry only
/// their tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub value: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        if datatype == XSD_STRING {
            return Self::simple(value);
        }
        Self {
            value: value.into(),
            datatype: Some(datatype),
            language: None,
        }
    }

    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: Some(language.into().to_ascii_lowercase()),
        }
    }

    /// Effective datatype IRI, following RDF 1.1 defaults.
    pub fn datatype_iri(&self) -> &str {
        match (&self.datatype, &self.language) {
            (Some(datatype), _) => datatype,
            (None, Some(_)) => RDF_LANG_STRING,
            (None, None) => XSD_STRING,
        }
    }

    pub(crate) fn from_oxigraph(literal: &ox::Literal) -> Self {
        match literal.language() {
            Some(language) => Self::lang(literal.value(), language),
            None => Self::typed(literal.value(), literal.datatype().as_str()),
        }
    }

    pub(crate) fn to_oxigraph(&self) -> ox::Literal {
        match (&self.language, &self.datatype) {
            (Some(language), _) => {
                ox::Literal::new_language_tagged_literal_unchecked(self.value.as_str(), language.as_str())
            }
            (None, Some(datatype)) => ox::Literal::new_typed_literal(
                self.value.as_str(),
                ox::NamedNode::new_unchecked(datatype.as_str()),
            ),
            (None, None) => ox::Literal::new_simple_literal(self.value.as_str()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.value.chars() {
            match c {
                '"' => write!(f, "\\\"")?,
                '\\' => write!(f, "\\\\")?,
                '\n' => write!(f, "\\n")?,
                '\r' => write!(f, "\\r")?,
                '\t' => write!(f, "\\t")?,
                c => write!(f, "{c}")?,
            }
        }
        write!(f, "\"")?;
        match (&self.language, &self.datatype) {
            (Some(language), _) => write!(f, "@{language}"),
            (None, Some(datatype)) => write!(f, "^^<{datatype}>"),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(value))
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(value, datatype))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// The term as a subject, if it may stand in subject position.
    pub fn as_subject(&self) -> Option<Subject> {
        match self {
            Term::Iri(iri) => Some(Subject::Iri(iri.clone())),
            Term::Blank(label) => Some(Subject::Blank(label.clone())),
            Term::Literal(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub(crate) fn min() -> Self {
        Term::Iri(String::new())
    }

    pub(crate) fn to_oxigraph(&self) -> ox::Term {
        match self {
            Term::Iri(iri) => ox::NamedNode::new_unchecked(iri.as_str()).into(),
            Term::Blank(label) => ox::BlankNode::new_unchecked(label.as_str()).into(),
            Term::Literal(literal) => literal.to_oxigraph().into(),
        }
    }
}

impl From<Subject> for Term {
    fn from(subject: Subject) -> Self {
        match subject {
            Subject::Iri(iri) => Term::Iri(iri),
            Subject::Blank(label) => Term::Blank(label),
        }
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(label) => write!(f, "_:{label}"),
            Term::Literal(literal) => literal.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: Subject,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Subject, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    pub(crate) fn to_oxigraph(&self) -> ox::Triple {
        ox::Triple::new(
            self.subject.to_oxigraph(),
            ox::NamedNode::new_unchecked(self.predicate.as_str()),
            self.object.to_oxigraph(),
        )
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}
