//! Minimal RDF view over parsed Turtle.

use anyhow::{Context, Result};
use oxrdf::{Subject, Term};
use oxttl::TurtleParser;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
pub const RDFS_RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Iri(String),
    Blank(String),
    Literal(String),
}

impl Node {
    pub fn iri(iri: impl Into<String>) -> Self {
        Node::Iri(iri.into())
    }

    pub fn is_iri(&self, iri: &str) -> bool {
        matches!(self, Node::Iri(i) if i == iri)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    /// Stable identifier for graph nodes: the IRI, `_:id`, or the literal text.
    pub fn id(&self) -> String {
        match self {
            Node::Iri(iri) => iri.clone(),
            Node::Blank(id) => format!("_:{}", id),
            Node::Literal(value) => value.clone(),
        }
    }

    /// Fragment after `#`, else the last path segment, else the whole id.
    pub fn local_name(&self) -> String {
        match self {
            Node::Iri(iri) => {
                let tail = iri.rsplit('#').next().unwrap_or(iri);
                let tail = if tail.is_empty() || tail == iri {
                    iri.trim_end_matches('/').rsplit('/').next().unwrap_or(iri)
                } else {
                    tail
                };
                if tail.is_empty() { iri.clone() } else { tail.to_string() }
            }
            other => other.id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Node,
    pub predicate: String,
    pub object: Node,
}

/// Parse a Turtle document. Statements that are not plain triples
/// (RDF-star) are ignored.
pub fn parse_turtle(text: &str) -> Result<Vec<Triple>> {
    let mut triples = Vec::new();

    for parsed in TurtleParser::new().for_reader(text.as_bytes()) {
        let triple = parsed.context("Invalid Turtle")?;

        let subject = match &triple.subject {
            Subject::NamedNode(n) => Node::Iri(n.as_str().to_string()),
            Subject::BlankNode(b) => Node::Blank(b.as_str().to_string()),
            #[allow(unreachable_patterns)]
            _ => continue,
        };
        let object = match &triple.object {
            Term::NamedNode(n) => Node::Iri(n.as_str().to_string()),
            Term::BlankNode(b) => Node::Blank(b.as_str().to_string()),
            Term::Literal(l) => Node::Literal(l.value().to_string()),
            #[allow(unreachable_patterns)]
            _ => continue,
        };

        triples.push(Triple {
            subject,
            predicate: triple.predicate.as_str().to_string(),
            object,
        });
    }

    Ok(triples)
}
