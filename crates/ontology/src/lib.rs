//! Ontology outputs: Turtle rendering, LLM-assisted synthesis, and on-disk
//! persistence of partial and merged extractions.

pub mod rdf;
pub mod store;
pub mod synthesize;
pub mod turtle;

pub use rdf::{Node, Triple, parse_turtle};
pub use store::OntologyStore;
pub use synthesize::{TurtleMode, TurtleSynthesizer};
pub use turtle::{DEFAULT_BASE_IRI, TurtleWriter};
