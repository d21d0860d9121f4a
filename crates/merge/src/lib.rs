//! Merge core: folds per-chunk partial extractions into one deduplicated,
//! provenance-tracked ontology.
//!
//! Pure and synchronous. Every [`aggregate`] call owns its own working maps,
//! so calls never observe each other.

pub mod aggregator;
pub mod entities;
pub mod error;
pub mod normalizer;
pub mod relationships;
pub mod schema;
pub mod validator;

pub use aggregator::{
    MergeDiagnostics, MergedOntology, OntologyStats, Provenance, RelationshipSources, aggregate,
    aggregate_indexed,
};
pub use entities::{Entity, EntityMap, merge_entities};
pub use error::{MergeError, Result};
pub use normalizer::normalize;
pub use relationships::{
    Relationship, RelationshipGroup, RelationshipGroups, RelationshipKey, merge_relationships,
};
pub use schema::{PartialExtraction, Properties, RawEntity, RawRelationship};
pub use validator::{Validated, validate_relationships};
