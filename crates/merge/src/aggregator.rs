use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entities::{Entity, EntityMap};
use crate::error::Result;
use crate::relationships::{Relationship, RelationshipGroups, RelationshipKey};
use crate::schema::PartialExtraction;
use crate::validator::validate_relationships;

/// Which chunks contributed each entity and relationship key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub entity_sources: BTreeMap<String, Vec<usize>>,
    /// One record per grouping key, including keys whose variants were all
    /// dropped by validation.
    pub relationship_sources: Vec<RelationshipSources>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSources {
    #[serde(flatten)]
    pub key: RelationshipKey,
    pub chunks: Vec<usize>,
}

impl Provenance {
    pub fn entity_chunks(&self, normalized_name: &str) -> Option<&[usize]> {
        self.entity_sources.get(normalized_name).map(Vec::as_slice)
    }

    pub fn relationship_chunks(&self, key: &RelationshipKey) -> Option<&[usize]> {
        self.relationship_sources
            .iter()
            .find(|r| &r.key == key)
            .map(|r| r.chunks.as_slice())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyStats {
    pub total_entities: usize,
    pub total_relationships: usize,
    pub unique_relationship_types: usize,
}

/// What the merge discarded. Never affects the merge's success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeDiagnostics {
    /// Relationship records missing source, type or target.
    pub skipped_relationships: usize,
    /// Variants whose endpoints were not merged entities.
    pub dropped_relationships: Vec<Relationship>,
    /// Partials that carried an upstream error marker.
    pub failed_chunks: Vec<usize>,
}

/// Consolidated result of merging all partial extractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedOntology {
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
    provenance: Provenance,
    stats: OntologyStats,
    #[serde(default)]
    diagnostics: MergeDiagnostics,
}

impl MergedOntology {
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn stats(&self) -> OntologyStats {
        self.stats
    }

    pub fn diagnostics(&self) -> &MergeDiagnostics {
        &self.diagnostics
    }

    /// Look up a merged entity by its normalized name.
    pub fn entity(&self, normalized_name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.normalized_name == normalized_name)
    }
}

/// Merge partial extractions, given in chunk order, into one ontology.
///
/// Fails only when an entity record has no name.
pub fn aggregate(partials: &[PartialExtraction]) -> Result<MergedOntology> {
    aggregate_indexed(partials.iter().enumerate())
}

/// [`aggregate`] with explicit chunk indices, for callers whose chunk
/// numbering is not the position in a slice. Pairs must come in chunk order.
pub fn aggregate_indexed<'a>(
    partials: impl IntoIterator<Item = (usize, &'a PartialExtraction)>,
) -> Result<MergedOntology> {
    let partials: Vec<(usize, &PartialExtraction)> = partials.into_iter().collect();

    let mut entity_map = EntityMap::new();
    for &(chunk, partial) in &partials {
        entity_map.merge_partial(chunk, partial)?;
    }
    let mut groups = RelationshipGroups::new();
    for &(chunk, partial) in &partials {
        groups.merge_partial(chunk, partial);
    }

    let relationship_sources = groups
        .groups()
        .iter()
        .map(|g| RelationshipSources {
            key: g.key.clone(),
            chunks: g.chunks.iter().copied().collect(),
        })
        .collect();
    let skipped_relationships = groups.skipped();

    let validated = validate_relationships(&entity_map, groups.variants().cloned());
    for rel in &validated.dropped {
        debug!(
            source = %rel.source,
            rel_type = %rel.rel_type,
            target = %rel.target,
            "Dropping relationship with unknown endpoint"
        );
    }

    let mut entity_sources = BTreeMap::new();
    let entities: Vec<Entity> = entity_map
        .into_entities()
        .into_iter()
        .map(|mut entity| {
            entity.source_chunks.sort_unstable();
            let distinct: BTreeSet<usize> = entity.source_chunks.iter().copied().collect();
            entity_sources.insert(entity.normalized_name.clone(), distinct.into_iter().collect());
            entity
        })
        .collect();

    let relationship_types: BTreeSet<&str> = validated
        .valid
        .iter()
        .map(|r| r.rel_type.as_str())
        .collect();
    let stats = OntologyStats {
        total_entities: entities.len(),
        total_relationships: validated.valid.len(),
        unique_relationship_types: relationship_types.len(),
    };

    let failed_chunks = partials
        .iter()
        .filter(|(_, p)| p.is_error())
        .map(|&(chunk, _)| chunk)
        .collect();

    info!(
        chunks = partials.len(),
        entities = stats.total_entities,
        relationships = stats.total_relationships,
        relationship_types = stats.unique_relationship_types,
        dropped = validated.dropped.len(),
        skipped = skipped_relationships,
        "Merged partial extractions"
    );

    Ok(MergedOntology {
        entities,
        relationships: validated.valid,
        provenance: Provenance {
            entity_sources,
            relationship_sources,
        },
        stats,
        diagnostics: MergeDiagnostics {
            skipped_relationships,
            dropped_relationships: validated.dropped,
            failed_chunks,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawEntity, RawRelationship};

    #[test]
    fn test_indexed_chunks_keep_their_numbers() {
        let cat = PartialExtraction::new(vec![RawEntity::named("Cat")], Vec::new());
        let failed = PartialExtraction::failed("Invalid JSON returned: x");

        let merged = aggregate_indexed([(3, &failed), (5, &cat), (9, &cat)]).unwrap();

        assert_eq!(merged.entity("cat").unwrap().source_chunks, vec![5, 9]);
        assert_eq!(merged.provenance().entity_chunks("cat"), Some(&[5, 9][..]));
        assert_eq!(merged.diagnostics().failed_chunks, vec![3]);
    }

    #[test]
    fn test_empty_input() {
        let merged = aggregate(&[]).unwrap();
        assert!(merged.entities().is_empty());
        assert_eq!(merged.stats(), OntologyStats::default());
    }

    #[test]
    fn test_error_partials_are_empty_partials() {
        let merged = aggregate(&[
            PartialExtraction::failed("Invalid JSON returned: {oops"),
            PartialExtraction::new(vec![RawEntity::named("Cat")], Vec::new()),
        ])
        .unwrap();

        assert_eq!(merged.stats().total_entities, 1);
        assert_eq!(merged.entity("cat").unwrap().source_chunks, vec![1]);
        assert_eq!(merged.diagnostics().failed_chunks, vec![0]);
    }

    #[test]
    fn test_source_chunks_sorted_and_provenance_distinct() {
        let merged = aggregate(&[
            PartialExtraction::new(vec![RawEntity::named("Cat"), RawEntity::named("cat")], Vec::new()),
            PartialExtraction::new(vec![RawEntity::named("Cat")], Vec::new()),
        ])
        .unwrap();

        assert_eq!(merged.entity("cat").unwrap().source_chunks, vec![0, 0, 1]);
        assert_eq!(merged.provenance().entity_chunks("cat"), Some(&[0, 1][..]));
    }

    #[test]
    fn test_dropped_relationship_keeps_key_provenance() {
        let merged = aggregate(&[PartialExtraction::new(
            vec![RawEntity::named("Dog")],
            vec![RawRelationship::new("Dog", "chases", "Ghost")],
        )])
        .unwrap();

        assert!(merged.relationships().is_empty());
        assert_eq!(merged.diagnostics().dropped_relationships.len(), 1);
        let key = RelationshipKey::new("dog", "chases", "ghost");
        assert_eq!(merged.provenance().relationship_chunks(&key), Some(&[0][..]));
    }

    #[test]
    fn test_unique_types_use_stored_labels() {
        let merged = aggregate(&[
            PartialExtraction::new(
                vec![RawEntity::named("A"), RawEntity::named("B"), RawEntity::named("C")],
                vec![
                    RawRelationship::new("A", "Treats", "B"),
                    RawRelationship::new("B", "treats", "C"),
                    RawRelationship::new("A", "causes", "C"),
                ],
            ),
        ])
        .unwrap();

        assert_eq!(merged.stats().total_relationships, 3);
        assert_eq!(merged.stats().unique_relationship_types, 3);
    }

    #[test]
    fn test_json_roundtrip_preserves_shape() {
        let merged = aggregate(&[PartialExtraction::new(
            vec![RawEntity::named("Alice"), RawEntity::named("Bob")],
            vec![RawRelationship::new("Alice", "knows", "Bob")],
        )])
        .unwrap();

        let json = serde_json::to_value(&merged).unwrap();
        assert_eq!(json["stats"]["total_entities"], 2);
        assert_eq!(json["relationships"][0]["type"], "knows");
        assert_eq!(json["provenance"]["relationship_sources"][0]["source"], "alice");

        let back: MergedOntology = serde_json::from_value(json).unwrap();
        assert_eq!(back, merged);
    }
}
