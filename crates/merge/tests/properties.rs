//! Behavioural tests for the merge over realistic multi-chunk input.

use std::collections::{BTreeMap, BTreeSet};

use merge::{PartialExtraction, RawEntity, RawRelationship, aggregate, normalize};

fn sample_partials() -> Vec<PartialExtraction> {
    vec![
        PartialExtraction::new(
            vec![
                RawEntity::named("Cat").with_description("A feline."),
                RawEntity::named("Dog").with_description("A canine."),
                RawEntity::named("Alice"),
            ],
            vec![
                RawRelationship::new("Dog", "chases", "Cat"),
                RawRelationship::new("Dog", "chases", "Ghost"),
                RawRelationship::new("Alice", "knows", "Bob").with_property("since", "2020"),
            ],
        ),
        PartialExtraction::failed("Invalid JSON returned: {\"entities\": [..."),
        PartialExtraction::new(
            vec![
                RawEntity::named("cat").with_description("Domesticated."),
                RawEntity::named(" Bob "),
            ],
            vec![
                RawRelationship::new("alice", "knows", "bob").with_property("since", "2021"),
                RawRelationship::new("alice", "knows", "bob").with_property("since", "2020"),
                RawRelationship {
                    target: None,
                    ..RawRelationship::new("Cat", "ignores", "Dog")
                },
            ],
        ),
        PartialExtraction::new(
            vec![RawEntity::named("CAT").with_description("A feline.")],
            Vec::new(),
        ),
    ]
}

#[test]
fn test_remerge_is_idempotent() {
    let partials = sample_partials();
    let first = aggregate(&partials).unwrap();
    let second = aggregate(&partials).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_provenance_completeness() {
    let partials = sample_partials();
    let merged = aggregate(&partials).unwrap();

    let mut expected: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for (idx, partial) in partials.iter().enumerate() {
        for entity in &partial.entities {
            let key = normalize(entity.name.as_deref().unwrap());
            expected.entry(key).or_default().insert(idx);
        }
    }

    for entity in merged.entities() {
        let actual: BTreeSet<usize> = entity.source_chunks.iter().copied().collect();
        assert_eq!(&actual, &expected[&entity.normalized_name]);
    }
    assert_eq!(merged.entities().len(), expected.len());
}

#[test]
fn test_one_entity_per_normalized_name() {
    let merged = aggregate(&sample_partials()).unwrap();

    let keys: Vec<_> = merged.entities().iter().map(|e| e.normalized_name.as_str()).collect();
    let distinct: BTreeSet<_> = keys.iter().collect();
    assert_eq!(keys.len(), distinct.len());
    assert_eq!(keys, vec!["cat", "dog", "alice", "bob"]);
}

#[test]
fn test_description_accumulation() {
    let merged = aggregate(&sample_partials()).unwrap();
    assert_eq!(merged.entity("cat").unwrap().description, "A feline.\nDomesticated.");

    let no_dup = aggregate(&[
        PartialExtraction::new(vec![RawEntity::named("Cat").with_description("A feline.")], Vec::new()),
        PartialExtraction::new(vec![RawEntity::named("cat").with_description("A feline.")], Vec::new()),
    ])
    .unwrap();
    assert_eq!(no_dup.entity("cat").unwrap().description, "A feline.");
}

#[test]
fn test_referential_pruning() {
    let merged = aggregate(&sample_partials()).unwrap();

    assert!(
        !merged
            .relationships()
            .iter()
            .any(|r| r.target == "ghost" || r.source == "ghost")
    );
    assert_eq!(merged.stats().total_entities, 4);
    assert_eq!(merged.diagnostics().dropped_relationships.len(), 1);
    assert_eq!(merged.diagnostics().skipped_relationships, 1);
}

#[test]
fn test_property_variant_retention() {
    let merged = aggregate(&sample_partials()).unwrap();

    let knows: Vec<_> = merged
        .relationships()
        .iter()
        .filter(|r| r.source == "alice" && r.rel_type == "knows" && r.target == "bob")
        .map(|r| r.properties["since"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(knows, vec!["2020", "2021"]);
}

#[test]
fn test_statistics_consistency() {
    let merged = aggregate(&sample_partials()).unwrap();
    let stats = merged.stats();

    let types: BTreeSet<_> = merged.relationships().iter().map(|r| r.rel_type.as_str()).collect();
    assert_eq!(stats.total_entities, merged.entities().len());
    assert_eq!(stats.total_relationships, merged.relationships().len());
    assert_eq!(stats.unique_relationship_types, types.len());
    assert_eq!(stats.total_relationships, 3);
    assert_eq!(stats.unique_relationship_types, 2);
}

#[test]
fn test_failed_chunk_reported_not_fatal() {
    let merged = aggregate(&sample_partials()).unwrap();
    assert_eq!(merged.diagnostics().failed_chunks, vec![1]);
}
