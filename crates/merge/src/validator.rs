use crate::entities::EntityMap;
use crate::relationships::Relationship;

/// Outcome of the referential check.
#[derive(Debug, Clone, Default)]
pub struct Validated {
    pub valid: Vec<Relationship>,
    /// Variants with at least one endpoint missing from the entity map.
    pub dropped: Vec<Relationship>,
}

/// Keep relationships whose endpoints both exist as merged entities.
/// Input order is preserved in both output lists.
pub fn validate_relationships<I>(entities: &EntityMap, relationships: I) -> Validated
where
    I: IntoIterator<Item = Relationship>,
{
    let (valid, dropped): (Vec<_>, Vec<_>) = relationships
        .into_iter()
        .partition(|rel| entities.contains_key(&rel.source) && entities.contains_key(&rel.target));

    Validated { valid, dropped }
}
