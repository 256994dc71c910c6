// Filter composition for primary-extractor results.
//
// Every entry point (single list, grouped "proper"/"wikipedia" lists) goes
// through `EntityFilter`, so the salience/type/wikipedia/proper rules live in
// one place. Filters run in a fixed order and each one is a no-op at its
// default setting.

use super::traits::{Entity, EntityType, ALLOWED_TYPES};

#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    /// Drop entities with salience below this (0.0 keeps everything)
    pub min_salience: f64,
    /// Keep only these types (None keeps every type)
    pub allowed_types: Option<Vec<EntityType>>,
    /// Keep only entities that link to a Wikipedia article
    pub wikipedia_only: bool,
    /// Keep only entities mentioned at least once by proper name
    pub proper_only: bool,
    /// If the filters remove everything, return the unfiltered names instead
    pub fallback_if_empty: bool,
}

impl EntityFilter {
    /// The filter used for a document's headline entity list: allowed
    /// types, Wikipedia-linked only, never empty if the extractor found
    /// anything.
    pub fn document() -> Self {
        Self {
            allowed_types: Some(ALLOWED_TYPES.to_vec()),
            wikipedia_only: true,
            fallback_if_empty: true,
            ..Default::default()
        }
    }

    pub fn proper() -> Self {
        Self {
            proper_only: true,
            ..Default::default()
        }
    }

    pub fn wikipedia() -> Self {
        Self {
            wikipedia_only: true,
            ..Default::default()
        }
    }

    /// Entities passing every enabled filter, in extractor order.
    pub fn keep<'a>(&self, entities: &'a [Entity]) -> Vec<&'a Entity> {
        entities
            .iter()
            .filter(|e| e.salience >= self.min_salience)
            .filter(|e| {
                self.allowed_types
                    .as_ref()
                    .map_or(true, |types| types.contains(&e.entity_type))
            })
            .filter(|e| !self.wikipedia_only || e.wikipedia_url().is_some())
            .filter(|e| !self.proper_only || e.has_proper_mention())
            .collect()
    }

    /// Names of the kept entities, honoring `fallback_if_empty`.
    pub fn apply(&self, entities: &[Entity]) -> Vec<String> {
        let kept = self.keep(entities);
        if kept.is_empty() && self.fallback_if_empty {
            return entities.iter().map(|e| e.name.clone()).collect();
        }
        kept.into_iter().map(|e| e.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::traits::{Mention, MentionKind, WIKIPEDIA_URL_KEY};

    fn entity(name: &str, entity_type: EntityType, salience: f64) -> Entity {
        Entity {
            salience,
            ..Entity::named(name, entity_type)
        }
    }

    fn with_wiki(mut e: Entity) -> Entity {
        e.metadata.insert(
            WIKIPEDIA_URL_KEY.to_string(),
            format!("https://en.wikipedia.org/wiki/{}", e.name),
        );
        e
    }

    fn with_mention(mut e: Entity, kind: MentionKind) -> Entity {
        e.mentions.push(Mention {
            text: e.name.clone(),
            kind,
        });
        e
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let entities = vec![
            entity("Acme", EntityType::Org, 0.0),
            entity("Tuesday", EntityType::Other, 0.1),
        ];
        assert_eq!(EntityFilter::default().apply(&entities), vec!["Acme", "Tuesday"]);
    }

    #[test]
    fn test_salience_threshold() {
        let filter = EntityFilter {
            min_salience: 0.5,
            ..Default::default()
        };
        let entities = vec![
            entity("Low", EntityType::Person, 0.2),
            entity("Edge", EntityType::Person, 0.5),
            entity("High", EntityType::Person, 0.9),
        ];
        assert_eq!(filter.apply(&entities), vec!["Edge", "High"]);
    }

    #[test]
    fn test_type_restriction() {
        let filter = EntityFilter {
            allowed_types: Some(vec![EntityType::Person]),
            ..Default::default()
        };
        let entities = vec![
            entity("Ada", EntityType::Person, 0.1),
            entity("Acme", EntityType::Org, 0.9),
        ];
        assert_eq!(filter.apply(&entities), vec!["Ada"]);
    }

    #[test]
    fn test_proper_only() {
        let entities = vec![
            with_mention(entity("senator", EntityType::Person, 0.3), MentionKind::Common),
            with_mention(entity("Ada", EntityType::Person, 0.3), MentionKind::Proper),
            entity("no mentions", EntityType::Person, 0.3),
        ];
        assert_eq!(EntityFilter::proper().apply(&entities), vec!["Ada"]);
    }

    #[test]
    fn test_wikipedia_only_without_fallback_can_be_empty() {
        let entities = vec![entity("Acme", EntityType::Org, 0.9)];
        assert!(EntityFilter::wikipedia().apply(&entities).is_empty());
    }

    #[test]
    fn test_fallback_if_empty_returns_original_names() {
        let entities = vec![
            entity("Acme", EntityType::Org, 0.9),
            entity("Tuesday", EntityType::Other, 0.1),
        ];
        assert_eq!(EntityFilter::document().apply(&entities), vec!["Acme", "Tuesday"]);
    }

    #[test]
    fn test_document_filter_keeps_linked_allowed_types() {
        let entities = vec![
            with_wiki(entity("Acme", EntityType::Org, 0.9)),
            with_wiki(entity("Zorb", EntityType::Other, 0.9)),
            entity("Unlinked", EntityType::Person, 0.9),
        ];
        assert_eq!(EntityFilter::document().apply(&entities), vec!["Acme"]);
    }

    #[test]
    fn test_fallback_on_empty_input_is_empty() {
        assert!(EntityFilter::document().apply(&[]).is_empty());
    }
}
