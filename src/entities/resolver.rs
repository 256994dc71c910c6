// Two-tier entity resolution.
//
// The primary extractor is tried first. If it errors, is not configured, or
// finds nothing, the resolver switches to the local extractor and ranks its
// mentions by how often each name repeats. Primary failures are logged and
// absorbed here; the only error a caller can see is the local tier itself
// failing, since there's nothing left to fall back to.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use super::filter::EntityFilter;
use super::traits::{Entity, EntityExtractor};
use crate::error::PipelineError;
use crate::topics::model::Topic;

/// Named entity lists that can be requested together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityGroup {
    /// Entities mentioned by proper name at least once
    Proper,
    /// Entities linked to a Wikipedia article
    Wikipedia,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedEntity {
    pub name: String,
    /// Only set for the Wikipedia group on the primary path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia_url: Option<String>,
}

impl GroupedEntity {
    fn name_only(name: &str) -> Self {
        Self {
            name: name.to_string(),
            wikipedia_url: None,
        }
    }
}

pub type EntityGroups = BTreeMap<EntityGroup, Vec<GroupedEntity>>;

pub struct EntityResolver {
    primary: Option<Box<dyn EntityExtractor>>,
    local: Box<dyn EntityExtractor>,
}

impl EntityResolver {
    pub fn new(primary: Option<Box<dyn EntityExtractor>>, local: Box<dyn EntityExtractor>) -> Self {
        Self { primary, local }
    }

    /// A resolver that never calls a remote service.
    pub fn local_only(local: Box<dyn EntityExtractor>) -> Self {
        Self::new(None, local)
    }

    /// Raw primary entities, or `None` when the primary tier is unusable
    /// (not configured, failed, or found nothing).
    async fn usable_primary(&self, text: &str) -> Option<Vec<Entity>> {
        let primary = self.primary.as_ref()?;
        match primary.analyze(text).await {
            Ok(entities) if entities.is_empty() => {
                debug!("Primary extractor found no entities");
                None
            }
            Ok(entities) => {
                debug!(count = entities.len(), "Primary extractor entities");
                Some(entities)
            }
            Err(e) => {
                warn!(error = %e, "Primary entity extractor unavailable, using local fallback");
                None
            }
        }
    }

    /// Filtered primary entity names. `None` means the primary tier was
    /// unusable; an empty list means the filters removed everything.
    pub async fn primary_entity_list(&self, text: &str, filter: &EntityFilter) -> Option<Vec<String>> {
        self.usable_primary(text).await.map(|entities| filter.apply(&entities))
    }

    /// Local extractor names of allowed types, most-mentioned first.
    pub async fn local_entity_list(&self, text: &str) -> Result<Vec<String>> {
        let mentions = self.local.analyze(text).await?;
        let ranked = rank_by_mentions(&mentions);
        debug!(count = ranked.len(), "Local extractor entities");
        Ok(ranked)
    }

    /// Every local mention in document order, any type, repeats included.
    pub async fn all_local_entities(&self, text: &str) -> Result<Vec<String>> {
        let mentions = self.local.analyze(text).await?;
        Ok(mentions.into_iter().map(|m| m.name).collect())
    }

    /// The headline entity list for a document.
    ///
    /// Uses the primary tier with `EntityFilter::document()`; if that is
    /// unusable or still empty, returns the local ranking.
    pub async fn doc_to_entity_list(&self, text: &str) -> Result<Vec<String>> {
        if let Some(names) = self.primary_entity_list(text, &EntityFilter::document()).await {
            if !names.is_empty() {
                return Ok(names);
            }
        }
        self.local_entity_list(text).await
    }

    /// Several entity lists from a single extractor call.
    ///
    /// When the primary tier is unusable, every requested group gets the same
    /// local ranking: the local model can't tell proper or linked entities
    /// apart.
    pub async fn doc_to_entity_groups(
        &self,
        text: &str,
        groups: &[EntityGroup],
    ) -> Result<EntityGroups> {
        let mut results = EntityGroups::new();

        let Some(entities) = self.usable_primary(text).await else {
            let fallback: Vec<GroupedEntity> = self
                .local_entity_list(text)
                .await?
                .iter()
                .map(|name| GroupedEntity::name_only(name))
                .collect();
            warn!(count = fallback.len(), "Grouped entities degraded to local fallback");
            for &group in groups {
                results.insert(group, fallback.clone());
            }
            return Ok(results);
        };

        for &group in groups {
            let grouped = match group {
                EntityGroup::Proper => EntityFilter::proper()
                    .keep(&entities)
                    .into_iter()
                    .map(|e| GroupedEntity::name_only(&e.name))
                    .collect(),
                EntityGroup::Wikipedia => EntityFilter::wikipedia()
                    .keep(&entities)
                    .into_iter()
                    .map(|e| GroupedEntity {
                        name: e.name.clone(),
                        wikipedia_url: e.wikipedia_url().map(str::to_string),
                    })
                    .collect(),
            };
            results.insert(group, grouped);
        }

        Ok(results)
    }

    /// Entity list for a topic, using its doc or synthesized text.
    pub async fn topic_to_entity_list(&self, topic: &Topic) -> Result<Vec<String>> {
        let text = topic.text().ok_or(PipelineError::MissingText)?;
        self.doc_to_entity_list(&text).await
    }

    /// Proper and Wikipedia entity lists for a topic, from its title and
    /// summary only (the doc tends to carry unrelated page text).
    pub async fn topic_to_entity_groups(&self, topic: &Topic) -> Result<EntityGroups> {
        let text = topic.headline().ok_or(PipelineError::MissingTitle)?;
        self.doc_to_entity_groups(&text, &[EntityGroup::Proper, EntityGroup::Wikipedia])
            .await
    }
}

/// Rank local mentions of allowed types by repetition, ties by first
/// appearance.
pub fn rank_by_mentions(mentions: &[Entity]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for mention in mentions.iter().filter(|m| m.entity_type.is_allowed()) {
        match positions.get(mention.name.as_str()) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(mention.name.as_str(), counts.len());
                counts.push((mention.name.as_str(), 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(name, _)| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::traits::EntityType;

    fn mention(name: &str, entity_type: EntityType) -> Entity {
        Entity::named(name, entity_type)
    }

    #[test]
    fn test_rank_by_mentions_counts_and_keeps_first_seen_ties() {
        let mentions = vec![
            mention("Paris", EntityType::Gpe),
            mention("Macron", EntityType::Person),
            mention("Tuesday", EntityType::Other),
            mention("Macron", EntityType::Person),
            mention("UN", EntityType::Org),
            mention("Tuesday", EntityType::Other),
            mention("Tuesday", EntityType::Other),
        ];
        assert_eq!(rank_by_mentions(&mentions), vec!["Macron", "Paris", "UN"]);
    }

    #[test]
    fn test_rank_by_mentions_empty() {
        assert!(rank_by_mentions(&[]).is_empty());
    }
}
