// Entity extractor trait: one interface for the remote and local tiers.
//
// The primary tier (Google Natural Language) returns rich entities with
// salience, typed mentions and metadata. The local tier (an ONNX NER model)
// only knows names and types, and reports one entity per mention so the
// resolver can rank by repetition. Which tier runs is decided explicitly in
// `EntityResolver`, never by the extractors themselves.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata key the primary extractor uses for a linked Wikipedia article.
pub const WIKIPEDIA_URL_KEY: &str = "wikipedia_url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Org,
    Gpe,
    Event,
    WorkOfArt,
    Law,
    Product,
    Other,
}

/// Types worth surfacing as topic entities. Dates, numbers, addresses and
/// the like are dropped.
pub const ALLOWED_TYPES: [EntityType; 7] = [
    EntityType::Person,
    EntityType::Org,
    EntityType::Gpe,
    EntityType::Event,
    EntityType::WorkOfArt,
    EntityType::Law,
    EntityType::Product,
];

impl EntityType {
    /// Map a NER label (CoNLL or OntoNotes style, with or without a BIO
    /// prefix already stripped) to an entity type.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "PER" | "PERSON" => Self::Person,
            "ORG" | "ORGANIZATION" => Self::Org,
            "GPE" | "LOC" | "LOCATION" => Self::Gpe,
            "EVENT" => Self::Event,
            "WORK_OF_ART" => Self::WorkOfArt,
            "LAW" => Self::Law,
            "PRODUCT" | "CONSUMER_GOOD" => Self::Product,
            _ => Self::Other,
        }
    }

    pub fn is_allowed(self) -> bool {
        ALLOWED_TYPES.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentionKind {
    /// Proper name ("Angela Merkel")
    Proper,
    /// Common noun ("the chancellor")
    Common,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub text: String,
    pub kind: MentionKind,
}

/// A named entity found in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: EntityType,
    /// Relevance within the document (0.0 to 1.0). Always 0.0 from the
    /// local extractor.
    pub salience: f64,
    pub mentions: Vec<Mention>,
    pub metadata: HashMap<String, String>,
}

impl Entity {
    /// An entity carrying only a name and type, as the local tier produces.
    pub fn named(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            salience: 0.0,
            mentions: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn wikipedia_url(&self) -> Option<&str> {
        self.metadata.get(WIKIPEDIA_URL_KEY).map(String::as_str)
    }

    pub fn has_proper_mention(&self) -> bool {
        self.mentions.iter().any(|m| m.kind == MentionKind::Proper)
    }
}

/// Trait for extracting named entities from English text.
///
/// An `Err` means the extractor is unavailable (network failure, quota,
/// model error). Callers decide what to do about it.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Vec<Entity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(EntityType::from_label("PER"), EntityType::Person);
        assert_eq!(EntityType::from_label("loc"), EntityType::Gpe);
        assert_eq!(EntityType::from_label("WORK_OF_ART"), EntityType::WorkOfArt);
        assert_eq!(EntityType::from_label("MISC"), EntityType::Other);
        assert_eq!(EntityType::from_label("DATE"), EntityType::Other);
    }

    #[test]
    fn test_other_is_not_allowed() {
        assert!(EntityType::Law.is_allowed());
        assert!(!EntityType::Other.is_allowed());
    }

    #[test]
    fn test_entity_type_serializes_as_label() {
        let json = serde_json::to_string(&EntityType::WorkOfArt).unwrap();
        assert_eq!(json, "\"WORK_OF_ART\"");
        let json = serde_json::to_string(&EntityType::Gpe).unwrap();
        assert_eq!(json, "\"GPE\"");
    }

    #[test]
    fn test_proper_mention_and_wikipedia_url() {
        let mut entity = Entity::named("Acme", EntityType::Org);
        assert!(!entity.has_proper_mention());
        assert!(entity.wikipedia_url().is_none());

        entity.mentions.push(Mention {
            text: "Acme".to_string(),
            kind: MentionKind::Proper,
        });
        entity.metadata.insert(
            WIKIPEDIA_URL_KEY.to_string(),
            "https://en.wikipedia.org/wiki/Acme".to_string(),
        );
        assert!(entity.has_proper_mention());
        assert_eq!(entity.wikipedia_url(), Some("https://en.wikipedia.org/wiki/Acme"));
    }
}
