// Topic records as they arrive from upstream collectors.
//
// Every scalar field is optional. Merging never overwrites a field that is
// already set, so the combination rule lives in one place (`FirstWins`)
// instead of being repeated per field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A link that seeded a topic (article, post, search result).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// Trace entry for one constituent of a merged topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedTopic {
    pub title: String,
    /// Empty when the constituent had no source.
    pub source: String,
}

/// A single trending topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_type_id: Option<i64>,

    #[serde(default)]
    pub seed_links: Vec<SeedLink>,

    /// How many upstream streams were already folded into this topic.
    #[serde(default = "default_streams")]
    pub num_aggregate_streams: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_topics: Vec<RelatedTopic>,
    /// Salience-adjusted duplicate count, only present on merged topics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_reduced: Option<f64>,

    /// Fields this crate doesn't interpret, passed through as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_streams() -> u32 {
    1
}

impl Default for Topic {
    fn default() -> Self {
        Self {
            doc: None,
            title: None,
            summary: None,
            source: None,
            image_url: None,
            suggested_query: None,
            provided_category: None,
            topic_type_id: None,
            seed_links: Vec::new(),
            num_aggregate_streams: default_streams(),
            related_topics: Vec::new(),
            count_reduced: None,
            extra: Map::new(),
        }
    }
}

impl Topic {
    /// A topic that only carries a document body.
    pub fn from_doc(doc: impl Into<String>) -> Self {
        Self {
            doc: Some(doc.into()),
            ..Default::default()
        }
    }

    /// The text used for similarity and entity extraction.
    ///
    /// Falls back to title, summary and seed link titles/snippets when no
    /// `doc` was collected. Returns `None` when there's neither a doc nor a
    /// title to build from.
    pub fn text(&self) -> Option<String> {
        if let Some(doc) = &self.doc {
            return Some(doc.clone());
        }

        let mut text = self.title.clone()?;
        if let Some(summary) = &self.summary {
            text.push(' ');
            text.push_str(summary);
        }
        for link in &self.seed_links {
            text.push(' ');
            text.push_str(&link.title);
            text.push(' ');
            text.push_str(&link.snippet);
        }
        Some(text)
    }

    /// Title plus summary, ignoring the (often noisy) doc.
    pub fn headline(&self) -> Option<String> {
        let mut text = self.title.clone()?;
        match self.summary.as_deref() {
            Some(summary) if !summary.is_empty() => {
                text.push_str("; ");
                text.push_str(summary);
            }
            _ => {}
        }
        Some(text)
    }
}

/// Ordered "first defined value wins" combination.
pub trait FirstWins {
    /// Take `candidate` only if `self` is still unset.
    fn fill_from(&mut self, candidate: &Self);
}

impl<T: Clone> FirstWins for Option<T> {
    fn fill_from(&mut self, candidate: &Self) {
        if self.is_none() {
            self.clone_from(candidate);
        }
    }
}

impl FirstWins for Map<String, Value> {
    fn fill_from(&mut self, candidate: &Self) {
        for (key, value) in candidate {
            if !self.contains_key(key) {
                self.insert(key.clone(), value.clone());
            }
        }
    }
}
