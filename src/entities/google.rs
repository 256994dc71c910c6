// Google Cloud Natural Language entity extractor (primary tier).
//
// Calls `documents:analyzeEntities`, which returns entities with a type,
// salience, typed mentions (PROPER / COMMON) and metadata that includes a
// `wikipedia_url` for entities Google could link to a knowledge graph entry.
//
// API docs: https://cloud.google.com/natural-language/docs/reference/rest/v1/documents/analyzeEntities

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{Entity, EntityExtractor, EntityType, Mention, MentionKind};
use crate::output::truncate_chars;

pub const DEFAULT_API_URL: &str = "https://language.googleapis.com/v1";

pub struct GoogleNlpExtractor {
    client: Client,
    api_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl GoogleNlpExtractor {
    /// `api_url` is normally [`DEFAULT_API_URL`]; a regional endpoint or a
    /// local stub also works.
    pub fn new(api_url: String, api_key: String, requests_per_second: f64) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            rate_limiter: RateLimiter::new(requests_per_second),
        }
    }
}

#[async_trait]
impl EntityExtractor for GoogleNlpExtractor {
    async fn analyze(&self, text: &str) -> Result<Vec<Entity>> {
        self.rate_limiter.acquire().await;

        let url = format!(
            "{}/documents:analyzeEntities?key={}",
            self.api_url.trim_end_matches('/'),
            self.api_key
        );

        let request = AnalyzeEntitiesRequest {
            document: Document {
                kind: "PLAIN_TEXT",
                content: text,
                language: "en",
            },
            encoding_type: "UTF8",
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to call Natural Language API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Natural Language API returned {}: {}", status, body);
        }

        let result: AnalyzeEntitiesResponse = response
            .json()
            .await
            .context("Failed to parse Natural Language API response")?;

        let entities = into_entities(result);

        debug!(
            entities = entities.len(),
            text_preview = %truncate_chars(text, 50),
            "Analyzed entities"
        );

        Ok(entities)
    }
}

fn into_entities(response: AnalyzeEntitiesResponse) -> Vec<Entity> {
    response
        .entities
        .into_iter()
        .map(|e| Entity {
            name: e.name,
            entity_type: EntityType::from_label(&e.kind),
            salience: e.salience,
            mentions: e
                .mentions
                .into_iter()
                .map(|m| Mention {
                    text: m.text.content,
                    kind: match m.kind.as_str() {
                        "PROPER" => MentionKind::Proper,
                        "COMMON" => MentionKind::Common,
                        _ => MentionKind::Unknown,
                    },
                })
                .collect(),
            metadata: e.metadata,
        })
        .collect()
}

// --- Natural Language API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeEntitiesRequest<'a> {
    document: Document<'a>,
    encoding_type: &'a str,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    content: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeEntitiesResponse {
    #[serde(default)]
    entities: Vec<ApiEntity>,
}

#[derive(Deserialize)]
struct ApiEntity {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    salience: f64,
    #[serde(default)]
    mentions: Vec<ApiMention>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
struct ApiMention {
    text: TextSpan,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Deserialize)]
struct TextSpan {
    content: String,
}
