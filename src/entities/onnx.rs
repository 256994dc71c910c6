// Local ONNX named entity tagger (fallback tier).
//
// Runs a BERT token-classification model (dslim/bert-base-NER by default)
// entirely on the local CPU. Each token gets a BIO label (B-PER, I-ORG, O, ...)
// and consecutive tokens of the same type are stitched back into spans using
// the tokenizer's byte offsets into the original text.
//
// Any token-classification export with an `id2label` table works. With
// OntoNotes labels (GPE present) LOC means rivers, mountains and regions and
// maps to OTHER; with CoNLL labels LOC is the only place label and maps to GPE.
//
// The tagger reports one entity per mention, in document order, with no
// salience. The resolver ranks names by how often they repeat.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::{Entity, EntityExtractor, EntityType, Mention, MentionKind};
use crate::output::truncate_chars;

/// BERT's positional limit; longer documents are tagged on their first 512
/// tokens.
const MAX_SEQUENCE_LENGTH: usize = 512;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";

pub struct OnnxNerTagger {
    // Session::run takes &mut self, and inference runs on spawn_blocking
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    /// Label names indexed by model output id
    labels: Arc<Vec<String>>,
    scheme: LabelScheme,
}

impl OnnxNerTagger {
    /// Load the model, tokenizer and label map from `model_dir`.
    ///
    /// Expects `model.onnx`, `tokenizer.json` and `config.json` (with an
    /// `id2label` table). Run `trendfold download-model` if they're missing.
    pub fn load(model_dir: &Path) -> Result<Self> {
        for file in [MODEL_FILE, TOKENIZER_FILE, CONFIG_FILE] {
            let path = model_dir.join(file);
            if !path.exists() {
                anyhow::bail!(
                    "NER model file not found: {}\nRun `trendfold download-model` to download it.",
                    path.display()
                );
            }
        }

        let model_path = model_dir.join(MODEL_FILE);
        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load NER model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(model_dir.join(TOKENIZER_FILE))
            .map_err(|e| anyhow::anyhow!("Failed to load NER tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;

        let config_path = model_dir.join(CONFIG_FILE);
        let config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let labels = parse_labels(&config)?;
        let scheme = LabelScheme::detect(&labels);

        debug!(
            labels = labels.len(),
            ?scheme,
            "Loaded ONNX NER model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            labels: Arc::new(labels),
            scheme,
        })
    }
}

#[async_trait]
impl EntityExtractor for OnnxNerTagger {
    async fn analyze(&self, text: &str) -> Result<Vec<Entity>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let labels = Arc::clone(&self.labels);
        let scheme = self.scheme;
        let text = text.to_string();

        tokio::task::spawn_blocking(move || tag_sync(&session, &tokenizer, &labels, scheme, &text))
            .await
            .context("spawn_blocking panicked")?
    }
}

/// Tokenize, run the model, and decode BIO labels into entity mentions.
fn tag_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    labels: &[String],
    scheme: LabelScheme,
    text: &str,
) -> Result<Vec<Entity>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let seq_len = encoding.get_ids().len();
    let shape = [1_i64, seq_len as i64];
    let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let attention_mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| m as i64).collect();
    let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

    let input_ids = Tensor::from_array((shape, input_ids)).context("Failed to create input_ids tensor")?;
    let attention_mask =
        Tensor::from_array((shape, attention_mask)).context("Failed to create attention_mask tensor")?;
    let token_type_ids =
        Tensor::from_array((shape, token_type_ids)).context("Failed to create token_type_ids tensor")?;

    let logits = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            })
            .context("ONNX inference failed")?;

        // Output shape: [1, seq_len, num_labels]
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract logits tensor")?;
        data.to_vec()
    };

    if logits.len() != seq_len * labels.len() {
        anyhow::bail!(
            "NER model returned {} logits for {} tokens x {} labels",
            logits.len(),
            seq_len,
            labels.len()
        );
    }

    let tokens: Vec<TokenTag> = logits
        .chunks(labels.len())
        .zip(encoding.get_offsets())
        .zip(encoding.get_special_tokens_mask())
        .filter(|(_, special)| **special == 0)
        .map(|((row, &(start, end)), _)| TokenTag {
            label: &labels[argmax(row)],
            start,
            end,
        })
        .collect();

    let entities = decode_spans(text, &tokens, scheme);

    debug!(
        mentions = entities.len(),
        text_preview = %truncate_chars(text, 50),
        "ONNX tagged text"
    );

    Ok(entities)
}

/// One predicted token: its label and byte span in the source text.
#[derive(Debug, Clone, Copy)]
struct TokenTag<'a> {
    label: &'a str,
    start: usize,
    end: usize,
}

#[derive(Debug, PartialEq)]
enum Tag<'a> {
    Outside,
    Begin(&'a str),
    Inside(&'a str),
}

fn parse_tag(label: &str) -> Tag<'_> {
    if label == "O" {
        Tag::Outside
    } else if let Some(kind) = label.strip_prefix("B-") {
        Tag::Begin(kind)
    } else if let Some(kind) = label.strip_prefix("I-") {
        Tag::Inside(kind)
    } else {
        Tag::Inside(label)
    }
}

/// Label vocabulary of the loaded model.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LabelScheme {
    /// CoNLL-2003 (PER, ORG, LOC, MISC): LOC is the only place label.
    Conll,
    /// OntoNotes: GPE covers countries and cities, LOC rivers, mountains
    /// and regions.
    OntoNotes,
}

impl LabelScheme {
    fn detect(labels: &[String]) -> Self {
        let has_gpe = labels.iter().any(|label| match parse_tag(label) {
            Tag::Begin(kind) | Tag::Inside(kind) => kind.eq_ignore_ascii_case("GPE"),
            Tag::Outside => false,
        });
        if has_gpe {
            Self::OntoNotes
        } else {
            Self::Conll
        }
    }

    fn entity_type(self, kind: &str) -> EntityType {
        match self {
            Self::OntoNotes if kind.eq_ignore_ascii_case("LOC") => EntityType::Other,
            _ => EntityType::from_label(kind),
        }
    }
}

/// Merge BIO-tagged tokens into mention spans.
///
/// A `B-` tag glued to the previous token of the same type (no gap, as with
/// word pieces) extends the span instead of starting a new one.
fn decode_spans(text: &str, tokens: &[TokenTag], scheme: LabelScheme) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut current: Option<(&str, usize, usize)> = None;

    let close = |span: Option<(&str, usize, usize)>, entities: &mut Vec<Entity>| {
        if let Some((kind, start, end)) = span {
            if let Some(surface) = text.get(start..end) {
                let surface = surface.trim();
                if !surface.is_empty() {
                    let mut entity = Entity::named(surface, scheme.entity_type(kind));
                    entity.mentions.push(Mention {
                        text: surface.to_string(),
                        kind: MentionKind::Proper,
                    });
                    entities.push(entity);
                }
            }
        }
    };

    for token in tokens {
        current = match (parse_tag(token.label), current) {
            (Tag::Outside, span) => {
                close(span, &mut entities);
                None
            }
            (Tag::Begin(kind), Some((open, start, end))) if open == kind && token.start == end => {
                Some((open, start, token.end))
            }
            (Tag::Inside(kind), Some((open, start, _))) if open == kind => Some((open, start, token.end)),
            (Tag::Begin(kind) | Tag::Inside(kind), span) => {
                close(span, &mut entities);
                Some((kind, token.start, token.end))
            }
        };
    }
    close(current, &mut entities);

    entities
}

fn argmax(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

#[derive(Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

/// Read the `id2label` table of a Hugging Face model config into a dense
/// label list.
fn parse_labels(config_json: &str) -> Result<Vec<String>> {
    let config: ModelConfig =
        serde_json::from_str(config_json).context("Failed to parse NER model config")?;
    if config.id2label.is_empty() {
        anyhow::bail!("NER model config has an empty id2label table");
    }

    let mut labels = vec![String::new(); config.id2label.len()];
    for (id, label) in config.id2label {
        let index: usize = id
            .parse()
            .with_context(|| format!("Invalid label id {id:?} in model config"))?;
        let slot = labels
            .get_mut(index)
            .with_context(|| format!("Label id {index} out of range in model config"))?;
        *slot = label;
    }
    Ok(labels)
}
